//! Staking action lifecycle: submission, record, confirmation

mod common;

use anyhow::Result;
use common::{test_config, TestApp};
use farm_server::core::{ChainError, ChainErrorKind, ServiceError};
use farm_server::database::{Page, TransactionFilter, TransactionStore};
use farm_types::{StoredTransaction, TransactionStatus, TransactionType};
use tempfile::TempDir;

const MOCK_ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";

fn app_with_account(pool_count: u64) -> Result<TestApp> {
    let dir = TempDir::new()?;
    let mut config = test_config(&dir);
    config.chain.account = Some(MOCK_ACCOUNT.to_string());
    TestApp::with_config(pool_count, config, dir)
}

async fn only_record(app: &TestApp) -> Result<StoredTransaction> {
    let page = app.store.list(&TransactionFilter::default(), Page::default()).await?;
    assert_eq!(page.total, 1);
    Ok(page.transactions[0].clone())
}

#[tokio::test]
async fn test_reverted_transaction_marked_failed() -> Result<()> {
    let app = TestApp::new(2)?;
    app.mock.revert_hash(&app.mock.peek_next_hash());

    let receipt = app.state.actions.stake(0, "3").await?;
    app.state.actions.settle().await;

    let stored = only_record(&app).await?;
    assert_eq!(stored.record.tx_hash, receipt.tx_hash);
    assert_eq!(stored.record.status, TransactionStatus::Failed);
    assert_eq!(stored.record.gas_fee, "0.00036");
    Ok(())
}

#[tokio::test]
async fn test_missing_receipt_leaves_record_pending() -> Result<()> {
    let app = TestApp::new(2)?;
    app.mock.set_auto_mine(false);

    app.state.actions.stake(1, "1").await?;
    app.state.actions.settle().await;

    let stored = only_record(&app).await?;
    assert_eq!(stored.record.status, TransactionStatus::Pending);
    assert_eq!(stored.record.gas_fee, "0");
    Ok(())
}

#[tokio::test]
async fn test_disabled_tracking_leaves_record_pending() -> Result<()> {
    let dir = TempDir::new()?;
    let mut config = test_config(&dir);
    config.confirmation.enabled = false;
    let app = TestApp::with_config(2, config, dir)?;

    app.state.actions.stake(0, "1").await?;
    app.state.actions.settle().await;

    assert_eq!(only_record(&app).await?.record.status, TransactionStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn test_rejected_write_records_nothing() -> Result<()> {
    let app = TestApp::new(2)?;
    app.mock
        .reject_next_write(ChainError::from_rpc(-32000, "insufficient funds for gas * price + value"));

    let err = app.state.actions.stake(0, "1").await.unwrap_err();

    match err {
        ServiceError::Chain(e) => assert_eq!(e.kind, ChainErrorKind::InsufficientFunds),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(app.store.len().await, 0);
    assert!(app.state.ledger.list_pending().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unrecorded_action_still_returns_hash() -> Result<()> {
    let app = TestApp::new(2)?;
    app.sink.set_down(true);
    let expected = app.mock.peek_next_hash();

    let receipt = app.state.actions.stake(0, "1").await?;

    assert_eq!(receipt.tx_hash, expected);
    assert!(!receipt.recorded);
    assert_eq!(receipt.tx_type, TransactionType::Stake);
    assert_eq!(app.state.ledger.list_pending().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_harvest_records_pending_reward() -> Result<()> {
    let app = app_with_account(2)?;
    app.state.actions.stake(1, "4").await?;
    app.state.actions.settle().await;

    app.state.actions.harvest(1).await?;
    app.state.actions.settle().await;

    let page = app
        .store
        .list(
            &TransactionFilter {
                tx_type: Some(TransactionType::Harvest),
                ..TransactionFilter::default()
            },
            Page::default(),
        )
        .await?;
    let harvest = &page.transactions[0].record;
    assert_eq!(harvest.from_token, "Farm Pool 1");
    assert_eq!(harvest.to_token, "CAKE");
    assert_eq!(harvest.to_amount, "0.4");
    assert_eq!(harvest.status, TransactionStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_unstake_reverses_token_direction() -> Result<()> {
    let app = TestApp::new(2)?;
    app.state.actions.stake(0, "2").await?;

    app.state.actions.unstake(0, "0.5").await?;
    app.state.actions.settle().await;

    let page = app
        .store
        .list(
            &TransactionFilter {
                tx_type: Some(TransactionType::Unstake),
                ..TransactionFilter::default()
            },
            Page::default(),
        )
        .await?;
    let unstake = &page.transactions[0].record;
    assert_eq!(unstake.from_token, "Farm Pool 0");
    assert_eq!(unstake.to_token, "CAKE-BNB LP");
    assert_eq!(unstake.from_amount, "0.5");
    assert_eq!(app.mock.staked(0, MOCK_ACCOUNT), 1_500_000_000_000_000_000);
    Ok(())
}

#[tokio::test]
async fn test_emergency_withdraw_marks_metadata() -> Result<()> {
    let app = app_with_account(2)?;
    app.state.actions.stake(0, "1.25").await?;

    app.state.actions.emergency_withdraw(0).await?;
    app.state.actions.settle().await;

    assert_eq!(app.mock.staked(0, MOCK_ACCOUNT), 0);
    let page = app
        .store
        .list(
            &TransactionFilter {
                tx_type: Some(TransactionType::Unstake),
                ..TransactionFilter::default()
            },
            Page::default(),
        )
        .await?;
    let record = &page.transactions[0].record;
    assert_eq!(record.from_amount, "1.25");
    assert_eq!(record.metadata["emergency"], true);
    assert_eq!(record.metadata["poolId"], 0);
    Ok(())
}

#[tokio::test]
async fn test_user_position_after_confirmed_stake() -> Result<()> {
    let app = app_with_account(2)?;
    let before = app.state.pools.pools().await;
    assert_eq!(before[0].user_staked, "0");

    app.state.actions.stake(0, "3").await?;
    app.state.actions.settle().await;

    // confirmation invalidates the snapshot
    let after = app.state.pools.pools().await;
    assert_eq!(after[0].user_staked, "3");
    assert_eq!(after[0].pending_rewards, "0.3");
    Ok(())
}

#[tokio::test]
async fn test_inactive_pool_rejects_stake() -> Result<()> {
    let app = TestApp::new(4)?;
    app.state.actions.update_pool(2, 0, false, false).await?;

    let err = app.state.actions.stake(2, "1").await.unwrap_err();

    assert!(matches!(err, ServiceError::Chain(ref e) if e.kind == ChainErrorKind::ContractReverted));
    Ok(())
}
