//! PostgreSQL transaction store with runtime queries (no compile-time checking)

use async_trait::async_trait;
use farm_types::{StoredTransaction, TransactionRecord, TransactionStatus, TransactionType};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use tracing::info;

use super::{InsertOutcome, Page, TransactionFilter, TransactionPage, TransactionStore, TransactionSummary};
use crate::config::DatabaseConfig;
use crate::core::{StorageError, StorageResult};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id UUID PRIMARY KEY,
        tx_type TEXT NOT NULL,
        date TIMESTAMPTZ NOT NULL,
        from_token TEXT NOT NULL,
        from_amount TEXT NOT NULL DEFAULT '0',
        to_token TEXT NOT NULL,
        to_amount TEXT NOT NULL DEFAULT '0',
        gas_fee TEXT NOT NULL DEFAULT '0',
        status TEXT NOT NULL DEFAULT 'pending',
        tx_hash TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_tx_hash ON transactions (tx_hash);
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions (date DESC);
    CREATE INDEX IF NOT EXISTS idx_transactions_type_status ON transactions (tx_type, status);
"#;

const COLUMNS: &str = "id, tx_type, date, from_token, from_amount, to_token, to_amount, gas_fee, \
                       status, tx_hash, description, metadata, created_at";

#[derive(Clone)]
pub struct PostgresTransactionStore {
    pub pool: PgPool,
}

impl PostgresTransactionStore {
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        info!("Connecting to PostgreSQL transaction store");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> StorageResult<()> {
        self.pool.execute(SCHEMA).await?;
        Ok(())
    }

    async fn find_by_hash(&self, tx_hash: &str) -> StorageResult<Option<StoredTransaction>> {
        let query = format!("SELECT {} FROM transactions WHERE tx_hash = $1", COLUMNS);
        let row = sqlx::query(&query).bind(tx_hash).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_stored).transpose()
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TransactionFilter) {
    builder.push(" WHERE TRUE");
    if let Some(tx_type) = filter.tx_type {
        builder.push(" AND tx_type = ").push_bind(tx_type.as_str());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(from) = filter.from_date {
        builder.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.to_date {
        builder.push(" AND date <= ").push_bind(to);
    }
}

fn row_to_stored(row: &PgRow) -> StorageResult<StoredTransaction> {
    let tx_type: String = row.try_get("tx_type")?;
    let status: String = row.try_get("status")?;
    let tx_type = tx_type
        .parse::<TransactionType>()
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    let status = status
        .parse::<TransactionStatus>()
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    Ok(StoredTransaction {
        id: row.try_get("id")?,
        record: TransactionRecord {
            tx_type,
            date: row.try_get("date")?,
            from_token: row.try_get("from_token")?,
            from_amount: row.try_get("from_amount")?,
            to_token: row.try_get("to_token")?,
            to_amount: row.try_get("to_amount")?,
            gas_fee: row.try_get("gas_fee")?,
            status,
            tx_hash: row.try_get("tx_hash")?,
            description: row.try_get("description")?,
            metadata: row.try_get("metadata")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn insert(&self, record: TransactionRecord) -> StorageResult<InsertOutcome> {
        let stored = StoredTransaction::new(record);
        let query = format!(
            r#"
            INSERT INTO transactions (
                id, tx_type, date, from_token, from_amount, to_token, to_amount,
                gas_fee, status, tx_hash, description, metadata, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (tx_hash) DO NOTHING
            RETURNING {}
            "#,
            COLUMNS
        );

        let r = &stored.record;
        let inserted = sqlx::query(&query)
            .bind(stored.id)
            .bind(r.tx_type.as_str())
            .bind(r.date)
            .bind(&r.from_token)
            .bind(&r.from_amount)
            .bind(&r.to_token)
            .bind(&r.to_amount)
            .bind(&r.gas_fee)
            .bind(r.status.as_str())
            .bind(&r.tx_hash)
            .bind(&r.description)
            .bind(&r.metadata)
            .bind(stored.created_at)
            .fetch_optional(&self.pool)
            .await?;

        match inserted {
            Some(row) => Ok(InsertOutcome::Created(row_to_stored(&row)?)),
            None => {
                let existing = self.find_by_hash(&r.tx_hash).await?.ok_or_else(|| {
                    StorageError::Database(format!("conflicting row for {} disappeared", r.tx_hash))
                })?;
                Ok(InsertOutcome::Existing(existing))
            }
        }
    }

    async fn list(&self, filter: &TransactionFilter, page: Page) -> StorageResult<TransactionPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transactions");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM transactions", COLUMNS));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY date DESC, created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = select.build().fetch_all(&self.pool).await?;

        let transactions = rows.iter().map(row_to_stored).collect::<StorageResult<Vec<_>>>()?;
        let total = total.max(0) as u64;

        Ok(TransactionPage {
            transactions,
            total,
            page: page.page,
            pages: page.pages_for(total),
        })
    }

    async fn summary(&self) -> StorageResult<TransactionSummary> {
        let query = r#"
            SELECT tx_type, status, COUNT(*) AS count,
                   COALESCE(SUM(NULLIF(TRIM(gas_fee), '')::NUMERIC), 0) AS fees
            FROM transactions
            GROUP BY tx_type, status
        "#;
        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let tx_type: String = row.try_get("tx_type")?;
            let status: String = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            let fees: Decimal = row.try_get("fees")?;
            let key = (
                tx_type
                    .parse::<TransactionType>()
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
                status
                    .parse::<TransactionStatus>()
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
            );
            groups.push((key, (count.max(0) as u64, fees)));
        }

        Ok(TransactionSummary::from_groups(groups))
    }

    async fn update_status(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        gas_fee: Option<String>,
    ) -> StorageResult<Option<StoredTransaction>> {
        let query = format!(
            "UPDATE transactions SET status = $2, gas_fee = COALESCE($3, gas_fee) WHERE tx_hash = $1 RETURNING {}",
            COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(tx_hash)
            .bind(status.as_str())
            .bind(gas_fee)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_stored).transpose()
    }

    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
