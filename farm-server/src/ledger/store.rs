//! Durable local storage for ledger entries, backed by RocksDB

use rocksdb::{ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options};
use std::sync::Arc;
use tracing::info;

use super::LedgerEntry;
use crate::config::RocksDBConfig;
use crate::core::{StorageError, StorageResult};

/// Type alias for the RocksDB instance
pub type RocksDB = DBWithThreadMode<MultiThreaded>;

/// Column family names
pub struct ColumnFamilies;

impl ColumnFamilies {
    pub const LEDGER: &'static str = "ledger";

    pub fn all() -> Vec<&'static str> {
        vec![Self::LEDGER]
    }
}

/// Keyed list storage for ledger entries
///
/// Each key holds a whole list; callers serialize access.
pub trait LedgerStore: Send + Sync {
    fn load(&self, key: &str) -> StorageResult<Vec<LedgerEntry>>;

    fn save(&self, key: &str, entries: &[LedgerEntry]) -> StorageResult<()>;

    fn append(&self, key: &str, entry: LedgerEntry) -> StorageResult<()> {
        let mut entries = self.load(key)?;
        entries.push(entry);
        self.save(key, &entries)
    }
}

/// RocksDB-backed ledger store
#[derive(Clone)]
pub struct RocksLedgerStore {
    db: Arc<RocksDB>,
}

impl RocksLedgerStore {
    /// Open (or create) the ledger database
    pub fn open(config: &RocksDBConfig) -> StorageResult<Self> {
        info!("Opening ledger RocksDB at path: {}", config.path.display());

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);
        db_opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);

        if config.enable_compression {
            db_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        }

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ColumnFamilies::all()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = RocksDB::open_cf_descriptors(&db_opts, &config.path, cf_descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get_cf(&self, name: &str) -> StorageResult<Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::MissingColumnFamily(name.to_string()))
    }
}

impl LedgerStore for RocksLedgerStore {
    fn load(&self, key: &str) -> StorageResult<Vec<LedgerEntry>> {
        let cf = self.get_cf(ColumnFamilies::LEDGER)?;
        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(data) => Ok(serde_json::from_slice(&data)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, key: &str, entries: &[LedgerEntry]) -> StorageResult<()> {
        let cf = self.get_cf(ColumnFamilies::LEDGER)?;
        if entries.is_empty() {
            self.db.delete_cf(&cf, key.as_bytes())?;
        } else {
            self.db.put_cf(&cf, key.as_bytes(), serde_json::to_vec(entries)?)?;
        }
        Ok(())
    }
}
