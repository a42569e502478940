//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `registrations` - Successful registrations (key: pair || position || tx)
//! - `registration_failures` - Failed registrations (key: pair || position || tx)
//! - `unstakes` - Raw unstake finalizations (key: attester || position || tx)
//! - `vault_positions` - Vault ownership (key: vault || owner)
//!
//! Every read is a prefix scan, so a lookup touches only the rows of the
//! requested pairs.

use crate::{
    config::StoreConfig,
    error::{Error, Result},
    types::{join_unstakes, RawUnstakeRow, VaultPosition},
    StakeEventSink, StakeEventStore,
};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};
use serde::de::DeserializeOwned;
use stake_core::{Address, EventRow, IdentityPair};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Column family names
const CF_REGISTRATIONS: &str = "registrations";
const CF_FAILURES: &str = "registration_failures";
const CF_UNSTAKES: &str = "unstakes";
const CF_VAULTS: &str = "vault_positions";

const KEY_SEPARATOR: u8 = b'|';

/// RocksDB-backed implementation of both store traits
pub struct RocksEventStore {
    db: Arc<DB>,
    path: PathBuf,
}

impl fmt::Debug for RocksEventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksEventStore")
            .field("path", &self.path)
            .finish()
    }
}

impl RocksEventStore {
    /// Open or create database
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.max_background_jobs);

        if config.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_REGISTRATIONS, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_FAILURES, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_UNSTAKES, Self::cf_options_rows()),
            ColumnFamilyDescriptor::new(CF_VAULTS, Self::cf_options_vaults()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB event store");

        Ok(Self {
            db: Arc::new(db),
            path: path.clone(),
        })
    }

    // Column family options

    fn cf_options_rows() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_vaults() -> Options {
        let mut opts = Options::default();
        // Point lookups on every unstake read
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    fn address_prefix(address: &Address) -> Vec<u8> {
        let mut key = address.as_str().as_bytes().to_vec();
        key.push(KEY_SEPARATOR);
        key
    }

    fn pair_prefix(pair: &IdentityPair) -> Vec<u8> {
        let mut key = Self::address_prefix(&pair.attester);
        key.extend_from_slice(&Self::address_prefix(&pair.withdrawer));
        key
    }

    fn positioned_key(mut prefix: Vec<u8>, block: u64, log: u64, tx: &str) -> Vec<u8> {
        prefix.extend_from_slice(&block.to_be_bytes());
        prefix.extend_from_slice(&log.to_be_bytes());
        prefix.extend_from_slice(tx.as_bytes());
        prefix
    }

    fn row_key(row: &EventRow) -> Vec<u8> {
        Self::positioned_key(
            Self::pair_prefix(&row.pair()),
            row.block_number,
            row.log_index,
            row.tx_hash.as_str(),
        )
    }

    fn unstake_key(row: &RawUnstakeRow) -> Vec<u8> {
        Self::positioned_key(
            Self::address_prefix(&row.attester),
            row.block_number,
            row.log_index,
            row.tx_hash.as_str(),
        )
    }

    fn vault_key(position: &VaultPosition) -> Vec<u8> {
        let mut key = Self::address_prefix(&position.vault);
        key.extend_from_slice(position.owner.as_str().as_bytes());
        key
    }

    // Scans

    fn scan_prefix<T: DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let cf = self.cf_handle(cf_name)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        let mut values = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(bincode::deserialize(&value)?);
        }

        Ok(values)
    }

    fn rows_for_pairs(&self, cf_name: &str, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        let unique: BTreeSet<&IdentityPair> = pairs.iter().collect();

        let mut rows = Vec::new();
        for pair in unique {
            rows.extend(self.scan_prefix::<EventRow>(cf_name, &Self::pair_prefix(pair))?);
        }

        tracing::debug!(cf = cf_name, rows = rows.len(), "Scanned event rows");
        Ok(rows)
    }

    fn vault_owners(&self, vault: &Address) -> Result<Vec<Address>> {
        let positions: Vec<VaultPosition> =
            self.scan_prefix(CF_VAULTS, &Self::address_prefix(vault))?;
        Ok(positions.into_iter().map(|position| position.owner).collect())
    }

    fn put<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf_handle(cf_name)?;
        let value = bincode::serialize(value)?;
        self.db.put_cf(cf, key, &value)?;
        Ok(())
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            registrations: self.approximate_count(CF_REGISTRATIONS)?,
            failures: self.approximate_count(CF_FAILURES)?,
            unstakes: self.approximate_count(CF_UNSTAKES)?,
            vault_positions: self.approximate_count(CF_VAULTS)?,
        })
    }

    fn approximate_count(&self, cf_name: &str) -> Result<u64> {
        let cf = self.cf_handle(cf_name)?;
        let count = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);
        Ok(count)
    }
}

#[async_trait]
impl StakeEventStore for RocksEventStore {
    async fn successful_registrations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        self.rows_for_pairs(CF_REGISTRATIONS, pairs)
    }

    async fn failed_registrations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        self.rows_for_pairs(CF_FAILURES, pairs)
    }

    async fn unstake_finalizations(&self, pairs: &[IdentityPair]) -> Result<Vec<EventRow>> {
        let wanted: HashSet<IdentityPair> = pairs.iter().cloned().collect();
        let attesters: BTreeSet<&Address> = pairs.iter().map(|pair| &pair.attester).collect();

        let mut raw = Vec::new();
        for attester in attesters {
            raw.extend(
                self.scan_prefix::<RawUnstakeRow>(CF_UNSTAKES, &Self::address_prefix(attester))?,
            );
        }

        // vault owners are looked up once per recipient
        let mut owners = std::collections::HashMap::new();
        for unstake in &raw {
            if !owners.contains_key(&unstake.recipient) {
                owners.insert(unstake.recipient.clone(), self.vault_owners(&unstake.recipient)?);
            }
        }

        let rows = join_unstakes(&wanted, raw.iter(), |recipient| {
            owners.get(recipient).cloned().unwrap_or_default()
        });

        tracing::debug!(raw = raw.len(), rows = rows.len(), "Joined unstake finalizations");
        Ok(rows)
    }
}

#[async_trait]
impl StakeEventSink for RocksEventStore {
    async fn record_registration(&self, row: EventRow) -> Result<()> {
        self.put(CF_REGISTRATIONS, &Self::row_key(&row), &row)
    }

    async fn record_registration_failure(&self, row: EventRow) -> Result<()> {
        self.put(CF_FAILURES, &Self::row_key(&row), &row)
    }

    async fn record_unstake(&self, row: RawUnstakeRow) -> Result<()> {
        self.put(CF_UNSTAKES, &Self::unstake_key(&row), &row)
    }

    async fn record_vault_position(&self, position: VaultPosition) -> Result<()> {
        self.put(CF_VAULTS, &Self::vault_key(&position), &position)
    }
}

/// Storage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Approximate registration rows
    pub registrations: u64,
    /// Approximate failure rows
    pub failures: u64,
    /// Approximate raw unstake rows
    pub unstakes: u64,
    /// Approximate vault positions
    pub vault_positions: u64,
}
