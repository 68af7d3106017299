// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `usernames`: lowercase username → user_id
//! - `transactions`: tx_id → serialized StoredTransaction
//! - `user_tx_index`: composite key (user_id|!timestamp|!tx_id) → amount
//! - `behaviors`: behavior_id → serialized StoredBehavior
//! - `behavior_names`: behavior name → behavior_id
//! - `teacher_focus`: teacher user_id → ordered behavior ids (JSON)
//! - `raffle_draws`: draw_id → serialized StoredRaffleDraw
//! - `system_config`: key → serialized StoredSetting
//! - `daily_snapshots`: (user_id, day number) → balance
//! - `sequences`: sequence name → last issued id
//!
//! A user's balance is the sum of the amounts under their index prefix, so
//! inserting a ledger entry and reading the new balance happen in the same
//! write transaction.

use std::path::Path;

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

pub(crate) const USERNAMES: TableDefinition<&str, u64> = TableDefinition::new("usernames");

pub(crate) const TRANSACTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("transactions");

/// Index: composite key → signed amount.
/// Key format: `user_id_be | !timestamp_micros_be | !tx_id_be` (24 bytes) for
/// newest-first range scans and balance sums.
pub(crate) const USER_TX_INDEX: TableDefinition<&[u8], i64> =
    TableDefinition::new("user_tx_index");

pub(crate) const BEHAVIORS: TableDefinition<u64, &[u8]> = TableDefinition::new("behaviors");

pub(crate) const BEHAVIOR_NAMES: TableDefinition<&str, u64> =
    TableDefinition::new("behavior_names");

pub(crate) const TEACHER_FOCUS: TableDefinition<u64, &[u8]> = TableDefinition::new("teacher_focus");

pub(crate) const RAFFLE_DRAWS: TableDefinition<u64, &[u8]> = TableDefinition::new("raffle_draws");

pub(crate) const SYSTEM_CONFIG: TableDefinition<&str, &[u8]> =
    TableDefinition::new("system_config");

/// Key: `(user_id, days since CE)`.
pub(crate) const DAILY_SNAPSHOTS: TableDefinition<(u64, i32), i64> =
    TableDefinition::new("daily_snapshots");

const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A balance or total would leave the `i64` range.
    #[error("amount too large")]
    AmountTooLarge,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the user_tx_index table.
///
/// The inverted timestamp ensures newest-first ordering when scanning forward;
/// the inverted id breaks ties between entries in the same microsecond.
pub(crate) fn make_index_key(user_id: u64, timestamp_micros: i64, tx_id: u64) -> [u8; 24] {
    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&user_id.to_be_bytes());
    key[8..16].copy_from_slice(&(!timestamp_micros as u64).to_be_bytes());
    key[16..].copy_from_slice(&(!tx_id).to_be_bytes());
    key
}

/// Inclusive key range covering every index entry of one user.
pub(crate) fn user_key_range(user_id: u64) -> ([u8; 24], [u8; 24]) {
    let mut start = [0u8; 24];
    start[..8].copy_from_slice(&user_id.to_be_bytes());
    let mut end = [0xFFu8; 24];
    end[..8].copy_from_slice(&user_id.to_be_bytes());
    (start, end)
}

/// Extract the tx_id portion from a composite index key.
pub(crate) fn tx_id_from_key(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.get(16..24)?.try_into().ok()?;
    Some(!u64::from_be_bytes(bytes))
}

// =============================================================================
// JSON value helpers
// =============================================================================

pub(crate) fn read_json<T, K>(
    table: &impl ReadableTable<K, &'static [u8]>,
    key: K::SelfType<'_>,
) -> LedgerResult<Option<T>>
where
    T: DeserializeOwned,
    K: redb::Key + 'static,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

pub(crate) fn read_all_json<T, K>(table: &impl ReadableTable<K, &'static [u8]>) -> LedgerResult<Vec<T>>
where
    T: DeserializeOwned,
    K: redb::Key + 'static,
{
    let mut items = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        items.push(serde_json::from_slice(value.value())?);
    }
    Ok(items)
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Sum of a user's ledger entries inside an open transaction.
pub(crate) fn balance_in(
    index: &impl ReadableTable<&'static [u8], i64>,
    user_id: u64,
) -> LedgerResult<i64> {
    let (start, end) = user_key_range(user_id);
    let mut total = 0i64;
    for entry in index.range(start.as_slice()..=end.as_slice())? {
        let (_, amount) = entry?;
        total = total
            .checked_add(amount.value())
            .ok_or(LedgerError::AmountTooLarge)?;
    }
    Ok(total)
}

/// Issue the next id for a sequence inside a write transaction.
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> LedgerResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

// =============================================================================
// Ledger
// =============================================================================

/// Embedded ACID ledger database.
pub struct Ledger {
    db: Database,
}

impl Ledger {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERNAMES)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(USER_TX_INDEX)?;
            let _ = write_txn.open_table(BEHAVIORS)?;
            let _ = write_txn.open_table(BEHAVIOR_NAMES)?;
            let _ = write_txn.open_table(TEACHER_FOCUS)?;
            let _ = write_txn.open_table(RAFFLE_DRAWS)?;
            let _ = write_txn.open_table(SYSTEM_CONFIG)?;
            let _ = write_txn.open_table(DAILY_SNAPSHOTS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Ledger database opened");
        Ok(Self { db })
    }

    pub(crate) fn begin_read(&self) -> LedgerResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub(crate) fn begin_write(&self) -> LedgerResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Whether the database is reachable for reads (readiness probe).
    pub fn is_readable(&self) -> bool {
        match self.db.begin_read() {
            Ok(txn) => txn.open_table(USERS).is_ok(),
            Err(_) => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn temp_ledger() -> (Ledger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(&dir.path().join("test.redb")).unwrap();
        (ledger, dir)
    }

    #[test]
    fn make_index_key_ordering() {
        // Newer timestamps should produce smaller composite keys (descending)
        let key_old = make_index_key(1, 1_000, 10);
        let key_new = make_index_key(1, 2_000, 11);
        assert!(key_new < key_old, "Newer timestamps should sort first");
    }

    #[test]
    fn index_keys_group_by_user() {
        let (start, end) = user_key_range(2);
        let inside = make_index_key(2, 123_456, 99);
        let other = make_index_key(3, 123_456, 99);
        assert!(inside >= start && inside <= end);
        assert!(other > end);
        assert_eq!(tx_id_from_key(&inside), Some(99));
    }

    #[test]
    fn sequences_are_monotonic() {
        let (ledger, _dir) = temp_ledger();
        let txn = ledger.begin_write().unwrap();
        assert_eq!(next_id(&txn, "users").unwrap(), 1);
        assert_eq!(next_id(&txn, "users").unwrap(), 2);
        assert_eq!(next_id(&txn, "behaviors").unwrap(), 1);
        txn.commit().unwrap();

        let txn = ledger.begin_write().unwrap();
        assert_eq!(next_id(&txn, "users").unwrap(), 3);
    }

    #[test]
    fn fresh_ledger_is_readable() {
        let (ledger, _dir) = temp_ledger();
        assert!(ledger.is_readable());
    }
}
