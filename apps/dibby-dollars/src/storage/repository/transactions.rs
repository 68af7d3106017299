// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger entry repository.
//!
//! Entries are immutable once written. Each insert also writes the
//! `user_tx_index` row that carries the signed amount, and the caller gets
//! the balance recomputed inside the same write transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use crate::models::{TransactionKind, TransactionRecord};
use crate::storage::ledger::{
    balance_in, make_index_key, next_id, read_all_json, read_json, to_json, tx_id_from_key,
    user_key_range, Ledger, LedgerError, LedgerResult, TRANSACTIONS, USER_TX_INDEX,
};

/// Maximum stored length of free-text notes.
pub const MAX_NOTES_LEN: usize = 255;

/// Ledger entry as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredTransaction {
    pub id: u64,
    pub user_id: u64,
    pub amount: i64,
    pub kind: TransactionKind,
    pub category_id: Option<u64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Teacher or admin who created the entry; `None` for system entries
    pub created_by_id: Option<u64>,
}

impl StoredTransaction {
    /// Client-facing view. `category_name` is resolved by the caller.
    pub fn to_record(&self, category_name: Option<String>) -> TransactionRecord {
        TransactionRecord {
            id: self.id,
            user_id: self.user_id,
            amount: self.amount,
            kind: self.kind,
            category_id: self.category_id,
            category_name,
            notes: self.notes.clone(),
            created_at: self.created_at,
            created_by_id: self.created_by_id,
        }
    }
}

/// Fields needed to append a ledger entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: u64,
    pub amount: i64,
    pub kind: TransactionKind,
    pub category_id: Option<u64>,
    pub notes: Option<String>,
    pub created_by_id: Option<u64>,
}

/// Trim notes and cap them at [`MAX_NOTES_LEN`] characters; blank becomes `None`.
pub fn normalize_notes(notes: Option<&str>) -> Option<String> {
    let trimmed: String = notes?.trim().chars().take(MAX_NOTES_LEN).collect();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Filters for ledger listings.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<u64>,
    pub kind: Option<TransactionKind>,
    pub limit: usize,
    pub offset: usize,
}

/// Append an entry inside an existing write transaction and return it with
/// the user's post-insert balance.
pub(crate) fn insert_entry(
    txn: &WriteTransaction,
    new_tx: NewTransaction,
) -> LedgerResult<(StoredTransaction, i64)> {
    let tx = StoredTransaction {
        id: next_id(txn, "transactions")?,
        user_id: new_tx.user_id,
        amount: new_tx.amount,
        kind: new_tx.kind,
        category_id: new_tx.category_id,
        notes: new_tx.notes,
        created_at: Utc::now(),
        created_by_id: new_tx.created_by_id,
    };

    let mut idx_table = txn.open_table(USER_TX_INDEX)?;
    let balance = balance_in(&idx_table, tx.user_id)?
        .checked_add(tx.amount)
        .ok_or(LedgerError::AmountTooLarge)?;

    let mut tx_table = txn.open_table(TRANSACTIONS)?;
    tx_table.insert(tx.id, to_json(&tx)?.as_slice())?;

    let key = make_index_key(tx.user_id, tx.created_at.timestamp_micros(), tx.id);
    idx_table.insert(key.as_slice(), tx.amount)?;
    Ok((tx, balance))
}

/// Repository for ledger entries and balances.
pub struct TransactionRepository<'a> {
    ledger: &'a Ledger,
}

impl<'a> TransactionRepository<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    /// Append an entry atomically and return the authoritative new balance.
    pub fn record(&self, new_tx: NewTransaction) -> LedgerResult<(StoredTransaction, i64)> {
        let txn = self.ledger.begin_write()?;
        let (tx, balance) = insert_entry(&txn, new_tx)?;
        txn.commit()?;

        tracing::info!(
            tx_id = tx.id,
            user_id = tx.user_id,
            amount = tx.amount,
            kind = ?tx.kind,
            new_balance = balance,
            "Ledger entry recorded"
        );
        Ok((tx, balance))
    }

    pub fn get(&self, tx_id: u64) -> LedgerResult<Option<StoredTransaction>> {
        let txn = self.ledger.begin_read()?;
        let table = txn.open_table(TRANSACTIONS)?;
        read_json(&table, tx_id)
    }

    /// Current balance (sum of all entries) for a user.
    pub fn balance(&self, user_id: u64) -> LedgerResult<i64> {
        let txn = self.ledger.begin_read()?;
        let idx_table = txn.open_table(USER_TX_INDEX)?;
        balance_in(&idx_table, user_id)
    }

    /// Balances of every user that has at least one entry.
    pub fn balances(&self) -> LedgerResult<HashMap<u64, i64>> {
        let txn = self.ledger.begin_read()?;
        let idx_table = txn.open_table(USER_TX_INDEX)?;
        let mut balances = HashMap::new();
        for entry in idx_table.iter()? {
            let (key, amount) = entry?;
            let key = key.value();
            let Some(user_bytes) = key.get(..8) else {
                continue;
            };
            let mut raw = [0u8; 8];
            raw.copy_from_slice(user_bytes);
            let total = balances.entry(u64::from_be_bytes(raw)).or_insert(0i64);
            *total = total
                .checked_add(amount.value())
                .ok_or(LedgerError::AmountTooLarge)?;
        }
        Ok(balances)
    }

    /// Sum of a user's entries of one kind.
    pub fn sum_by_kind(&self, user_id: u64, kind: TransactionKind) -> LedgerResult<i64> {
        self.for_user(user_id)?
            .iter()
            .filter(|tx| tx.kind == kind)
            .try_fold(0i64, |total, tx| total.checked_add(tx.amount))
            .ok_or(LedgerError::AmountTooLarge)
    }

    /// All entries of one user, newest first.
    pub fn for_user(&self, user_id: u64) -> LedgerResult<Vec<StoredTransaction>> {
        let txn = self.ledger.begin_read()?;
        let idx_table = txn.open_table(USER_TX_INDEX)?;
        let tx_table = txn.open_table(TRANSACTIONS)?;

        let (start, end) = user_key_range(user_id);
        let mut results = Vec::new();
        for entry in idx_table.range(start.as_slice()..=end.as_slice())? {
            let (key, _) = entry?;
            if let Some(tx_id) = tx_id_from_key(key.value()) {
                if let Some(tx) = read_json::<StoredTransaction, u64>(&tx_table, tx_id)? {
                    results.push(tx);
                }
            }
        }
        Ok(results)
    }

    /// Every entry in the ledger, newest first.
    pub fn all(&self) -> LedgerResult<Vec<StoredTransaction>> {
        let txn = self.ledger.begin_read()?;
        let tx_table = txn.open_table(TRANSACTIONS)?;
        let mut all: Vec<StoredTransaction> = read_all_json(&tx_table)?;
        all.reverse();
        Ok(all)
    }

    /// Filtered, paginated listing, newest first. Returns `(page, total)`.
    pub fn list(&self, filter: &TransactionFilter) -> LedgerResult<(Vec<StoredTransaction>, usize)> {
        let source = match filter.user_id {
            Some(user_id) => self.for_user(user_id)?,
            None => self.all()?,
        };
        let matching: Vec<StoredTransaction> = source
            .into_iter()
            .filter(|tx| filter.kind.map_or(true, |kind| tx.kind == kind))
            .collect();
        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect();
        Ok((page, total))
    }
}
