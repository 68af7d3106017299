// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent storage for the token economy using an embedded **redb**
//! database. A single file under `DATA_DIR` holds users, the immutable
//! ledger, the behavior catalog, raffle draws, configuration and daily
//! snapshots.
//!
//! ## Invariants
//!
//! - Ledger entries are append-only; a balance is always the sum of entries
//! - Every balance-changing write commits atomically and reports the
//!   resulting balance from inside the same transaction
//! - Usernames and behavior names are unique

pub mod ledger;
pub mod repository;

pub use ledger::{Ledger, LedgerError, LedgerResult};
pub use repository::{
    normalize_notes, BehaviorRepository, DrawOutcome, NewTransaction, NewUser, RaffleRepository,
    SettingsRepository, SnapshotRepository, StoredBehavior, StoredRaffleDraw, StoredTransaction,
    StoredUser, TransactionFilter, TransactionRepository, UserRepository,
};
