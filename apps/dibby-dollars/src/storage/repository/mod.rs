// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the ledger database.
//!
//! Each repository borrows the [`Ledger`](super::Ledger) and provides the
//! operations for one entity type. Operations that touch several tables
//! (raffle draw plus prize entry) run inside a single write transaction.

pub mod behaviors;
pub mod raffle;
pub mod settings;
pub mod snapshots;
pub mod transactions;
pub mod users;

pub use behaviors::{BehaviorRepository, StoredBehavior, MAX_FOCUS_BEHAVIORS, MIN_FOCUS_BEHAVIORS};
pub use raffle::{DrawOutcome, RaffleRepository, StoredRaffleDraw};
pub use settings::SettingsRepository;
pub use snapshots::SnapshotRepository;
pub use transactions::{
    normalize_notes, NewTransaction, StoredTransaction, TransactionFilter, TransactionRepository,
};
pub use users::{NewUser, StoredUser, UserRepository};
