// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Behavior catalog and per-teacher focus selections.

use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use crate::models::Behavior;
use crate::storage::ledger::{
    next_id, read_all_json, read_json, to_json, Ledger, LedgerError, LedgerResult,
    BEHAVIORS, BEHAVIOR_NAMES, TEACHER_FOCUS,
};

/// Smallest focus set a teacher may save.
pub const MIN_FOCUS_BEHAVIORS: usize = 3;
/// Largest focus set a teacher may save.
pub const MAX_FOCUS_BEHAVIORS: usize = 5;

/// Behavior category as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredBehavior {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub is_system_default: bool,
    pub is_active: bool,
}

impl From<StoredBehavior> for Behavior {
    fn from(b: StoredBehavior) -> Self {
        Behavior {
            id: b.id,
            name: b.name,
            description: b.description,
            is_system_default: b.is_system_default,
            is_active: b.is_active,
        }
    }
}

/// Repository for behaviors and focus selections.
pub struct BehaviorRepository<'a> {
    ledger: &'a Ledger,
}

impl<'a> BehaviorRepository<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    pub fn get(&self, behavior_id: u64) -> LedgerResult<Option<StoredBehavior>> {
        let txn = self.ledger.begin_read()?;
        let table = txn.open_table(BEHAVIORS)?;
        read_json(&table, behavior_id)
    }

    pub fn list_all(&self) -> LedgerResult<Vec<StoredBehavior>> {
        let txn = self.ledger.begin_read()?;
        let table = txn.open_table(BEHAVIORS)?;
        read_all_json(&table)
    }

    /// Active behaviors ordered by name.
    pub fn list_active(&self) -> LedgerResult<Vec<StoredBehavior>> {
        let mut behaviors: Vec<StoredBehavior> =
            self.list_all()?.into_iter().filter(|b| b.is_active).collect();
        behaviors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(behaviors)
    }

    /// Create a behavior. Names are unique (exact match).
    pub fn create(
        &self,
        name: &str,
        description: Option<String>,
        is_system_default: bool,
    ) -> LedgerResult<StoredBehavior> {
        let name = name.trim();
        let txn = self.ledger.begin_write()?;
        let behavior = {
            let mut names = txn.open_table(BEHAVIOR_NAMES)?;
            if names.get(name)?.is_some() {
                return Err(LedgerError::Conflict(format!("Behavior {name}")));
            }

            let behavior = StoredBehavior {
                id: next_id(&txn, "behaviors")?,
                name: name.to_string(),
                description,
                is_system_default,
                is_active: true,
            };
            names.insert(behavior.name.as_str(), behavior.id)?;
            let mut table = txn.open_table(BEHAVIORS)?;
            table.insert(behavior.id, to_json(&behavior)?.as_slice())?;
            behavior
        };
        txn.commit()?;

        tracing::info!(behavior_id = behavior.id, name = %behavior.name, "Behavior created");
        Ok(behavior)
    }

    pub fn find_by_name(&self, name: &str) -> LedgerResult<Option<StoredBehavior>> {
        let txn = self.ledger.begin_read()?;
        let names = txn.open_table(BEHAVIOR_NAMES)?;
        let Some(id) = names.get(name.trim())?.map(|v| v.value()) else {
            return Ok(None);
        };
        let table = txn.open_table(BEHAVIORS)?;
        read_json(&table, id)
    }

    /// A teacher's focus behaviors in display order. Behaviors that were
    /// deactivated since the selection are skipped.
    pub fn focus_for(&self, teacher_id: u64) -> LedgerResult<Vec<StoredBehavior>> {
        let txn = self.ledger.begin_read()?;
        let focus = txn.open_table(TEACHER_FOCUS)?;
        let ids: Vec<u64> = read_json(&focus, teacher_id)?.unwrap_or_default();

        let table = txn.open_table(BEHAVIORS)?;
        let mut behaviors = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(behavior) = read_json::<StoredBehavior, u64>(&table, id)? {
                if behavior.is_active {
                    behaviors.push(behavior);
                }
            }
        }
        Ok(behaviors)
    }

    /// Replace a teacher's focus set. Every id must exist; the stored order
    /// is the order given.
    pub fn set_focus(&self, teacher_id: u64, behavior_ids: &[u64]) -> LedgerResult<()> {
        let txn = self.ledger.begin_write()?;
        {
            let table = txn.open_table(BEHAVIORS)?;
            for id in behavior_ids {
                if table.get(*id)?.is_none() {
                    return Err(LedgerError::NotFound(format!("Behavior {id}")));
                }
            }
            let mut focus = txn.open_table(TEACHER_FOCUS)?;
            focus.insert(teacher_id, to_json(&behavior_ids)?.as_slice())?;
        }
        txn.commit()?;

        tracing::info!(teacher_id, count = behavior_ids.len(), "Focus behaviors updated");
        Ok(())
    }
}
