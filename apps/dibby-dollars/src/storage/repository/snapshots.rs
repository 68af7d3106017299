// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Daily balance snapshots used for minimum-balance interest.

use chrono::{Datelike, NaiveDate};
use redb::ReadableTable;

use crate::storage::ledger::{Ledger, LedgerResult, DAILY_SNAPSHOTS};

/// Repository for daily snapshots. At most one snapshot exists per
/// `(user, date)`.
pub struct SnapshotRepository<'a> {
    ledger: &'a Ledger,
}

impl<'a> SnapshotRepository<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    /// Record a snapshot. Returns `false` if one already exists for that day.
    pub fn record(&self, user_id: u64, date: NaiveDate, balance: i64) -> LedgerResult<bool> {
        let key = (user_id, date.num_days_from_ce());
        let txn = self.ledger.begin_write()?;
        let created = {
            let mut table = txn.open_table(DAILY_SNAPSHOTS)?;
            if table.get(key)?.is_some() {
                false
            } else {
                table.insert(key, balance)?;
                true
            }
        };
        txn.commit()?;
        Ok(created)
    }

    pub fn get(&self, user_id: u64, date: NaiveDate) -> LedgerResult<Option<i64>> {
        let txn = self.ledger.begin_read()?;
        let table = txn.open_table(DAILY_SNAPSHOTS)?;
        Ok(table
            .get((user_id, date.num_days_from_ce()))?
            .map(|v| v.value()))
    }

    /// Minimum snapshot balance within `from..=to`, if any snapshot exists.
    pub fn min_balance_between(
        &self,
        user_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> LedgerResult<Option<i64>> {
        let txn = self.ledger.begin_read()?;
        let table = txn.open_table(DAILY_SNAPSHOTS)?;
        let start = (user_id, from.num_days_from_ce());
        let end = (user_id, to.num_days_from_ce());

        let mut min: Option<i64> = None;
        for entry in table.range(start..=end)? {
            let (_, balance) = entry?;
            let balance = balance.value();
            min = Some(min.map_or(balance, |m| m.min(balance)));
        }
        Ok(min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ledger::tests::temp_ledger;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn record_is_idempotent_per_day() {
        let (ledger, _dir) = temp_ledger();
        let repo = SnapshotRepository::new(&ledger);
        assert!(repo.record(1, day(1), 10).unwrap());
        assert!(!repo.record(1, day(1), 99).unwrap());
        assert_eq!(repo.get(1, day(1)).unwrap(), Some(10));
    }

    #[test]
    fn min_balance_respects_window_and_user() {
        let (ledger, _dir) = temp_ledger();
        let repo = SnapshotRepository::new(&ledger);
        repo.record(1, day(1), 3).unwrap();
        repo.record(1, day(3), 20).unwrap();
        repo.record(1, day(5), 12).unwrap();
        repo.record(2, day(4), 1).unwrap();

        assert_eq!(repo.min_balance_between(1, day(2), day(9)).unwrap(), Some(12));
        assert_eq!(repo.min_balance_between(1, day(1), day(9)).unwrap(), Some(3));
        assert_eq!(repo.min_balance_between(3, day(1), day(9)).unwrap(), None);
    }
}
