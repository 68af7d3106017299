// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Savings Interest
//!
//! Daily balance snapshots and the weekly interest run.
//!
//! Interest is paid on the lowest balance a student held over the trailing
//! week, so depositing right before the run earns nothing extra:
//!
//! ```text
//! interest = floor(min_balance(today - 7 ..= today) * rate / 100)
//! ```
//!
//! A student with no snapshots in the window is paid on the current balance.

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use crate::models::{InterestSummary, TransactionKind};
use crate::storage::{
    Ledger, LedgerResult, NewTransaction, SettingsRepository, SnapshotRepository,
    TransactionRepository, UserRepository,
};

/// Trailing window for the minimum-balance lookup.
const INTEREST_WINDOW_DAYS: i64 = 7;

/// Record today's balance for every active student.
///
/// Returns the number of snapshots written; students already snapshotted
/// today are skipped.
pub fn take_daily_snapshot(ledger: &Ledger, today: NaiveDate) -> LedgerResult<usize> {
    let students = UserRepository::new(ledger).active_students(None)?;
    let balances = TransactionRepository::new(ledger).balances()?;
    let snapshots = SnapshotRepository::new(ledger);

    let mut written = 0;
    for student in &students {
        let balance = balances.get(&student.id).copied().unwrap_or(0);
        if snapshots.record(student.id, today, balance)? {
            written += 1;
        }
    }

    info!(date = %today, students = students.len(), written, "Daily balance snapshot taken");
    Ok(written)
}

/// Pay weekly interest to every active student.
pub fn calculate_weekly_interest(ledger: &Ledger, today: NaiveDate) -> LedgerResult<InterestSummary> {
    let rate = SettingsRepository::new(ledger).interest_rate()?;
    if rate <= 0.0 {
        info!(rate, "Interest rate is zero, skipping weekly interest");
        return Ok(InterestSummary {
            success: true,
            skipped: true,
            reason: Some("Interest rate is 0".to_string()),
            interest_rate: rate,
            ..Default::default()
        });
    }

    let students = UserRepository::new(ledger).active_students(None)?;
    let transactions = TransactionRepository::new(ledger);
    let snapshots = SnapshotRepository::new(ledger);
    let window_start = today - Duration::days(INTEREST_WINDOW_DAYS);

    let mut summary = InterestSummary {
        success: true,
        interest_rate: rate,
        ..Default::default()
    };

    for student in &students {
        let min_balance = match snapshots.min_balance_between(student.id, window_start, today)? {
            Some(min) => min,
            None => transactions.balance(student.id)?,
        };
        let amount = interest_for(min_balance, rate);
        if amount <= 0 {
            continue;
        }

        let entry = NewTransaction {
            user_id: student.id,
            amount,
            kind: TransactionKind::Interest,
            category_id: None,
            notes: Some(format!("Weekly interest ({rate}% on min balance {min_balance})")),
            created_by_id: None,
        };
        match transactions.record(entry) {
            Ok(_) => {
                summary.students_receiving_interest += 1;
                summary.total_interest_distributed =
                    summary.total_interest_distributed.saturating_add(amount);
            }
            Err(e) => {
                warn!(user_id = student.id, error = %e, "Failed to credit weekly interest");
                return Err(e);
            }
        }
    }

    info!(
        rate,
        students = summary.students_receiving_interest,
        total = summary.total_interest_distributed,
        "Weekly interest distributed"
    );
    Ok(summary)
}

/// Whole DB$ earned on `min_balance` at `rate` percent.
pub fn interest_for(min_balance: i64, rate: f64) -> i64 {
    if min_balance <= 0 || rate <= 0.0 {
        return 0;
    }
    (min_balance as f64 * rate / 100.0).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::ledger::tests::temp_ledger;
    use crate::storage::repository::users::tests::new_student;
    use crate::storage::repository::settings::INTEREST_RATE;

    fn deposit(ledger: &Ledger, user_id: u64, amount: i64) {
        TransactionRepository::new(ledger)
            .record(NewTransaction {
                user_id,
                amount,
                kind: TransactionKind::Deposit,
                category_id: None,
                notes: None,
                created_by_id: None,
            })
            .unwrap();
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn interest_is_floored_percentage() {
        assert_eq!(interest_for(100, 2.0), 2);
        assert_eq!(interest_for(149, 2.0), 2);
        assert_eq!(interest_for(49, 2.0), 0);
        assert_eq!(interest_for(1000, 2.5), 25);
        assert_eq!(interest_for(-20, 2.0), 0);
        assert_eq!(interest_for(500, 0.0), 0);
    }

    #[test]
    fn snapshot_is_idempotent_per_day() {
        let (ledger, _dir) = temp_ledger();
        let users = UserRepository::new(&ledger);
        let alice = users.create(new_student("Alice", "Johnson", Some("5A"))).unwrap();
        users.create(new_student("Bob", "Smith", Some("5A"))).unwrap();
        deposit(&ledger, alice.id, 30);

        assert_eq!(take_daily_snapshot(&ledger, day(1)).unwrap(), 2);
        assert_eq!(take_daily_snapshot(&ledger, day(1)).unwrap(), 0);
        assert_eq!(SnapshotRepository::new(&ledger).get(alice.id, day(1)).unwrap(), Some(30));
    }

    #[test]
    fn pays_on_minimum_snapshot_balance() {
        let (ledger, _dir) = temp_ledger();
        let alice = UserRepository::new(&ledger)
            .create(new_student("Alice", "Johnson", Some("5A")))
            .unwrap();
        let snapshots = SnapshotRepository::new(&ledger);
        snapshots.record(alice.id, day(2), 400).unwrap();
        snapshots.record(alice.id, day(5), 150).unwrap();
        snapshots.record(alice.id, day(8), 900).unwrap();
        deposit(&ledger, alice.id, 900);

        let summary = calculate_weekly_interest(&ledger, day(8)).unwrap();
        assert!(summary.success);
        assert!(!summary.skipped);
        assert_eq!(summary.students_receiving_interest, 1);
        assert_eq!(summary.total_interest_distributed, 3);

        let txs = TransactionRepository::new(&ledger).for_user(alice.id).unwrap();
        let interest = &txs[0];
        assert_eq!(interest.kind, TransactionKind::Interest);
        assert_eq!(interest.amount, 3);
        assert_eq!(interest.created_by_id, None);
        assert_eq!(
            interest.notes.as_deref(),
            Some("Weekly interest (2% on min balance 150)")
        );
    }

    #[test]
    fn falls_back_to_current_balance_without_snapshots() {
        let (ledger, _dir) = temp_ledger();
        let users = UserRepository::new(&ledger);
        let alice = users.create(new_student("Alice", "Johnson", Some("5A"))).unwrap();
        let bob = users.create(new_student("Bob", "Smith", Some("5A"))).unwrap();
        deposit(&ledger, alice.id, 250);
        deposit(&ledger, bob.id, 10);

        let summary = calculate_weekly_interest(&ledger, day(8)).unwrap();
        // Bob's 2% of 10 floors to zero and is skipped.
        assert_eq!(summary.students_receiving_interest, 1);
        assert_eq!(summary.total_interest_distributed, 5);
        assert_eq!(TransactionRepository::new(&ledger).balance(bob.id).unwrap(), 10);
    }

    #[test]
    fn zero_rate_skips_the_run() {
        let (ledger, _dir) = temp_ledger();
        SettingsRepository::new(&ledger).set(INTEREST_RATE, "0").unwrap();
        let alice = UserRepository::new(&ledger)
            .create(new_student("Alice", "Johnson", Some("5A")))
            .unwrap();
        deposit(&ledger, alice.id, 500);

        let summary = calculate_weekly_interest(&ledger, day(8)).unwrap();
        assert!(summary.skipped);
        assert_eq!(summary.reason.as_deref(), Some("Interest rate is 0"));
        assert_eq!(TransactionRepository::new(&ledger).balance(alice.id).unwrap(), 500);
    }

    #[test]
    fn staff_never_earn_interest() {
        let (ledger, _dir) = temp_ledger();
        let mut teacher = new_student("Terry", "Teacher", Some("5A"));
        teacher.role = Role::Teacher;
        teacher.username = "teacher".to_string();
        let teacher = UserRepository::new(&ledger).create(teacher).unwrap();
        deposit(&ledger, teacher.id, 1000);

        let summary = calculate_weekly_interest(&ledger, day(8)).unwrap();
        assert_eq!(summary.students_receiving_interest, 0);
    }
}
