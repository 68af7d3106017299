// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Default catalog and demo accounts.
//!
//! Runs at startup when `SEED_DEMO_DATA=true`. Every step checks for
//! existing rows first, so seeding a populated ledger is a no-op.

use thiserror::Error;
use tracing::info;

use crate::auth::{hash_pin, PinError, Role};
use crate::models::TransactionKind;
use crate::storage::{
    BehaviorRepository, Ledger, LedgerError, NewTransaction, NewUser, SettingsRepository,
    TransactionRepository, UserRepository,
};

/// Default behavior catalog: (name, description).
pub const DEFAULT_BEHAVIORS: [(&str, &str); 8] = [
    ("Helping Others", "Assisting classmates with their work or tasks"),
    ("Staying On Task", "Focused and working on assigned activities"),
    ("Following Instructions", "Listening and following teacher directions"),
    ("Being Kind", "Showing kindness and respect to others"),
    ("Good Manners", "Using polite language and appropriate behavior"),
    ("Leadership", "Taking initiative and leading by example"),
    ("Teamwork", "Working cooperatively with classmates"),
    ("Problem Solving", "Working through challenges independently"),
];

/// Staff accounts: (username, secret, first, last, role).
const DEMO_STAFF: [(&str, &str, &str, &str, Role); 2] = [
    ("admin", "admin123", "System", "Administrator", Role::Admin),
    ("teacher", "teacher123", "Demo", "Teacher", Role::Teacher),
];

/// Demo students: (first, last, class, pin).
const DEMO_STUDENTS: [(&str, &str, &str, &str); 5] = [
    ("Alice", "Johnson", "5A", "1111"),
    ("Bob", "Smith", "5A", "2222"),
    ("Charlie", "Brown", "5B", "3333"),
    ("Diana", "Prince", "5B", "4444"),
    ("Ethan", "Hunt", "6A", "5555"),
];

const WELCOME_BONUS: i64 = 10;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Pin(#[from] PinError),
}

/// Counts of rows created by a seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub behaviors: usize,
    pub settings: usize,
    pub users: usize,
    pub welcome_bonuses: usize,
}

/// Seed the behavior catalog and configuration defaults.
pub fn seed_defaults(ledger: &Ledger) -> Result<SeedReport, SeedError> {
    let behaviors = BehaviorRepository::new(ledger);
    let mut report = SeedReport::default();

    for (name, description) in DEFAULT_BEHAVIORS {
        if behaviors.find_by_name(name)?.is_none() {
            behaviors.create(name, Some(description.to_string()), true)?;
            report.behaviors += 1;
        }
    }
    report.settings = SettingsRepository::new(ledger).seed_defaults()?;
    Ok(report)
}

/// Seed defaults plus demo staff, students and their welcome bonus.
pub fn seed_demo_data(ledger: &Ledger) -> Result<SeedReport, SeedError> {
    let mut report = seed_defaults(ledger)?;
    let users = UserRepository::new(ledger);

    for (username, secret, first, last, role) in DEMO_STAFF {
        if users.find_by_username(username)?.is_none() {
            users.create(NewUser {
                username: username.to_string(),
                pin_hash: hash_pin(secret)?,
                role,
                first_name: first.to_string(),
                last_name: last.to_string(),
                class_name: None,
            })?;
            report.users += 1;
        }
    }

    for (first, last, class_name, pin) in DEMO_STUDENTS {
        let username = format!("{}.{}", first.to_lowercase(), last.to_lowercase());
        if users.find_by_username(&username)?.is_none() {
            users.create(NewUser {
                username,
                pin_hash: hash_pin(pin)?,
                role: Role::Student,
                first_name: first.to_string(),
                last_name: last.to_string(),
                class_name: Some(class_name.to_string()),
            })?;
            report.users += 1;
        }
    }

    let admin_id = users.find_by_username("admin")?.map(|u| u.id);
    let transactions = TransactionRepository::new(ledger);
    for student in users.active_students(None)? {
        if transactions.for_user(student.id)?.is_empty() {
            transactions.record(NewTransaction {
                user_id: student.id,
                amount: WELCOME_BONUS,
                kind: TransactionKind::Deposit,
                category_id: None,
                notes: Some("Welcome bonus".to_string()),
                created_by_id: admin_id,
            })?;
            report.welcome_bonuses += 1;
        }
    }

    info!(
        behaviors = report.behaviors,
        settings = report.settings,
        users = report.users,
        welcome_bonuses = report.welcome_bonuses,
        "Demo data seeded"
    );
    Ok(report)
}
