// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Students, teachers and admins share one table. Usernames are unique and
//! stored lowercase; the `usernames` table maps them back to ids.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::models::UserProfile;
use crate::storage::ledger::{
    next_id, read_all_json, read_json, to_json, Ledger, LedgerError, LedgerResult, USERNAMES,
    USERS,
};

/// User record as persisted. The credential hash never leaves this layer
/// except for verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredUser {
    pub id: u64,
    pub username: String,
    /// Argon2id PHC string for the PIN or password
    pub pin_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub class_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Client-facing view, optionally carrying the current balance.
    pub fn to_profile(&self, balance: Option<i64>) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name(),
            class_name: self.class_name.clone(),
            is_active: self.is_active,
            created_at: Some(self.created_at),
            balance,
        }
    }
}

/// Fields needed to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub pin_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub class_name: Option<String>,
}

/// Repository for user records.
pub struct UserRepository<'a> {
    ledger: &'a Ledger,
}

impl<'a> UserRepository<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    pub fn get(&self, user_id: u64) -> LedgerResult<Option<StoredUser>> {
        let txn = self.ledger.begin_read()?;
        let table = txn.open_table(USERS)?;
        read_json(&table, user_id)
    }

    /// Get a user, failing with `NotFound` when absent.
    pub fn require(&self, user_id: u64) -> LedgerResult<StoredUser> {
        self.get(user_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("User {user_id}")))
    }

    pub fn find_by_username(&self, username: &str) -> LedgerResult<Option<StoredUser>> {
        let username = username.trim().to_lowercase();
        let txn = self.ledger.begin_read()?;
        let names = txn.open_table(USERNAMES)?;
        let Some(user_id) = names.get(username.as_str())?.map(|v| v.value()) else {
            return Ok(None);
        };
        let users = txn.open_table(USERS)?;
        read_json(&users, user_id)
    }

    /// Create a user with the exact username given.
    pub fn create(&self, new_user: NewUser) -> LedgerResult<StoredUser> {
        self.insert(new_user, false)
    }

    /// Create a user, appending a numeric suffix (`name1`, `name2`, ...)
    /// until the username is free.
    pub fn create_with_unique_username(&self, new_user: NewUser) -> LedgerResult<StoredUser> {
        self.insert(new_user, true)
    }

    fn insert(&self, new_user: NewUser, pick_free_name: bool) -> LedgerResult<StoredUser> {
        let base = new_user.username.trim().to_lowercase();
        let txn = self.ledger.begin_write()?;
        let user = {
            let mut names = txn.open_table(USERNAMES)?;
            let mut username = base.clone();
            let mut counter = 1u32;
            while names.get(username.as_str())?.is_some() {
                if !pick_free_name {
                    return Err(LedgerError::Conflict(format!("Username {base}")));
                }
                username = format!("{base}{counter}");
                counter += 1;
            }

            let user = StoredUser {
                id: next_id(&txn, "users")?,
                username,
                pin_hash: new_user.pin_hash,
                role: new_user.role,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                class_name: new_user.class_name,
                is_active: true,
                created_at: Utc::now(),
            };

            names.insert(user.username.as_str(), user.id)?;
            let mut users = txn.open_table(USERS)?;
            users.insert(user.id, to_json(&user)?.as_slice())?;
            user
        };
        txn.commit()?;

        tracing::info!(user_id = user.id, username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// Persist changes to an existing user. The username is immutable.
    pub fn update(&self, user: &StoredUser) -> LedgerResult<()> {
        let txn = self.ledger.begin_write()?;
        {
            let mut users = txn.open_table(USERS)?;
            let existing: Option<StoredUser> = read_json(&users, user.id)?;
            let existing =
                existing.ok_or_else(|| LedgerError::NotFound(format!("User {}", user.id)))?;
            let mut updated = user.clone();
            updated.username = existing.username;
            users.insert(user.id, to_json(&updated)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn list_all(&self) -> LedgerResult<Vec<StoredUser>> {
        let txn = self.ledger.begin_read()?;
        let users = txn.open_table(USERS)?;
        read_all_json(&users)
    }

    /// Active students, optionally limited to one class, ordered by last
    /// name then first name.
    pub fn active_students(&self, class_name: Option<&str>) -> LedgerResult<Vec<StoredUser>> {
        let mut students: Vec<StoredUser> = self
            .list_all()?
            .into_iter()
            .filter(|u| u.role == Role::Student && u.is_active)
            .filter(|u| match class_name {
                Some(class) => u.class_name.as_deref() == Some(class),
                None => true,
            })
            .collect();
        students.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(students)
    }

    /// Teachers and admins, teachers first, each ordered by last name.
    pub fn staff(&self) -> LedgerResult<Vec<StoredUser>> {
        let mut staff: Vec<StoredUser> = self
            .list_all()?
            .into_iter()
            .filter(|u| u.role != Role::Student)
            .collect();
        staff.sort_by(|a, b| {
            (a.role == Role::Admin, a.last_name.as_str())
                .cmp(&(b.role == Role::Admin, b.last_name.as_str()))
        });
        Ok(staff)
    }

    /// Sorted distinct class names of active students.
    pub fn class_names(&self) -> LedgerResult<Vec<String>> {
        let mut classes: Vec<String> = self
            .active_students(None)?
            .into_iter()
            .filter_map(|u| u.class_name)
            .filter(|c| !c.is_empty())
            .collect();
        classes.sort();
        classes.dedup();
        Ok(classes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::ledger::tests::temp_ledger;

    pub(crate) fn new_student(first: &str, last: &str, class: Option<&str>) -> NewUser {
        NewUser {
            username: format!("{}.{}", first.to_lowercase(), last.to_lowercase()),
            pin_hash: "unused".to_string(),
            role: Role::Student,
            first_name: first.to_string(),
            last_name: last.to_string(),
            class_name: class.map(str::to_string),
        }
    }

    #[test]
    fn create_and_lookup_by_username() {
        let (ledger, _dir) = temp_ledger();
        let repo = UserRepository::new(&ledger);
        let user = repo.create(new_student("Alice", "Johnson", Some("5A"))).unwrap();

        assert_eq!(user.username, "alice.johnson");
        let found = repo.find_by_username(" Alice.Johnson ").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.full_name(), "Alice Johnson");
    }

    #[test]
    fn duplicate_username_is_conflict() {
        let (ledger, _dir) = temp_ledger();
        let repo = UserRepository::new(&ledger);
        repo.create(new_student("Bob", "Smith", None)).unwrap();
        let err = repo.create(new_student("Bob", "Smith", None)).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[test]
    fn unique_username_gets_numeric_suffix() {
        let (ledger, _dir) = temp_ledger();
        let repo = UserRepository::new(&ledger);
        let first = repo
            .create_with_unique_username(new_student("Bob", "Smith", None))
            .unwrap();
        let second = repo
            .create_with_unique_username(new_student("Bob", "Smith", None))
            .unwrap();
        let third = repo
            .create_with_unique_username(new_student("Bob", "Smith", None))
            .unwrap();
        assert_eq!(first.username, "bob.smith");
        assert_eq!(second.username, "bob.smith1");
        assert_eq!(third.username, "bob.smith2");
    }

    #[test]
    fn active_students_are_sorted_and_filtered() {
        let (ledger, _dir) = temp_ledger();
        let repo = UserRepository::new(&ledger);
        repo.create(new_student("Charlie", "Brown", Some("5B"))).unwrap();
        repo.create(new_student("Alice", "Johnson", Some("5A"))).unwrap();
        let mut bob = repo.create(new_student("Bob", "Smith", Some("5A"))).unwrap();
        bob.is_active = false;
        repo.update(&bob).unwrap();

        let all: Vec<String> = repo
            .active_students(None)
            .unwrap()
            .iter()
            .map(|u| u.last_name.clone())
            .collect();
        assert_eq!(all, vec!["Brown", "Johnson"]);

        let five_a = repo.active_students(Some("5A")).unwrap();
        assert_eq!(five_a.len(), 1);
        assert_eq!(repo.class_names().unwrap(), vec!["5A", "5B"]);
    }

    #[test]
    fn update_keeps_username() {
        let (ledger, _dir) = temp_ledger();
        let repo = UserRepository::new(&ledger);
        let mut user = repo.create(new_student("Diana", "Prince", None)).unwrap();
        user.username = "hijack".to_string();
        user.class_name = Some("6A".to_string());
        repo.update(&user).unwrap();

        let stored = repo.require(user.id).unwrap();
        assert_eq!(stored.username, "diana.prince");
        assert_eq!(stored.class_name.as_deref(), Some("6A"));
    }
}
