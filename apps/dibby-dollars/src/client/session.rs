// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client session: the logged-in principal plus transient UI state.
//!
//! The principal survives restarts through a JSON file that is loaded once
//! on start and rewritten on every change. Loading and error flags are never
//! persisted. The authenticated flag is always derived from the principal,
//! including when a persisted file disagrees.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{auth::Role, models::UserProfile};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk shape. `is_authenticated` is written for readers of the file but
/// ignored on load.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    #[serde(default)]
    user: Option<UserProfile>,
    #[serde(default)]
    is_authenticated: bool,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    principal: Option<UserProfile>,
    loading: bool,
    error: Option<String>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Session that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Restore the session persisted at `path`. A missing file yields an
    /// empty session; later changes are saved to the same path.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let persisted = match File::open(&path) {
            Ok(file) => serde_json::from_reader::<_, PersistedSession>(BufReader::new(file))?,
            Err(e) if e.kind() == ErrorKind::NotFound => PersistedSession::default(),
            Err(e) => return Err(e.into()),
        };

        if persisted.is_authenticated != persisted.user.is_some() {
            tracing::debug!(path = %path.display(), "Persisted session flag disagrees with principal");
        }

        Ok(Self {
            principal: persisted.user,
            loading: false,
            error: None,
            path: Some(path),
        })
    }

    pub fn principal(&self) -> Option<&UserProfile> {
        self.principal.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.principal.as_ref().map(|p| p.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace the principal and clear any error.
    pub fn set_principal(&mut self, principal: Option<UserProfile>) -> Result<(), SessionError> {
        self.principal = principal;
        self.error = None;
        self.save()
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Set or clear the error. Setting an error also ends loading.
    pub fn set_error(&mut self, error: Option<String>) {
        if error.is_some() {
            self.loading = false;
        }
        self.error = error;
    }

    /// Forget the principal locally. Server-side logout is the caller's job.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.principal = None;
        self.error = None;
        self.save()
    }

    fn save(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_atomic(
            path,
            &PersistedSession {
                user: self.principal.clone(),
                is_authenticated: self.principal.is_some(),
            },
        )
    }
}

fn write_atomic(path: &Path, value: &PersistedSession) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn principal(id: u64, role: Role) -> UserProfile {
        UserProfile {
            id,
            username: format!("user{id}"),
            role,
            first_name: "Pat".to_string(),
            last_name: "Example".to_string(),
            full_name: "Pat Example".to_string(),
            class_name: None,
            is_active: true,
            created_at: None,
            balance: None,
        }
    }

    pub(crate) fn session_as(role: Role) -> SessionStore {
        let mut session = SessionStore::in_memory();
        session.set_principal(Some(principal(1, role))).unwrap();
        session
    }

    #[test]
    fn authenticated_tracks_principal() {
        let mut session = SessionStore::in_memory();
        assert!(!session.is_authenticated());

        session.set_error(Some("boom".to_string()));
        session.set_principal(Some(principal(1, Role::Teacher))).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.error(), None);
        assert_eq!(session.role(), Some(Role::Teacher));

        session.set_principal(None).unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn error_clears_loading() {
        let mut session = SessionStore::in_memory();
        session.set_loading(true);
        session.set_error(None);
        assert!(session.is_loading());
        session.set_error(Some("Invalid credentials".to_string()));
        assert!(!session.is_loading());
        assert_eq!(session.error(), Some("Invalid credentials"));
    }

    #[test]
    fn logout_clears_principal_and_error() {
        let mut session = session_as(Role::Student);
        session.set_error(Some("stale".to_string()));
        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(session.principal().is_none());
        assert_eq!(session.error(), None);
    }

    #[test]
    fn principal_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut session = SessionStore::load(&path).unwrap();
        assert!(!session.is_authenticated());
        session.set_loading(true);
        session.set_principal(Some(principal(4, Role::Admin))).unwrap();

        let restored = SessionStore::load(&path).unwrap();
        assert!(restored.is_authenticated());
        assert_eq!(restored.principal().unwrap().id, 4);
        assert!(!restored.is_loading());

        let mut restored = restored;
        restored.logout().unwrap();
        assert!(!SessionStore::load(&path).unwrap().is_authenticated());
    }

    #[test]
    fn flag_is_rederived_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        fs::write(&path, r#"{"user": null, "isAuthenticated": true}"#).unwrap();
        assert!(!SessionStore::load(&path).unwrap().is_authenticated());

        let user = serde_json::to_value(principal(2, Role::Student)).unwrap();
        let body = serde_json::json!({"user": user, "isAuthenticated": false});
        fs::write(&path, body.to_string()).unwrap();
        assert!(SessionStore::load(&path).unwrap().is_authenticated());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(SessionStore::load(&path), Err(SessionError::Json(_))));
    }
}
