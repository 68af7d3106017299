// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! ```rust,ignore
//! async fn award(TeacherOnly(user): TeacherOnly, State(state): State<AppState>) { .. }
//! ```
//!
//! The session token only identifies the user. The user is reloaded from the
//! ledger on every request, so deactivating an account or changing its role
//! takes effect immediately.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use super::{session::token_from_headers, AuthError, AuthenticatedUser, Role};
use crate::state::AppState;
use crate::storage::{StoredUser, UserRepository};

/// Resolve the session on a request to an active stored user.
pub fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<StoredUser, AuthError> {
    let token = token_from_headers(headers).ok_or(AuthError::MissingSession)?;
    let claims = state.sessions.verify(&token)?;
    let user_id = claims.user_id().ok_or(AuthError::MalformedToken)?;

    let user = UserRepository::new(&state.ledger)
        .get(user_id)
        .map_err(|e| AuthError::InternalError(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    if !user.is_active {
        tracing::debug!(user_id, "Session rejected for inactive user");
        return Err(AuthError::UnknownUser);
    }
    Ok(user)
}

/// Extractor for any authenticated user.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }
        let stored = authenticate(&parts.headers, state)?;
        let user = AuthenticatedUser::from_stored(&stored);
        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Extractor that requires teacher capability (teacher or admin).
pub struct TeacherOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for TeacherOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        if !user.has_role(Role::Teacher) {
            return Err(AuthError::TeacherRequired);
        }
        Ok(TeacherOnly(user))
    }
}

/// Extractor that requires the admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        if !user.has_role(Role::Admin) {
            return Err(AuthError::AdminRequired);
        }
        Ok(AdminOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue, Request};

    use crate::state::tests::test_state;
    use crate::storage::NewUser;

    fn create_user(state: &AppState, username: &str, role: Role) -> StoredUser {
        UserRepository::new(&state.ledger)
            .create(NewUser {
                username: username.to_string(),
                pin_hash: String::new(),
                role,
                first_name: "First".to_string(),
                last_name: "Last".to_string(),
                class_name: None,
            })
            .unwrap()
    }

    fn parts_with_token(token: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(COOKIE, HeaderValue::from_str(&format!("dibby_session={token}")).unwrap())
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn missing_session_is_rejected() {
        let (state, _dir) = test_state();
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingSession)));
    }

    #[tokio::test]
    async fn valid_session_resolves_user() {
        let (state, _dir) = test_state();
        let user = create_user(&state, "teacher", Role::Teacher);
        let token = state.sessions.issue(user.id, user.role).unwrap();

        let mut parts = parts_with_token(&token);
        let TeacherOnly(auth) = TeacherOnly::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(auth.user_id, user.id);

        let mut parts = parts_with_token(&token);
        let admin = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(admin, Err(AuthError::AdminRequired)));
    }

    #[tokio::test]
    async fn admin_passes_teacher_gate() {
        let (state, _dir) = test_state();
        let user = create_user(&state, "admin", Role::Admin);
        let token = state.sessions.issue(user.id, user.role).unwrap();
        let mut parts = parts_with_token(&token);
        assert!(TeacherOnly::from_request_parts(&mut parts, &state).await.is_ok());
    }

    #[tokio::test]
    async fn student_fails_teacher_gate() {
        let (state, _dir) = test_state();
        let user = create_user(&state, "kid", Role::Student);
        let token = state.sessions.issue(user.id, user.role).unwrap();
        let mut parts = parts_with_token(&token);
        let result = TeacherOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::TeacherRequired)));
    }

    #[tokio::test]
    async fn stored_role_wins_over_token_role() {
        let (state, _dir) = test_state();
        let user = create_user(&state, "kid", Role::Student);
        // Token claims admin, but the stored user is a student.
        let token = state.sessions.issue(user.id, Role::Admin).unwrap();
        let mut parts = parts_with_token(&token);
        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::AdminRequired)));
    }

    #[tokio::test]
    async fn deactivated_user_is_rejected() {
        let (state, _dir) = test_state();
        let mut user = create_user(&state, "gone", Role::Teacher);
        let token = state.sessions.issue(user.id, user.role).unwrap();
        user.is_active = false;
        UserRepository::new(&state.ledger).update(&user).unwrap();

        let mut parts = parts_with_token(&token);
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }
}
