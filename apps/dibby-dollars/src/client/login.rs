// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login and logout against the session store.

use std::future::Future;

use crate::models::{MessageResponse, UserResponse};

use super::{
    gateway::{ApiClient, ApiOutcome, ApiResult},
    guard::{home_for, Route},
    session::SessionStore,
};

pub const MISSING_CREDENTIALS: &str = "Please enter username and PIN";
const LOGIN_REJECTED: &str = "Login failed";
const LOGIN_UNREACHABLE: &str = "Login failed. Please try again.";

pub trait AuthBackend {
    fn sign_in(
        &self,
        username: String,
        pin: String,
    ) -> impl Future<Output = ApiResult<UserResponse>> + Send;
    fn sign_out(&self) -> impl Future<Output = ApiResult<MessageResponse>> + Send;
}

impl AuthBackend for ApiClient {
    async fn sign_in(&self, username: String, pin: String) -> ApiResult<UserResponse> {
        self.login(&username, &pin).await
    }

    async fn sign_out(&self) -> ApiResult<MessageResponse> {
        self.logout().await
    }
}

/// Authenticate and record the principal. Returns the role's home route;
/// on failure the message is also left on the session.
pub async fn login<B: AuthBackend>(
    session: &mut SessionStore,
    backend: &B,
    username: &str,
    pin: &str,
) -> Result<Route, String> {
    let username = username.trim().to_lowercase();
    if username.is_empty() || pin.trim().is_empty() {
        session.set_error(Some(MISSING_CREDENTIALS.to_string()));
        return Err(MISSING_CREDENTIALS.to_string());
    }

    session.set_loading(true);
    session.set_error(None);

    let message = match backend.sign_in(username, pin.to_string()).await {
        Ok(ApiOutcome::Accepted(response)) => {
            let home = home_for(response.user.role);
            if let Err(e) = session.set_principal(Some(response.user)) {
                tracing::warn!(error = %e, "Failed to persist session");
            }
            session.set_loading(false);
            return Ok(home);
        }
        Ok(ApiOutcome::Rejected(message)) => message.unwrap_or_else(|| LOGIN_REJECTED.to_string()),
        Err(e) => e
            .server_message()
            .unwrap_or(LOGIN_UNREACHABLE)
            .to_string(),
    };

    session.set_error(Some(message.clone()));
    Err(message)
}

/// End the session. The server call is best effort; the local session is
/// always cleared.
pub async fn logout<B: AuthBackend>(session: &mut SessionStore, backend: &B) -> Route {
    if let Err(e) = backend.sign_out().await {
        tracing::debug!(error = %e, "Server logout failed");
    }
    if let Err(e) = session.logout() {
        tracing::warn!(error = %e, "Failed to persist session");
    }
    Route::Login
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::client::gateway::ClientError;
    use crate::client::session::tests::principal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Accept(Role),
        Reject(Option<String>),
        Fail(Option<String>),
    }

    struct FakeAuth {
        script: Script,
        calls: AtomicUsize,
    }

    impl FakeAuth {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl AuthBackend for FakeAuth {
        async fn sign_in(&self, username: String, _pin: String) -> ApiResult<UserResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(username, username.trim().to_lowercase());
            match &self.script {
                Script::Accept(role) => Ok(ApiOutcome::Accepted(UserResponse {
                    success: true,
                    user: principal(9, *role),
                })),
                Script::Reject(message) => Ok(ApiOutcome::Rejected(message.clone())),
                Script::Fail(message) => Err(ClientError::Status {
                    status: 401,
                    message: message.clone(),
                }),
            }
        }

        async fn sign_out(&self) -> ApiResult<MessageResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::Status {
                status: 500,
                message: None,
            })
        }
    }

    #[tokio::test]
    async fn empty_fields_make_no_call() {
        let backend = FakeAuth::new(Script::Accept(Role::Teacher));
        let mut session = SessionStore::in_memory();
        for (user, pin) in [("", "1234"), ("  ", "1234"), ("teacher", " ")] {
            let err = login(&mut session, &backend, user, pin).await.unwrap_err();
            assert_eq!(err, MISSING_CREDENTIALS);
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.error(), Some(MISSING_CREDENTIALS));
    }

    #[tokio::test]
    async fn success_routes_by_role() {
        for (role, home) in [
            (Role::Student, Route::Student),
            (Role::Teacher, Route::Teacher),
            (Role::Admin, Route::Admin),
        ] {
            let backend = FakeAuth::new(Script::Accept(role));
            let mut session = SessionStore::in_memory();
            let route = login(&mut session, &backend, " Teacher ", "teacher123").await;
            assert_eq!(route, Ok(home));
            assert!(session.is_authenticated());
            assert!(!session.is_loading());
            assert_eq!(session.error(), None);
        }
    }

    #[tokio::test]
    async fn failures_use_server_text_or_fallback() {
        let cases = [
            (Script::Reject(Some("Account locked".into())), "Account locked"),
            (Script::Reject(None), "Login failed"),
            (Script::Fail(Some("Invalid credentials".into())), "Invalid credentials"),
            (Script::Fail(None), "Login failed. Please try again."),
        ];
        for (script, expected) in cases {
            let backend = FakeAuth::new(script);
            let mut session = SessionStore::in_memory();
            let err = login(&mut session, &backend, "alice", "1111").await.unwrap_err();
            assert_eq!(err, expected);
            assert_eq!(session.error(), Some(expected));
            assert!(!session.is_loading());
            assert!(!session.is_authenticated());
        }
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
        let backend = FakeAuth::new(Script::Accept(Role::Teacher));
        let mut session = SessionStore::in_memory();
        login(&mut session, &backend, "teacher", "teacher123").await.unwrap();

        assert_eq!(logout(&mut session, &backend).await, Route::Login);
        assert!(!session.is_authenticated());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }
}
