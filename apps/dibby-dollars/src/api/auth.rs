// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, logout and current-user endpoints.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};

use crate::{
    auth::{authenticate, verify_pin},
    error::{ApiError, ApiJson},
    models::{LoginRequest, MessageResponse, UserResponse},
    state::AppState,
    storage::{StoredUser, TransactionRepository, UserRepository},
};

/// Profile with balance, as returned by login and `/auth/me`.
pub(crate) fn profile_with_balance(
    state: &AppState,
    user: &StoredUser,
) -> Result<crate::models::UserProfile, ApiError> {
    let balance = TransactionRepository::new(&state.ledger).balance(user.id)?;
    Ok(user.to_profile(Some(balance)))
}

/// Log in with username and PIN (students) or password (staff).
///
/// On success the session cookie is set on the response.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = UserResponse),
        (status = 400, description = "Username and PIN required"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = request.username.trim().to_lowercase();
    if username.is_empty() || request.pin.is_empty() {
        return Err(ApiError::bad_request("Username and PIN required"));
    }

    let user = UserRepository::new(&state.ledger)
        .find_by_username(&username)?
        .filter(|u| u.is_active);
    let Some(user) = user.filter(|u| verify_pin(&request.pin, &u.pin_hash)) else {
        tracing::info!(username = %username, "Login rejected");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let token = state
        .sessions
        .issue(user.id, user.role)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let cookie = state.sessions.session_cookie(token);
    let profile = profile_with_balance(&state, &user)?;

    tracing::info!(user_id = user.id, role = %user.role, "User logged in");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(UserResponse {
            success: true,
            user: profile,
        }),
    ))
}

/// Log out. Always succeeds and expires the session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    )
)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, state.sessions.clear_cookie())]),
        Json(MessageResponse {
            success: true,
            message: "Logged out".to_string(),
        }),
    )
}

/// Current user with balance.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let user = authenticate(&headers, &state).map_err(|e| {
        if e.is_unauthenticated() {
            ApiError::unauthorized("Not authenticated")
        } else {
            ApiError::internal(e.to_string())
        }
    })?;
    Ok(Json(UserResponse {
        success: true,
        user: profile_with_balance(&state, &user)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use crate::auth::Role;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let app = TestApp::new();
        let teacher = app.user_with_pin("teacher", "teacher123", Role::Teacher);

        let response = app
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"username": "  Teacher ", "pin": "teacher123"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("dibby_session="));
        assert!(cookie.contains("HttpOnly"));

        let token = cookie
            .trim_start_matches("dibby_session=")
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let (status, body) = app.call(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], teacher.id);
        assert_eq!(body["user"]["role"], "teacher");
        assert_eq!(body["user"]["balance"], 0);
    }

    #[tokio::test]
    async fn login_failures() {
        let app = TestApp::new();
        app.user_with_pin("alice.johnson", "1111", Role::Student);

        let (status, body) = app
            .call(Method::POST, "/api/auth/login", None, Some(json!({"username": "alice.johnson"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Username and PIN required");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"username": "alice.johnson", "pin": "9999"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"username": "nobody", "pin": "1111"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn me_without_session_is_401() {
        let app = TestApp::new();
        let (status, body) = app.call(Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Not authenticated");
    }

    #[tokio::test]
    async fn logout_expires_cookie() {
        let app = TestApp::new();
        let response = app.request(Method::POST, "/api/auth/logout", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }
}
