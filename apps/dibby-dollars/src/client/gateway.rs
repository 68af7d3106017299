// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP facade over the `/api` surface.
//!
//! One method per server operation, grouped by resource. Every call is
//! normalized the same way:
//!
//! - transport failure or non-2xx status: [`ClientError`], carrying the
//!   server's `error` string when the body has one
//! - 2xx with `"success": false`: [`ApiOutcome::Rejected`]
//! - 2xx with `"success": true`: [`ApiOutcome::Accepted`] with the decoded body
//!
//! The session cookie set by login is kept in the client's cookie store and
//! sent on every later request. There is no retry, caching or batching.

use std::{path::PathBuf, time::Duration};

use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    config::{
        API_URL_ENV, DEFAULT_API_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_SESSION_FILE,
        HTTP_TIMEOUT_ENV, SESSION_FILE_ENV,
    },
    models::{
        AwardRequest, BehaviorBreakdownResponse, BehaviorListResponse, BehaviorResponse,
        ClassListResponse, ConfigResponse, ConfigUpdateResponse, CreateBehaviorRequest,
        CreateStudentRequest, CreateUserRequest, DepositRequest, FocusResponse, LeaderboardKind,
        LeaderboardResponse, LedgerEntryResponse, LoginRequest, MessageResponse,
        OwnBalanceResponse, RaffleDrawRequest, RaffleDrawResponse, RaffleHistoryResponse,
        SetFocusRequest, StudentListResponse, StudentResponse, SystemStatsResponse,
        TransactionKind, TransactionListResponse, TriggerInterestResponse, UpdateConfigRequest,
        UpdateStudentRequest, UserBalanceResponse, UserListResponse, UserResponse,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned HTTP {status}")]
    Status { status: u16, message: Option<String> },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// The server's `error` string, when the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Status {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }
}

/// Result of a call that reached the server and got a 2xx answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Accepted(T),
    /// Business rejection, with the server's message when present.
    Rejected(Option<String>),
}

impl<T> ApiOutcome<T> {
    pub fn accepted(self) -> Option<T> {
        match self {
            ApiOutcome::Accepted(value) => Some(value),
            ApiOutcome::Rejected(_) => None,
        }
    }
}

pub type ApiResult<T> = Result<ApiOutcome<T>, ClientError>;

/// Dashboard client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root including the `/api` prefix.
    pub base_url: String,
    /// Overall per-request timeout.
    pub timeout: Duration,
    /// Where the session is persisted between runs.
    pub session_path: PathBuf,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            session_path: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config =
            Self::new(lookup(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string()));
        if let Some(secs) = lookup(HTTP_TIMEOUT_ENV).and_then(|v| v.trim().parse().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(path) = lookup(SESSION_FILE_ENV) {
            config.session_path = PathBuf::from(path);
        }
        config
    }
}

/// Roster query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StudentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_balance: bool,
}

/// Ledger history query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LeaderboardQuery {
    #[serde(rename = "type")]
    pub kind: LeaderboardKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            base_url: config.base_url.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let request = builder.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self.http.execute(request).await.map_err(|e| {
            tracing::debug!(%method, %path, error = %e, "API request failed");
            ClientError::Transport(e)
        })?;
        let status = response.status();
        let body = response.bytes().await?;
        let json: Option<Value> = serde_json::from_slice(&body).ok();
        tracing::debug!(%method, %path, status = status.as_u16(), "API response");

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: json.as_ref().and_then(error_message),
            });
        }

        let value = match json {
            Some(value) => value,
            None => serde_json::from_slice(&body)?,
        };
        if value.get("success") == Some(&Value::Bool(false)) {
            return Ok(ApiOutcome::Rejected(error_message(&value)));
        }
        Ok(ApiOutcome::Accepted(serde_json::from_value(value)?))
    }

    // =========================================================================
    // Auth
    // =========================================================================

    pub async fn login(&self, username: &str, pin: &str) -> ApiResult<UserResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            pin: pin.to_string(),
        };
        self.send(self.request(Method::POST, "/auth/login").json(&body))
            .await
    }

    pub async fn logout(&self) -> ApiResult<MessageResponse> {
        self.send(self.request(Method::POST, "/auth/logout")).await
    }

    pub async fn me(&self) -> ApiResult<UserResponse> {
        self.send(self.request(Method::GET, "/auth/me")).await
    }

    // =========================================================================
    // Students
    // =========================================================================

    pub async fn list_students(&self, filter: &StudentFilter) -> ApiResult<StudentListResponse> {
        self.send(self.request(Method::GET, "/students").query(filter))
            .await
    }

    pub async fn get_student(&self, student_id: u64) -> ApiResult<StudentResponse> {
        self.send(self.request(Method::GET, &format!("/students/{student_id}")))
            .await
    }

    pub async fn create_student(&self, body: &CreateStudentRequest) -> ApiResult<StudentResponse> {
        self.send(self.request(Method::POST, "/students").json(body))
            .await
    }

    pub async fn update_student(
        &self,
        student_id: u64,
        body: &UpdateStudentRequest,
    ) -> ApiResult<StudentResponse> {
        self.send(
            self.request(Method::PUT, &format!("/students/{student_id}"))
                .json(body),
        )
        .await
    }

    pub async fn list_classes(&self) -> ApiResult<ClassListResponse> {
        self.send(self.request(Method::GET, "/students/classes"))
            .await
    }

    // =========================================================================
    // Transactions and balance
    // =========================================================================

    pub async fn award(&self, body: &AwardRequest) -> ApiResult<LedgerEntryResponse> {
        self.send(self.request(Method::POST, "/transactions/award").json(body))
            .await
    }

    pub async fn deposit(&self, body: &DepositRequest) -> ApiResult<LedgerEntryResponse> {
        self.send(self.request(Method::POST, "/transactions/deposit").json(body))
            .await
    }

    pub async fn list_transactions(
        &self,
        query: &HistoryQuery,
    ) -> ApiResult<TransactionListResponse> {
        self.send(self.request(Method::GET, "/transactions").query(query))
            .await
    }

    pub async fn my_balance(&self) -> ApiResult<OwnBalanceResponse> {
        self.send(self.request(Method::GET, "/balance/me")).await
    }

    pub async fn user_balance(&self, user_id: u64) -> ApiResult<UserBalanceResponse> {
        self.send(self.request(Method::GET, &format!("/balance/{user_id}")))
            .await
    }

    // =========================================================================
    // Behaviors
    // =========================================================================

    pub async fn list_behaviors(&self) -> ApiResult<BehaviorListResponse> {
        self.send(self.request(Method::GET, "/behaviors")).await
    }

    pub async fn create_behavior(
        &self,
        body: &CreateBehaviorRequest,
    ) -> ApiResult<BehaviorResponse> {
        self.send(self.request(Method::POST, "/behaviors").json(body))
            .await
    }

    pub async fn my_focus(&self) -> ApiResult<FocusResponse> {
        self.send(self.request(Method::GET, "/behaviors/my-focus"))
            .await
    }

    pub async fn set_my_focus(&self, behavior_ids: &[u64]) -> ApiResult<MessageResponse> {
        let body = SetFocusRequest {
            behavior_ids: Some(behavior_ids.to_vec()),
        };
        self.send(self.request(Method::PUT, "/behaviors/my-focus").json(&body))
            .await
    }

    // =========================================================================
    // Raffle
    // =========================================================================

    pub async fn raffle_draw(&self, body: &RaffleDrawRequest) -> ApiResult<RaffleDrawResponse> {
        self.send(self.request(Method::POST, "/raffle/draw").json(body))
            .await
    }

    pub async fn raffle_history(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> ApiResult<RaffleHistoryResponse> {
        let query = HistoryQuery {
            limit,
            offset,
            ..Default::default()
        };
        self.send(self.request(Method::GET, "/raffle/history").query(&query))
            .await
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    pub async fn leaderboard(&self, query: &LeaderboardQuery) -> ApiResult<LeaderboardResponse> {
        self.send(
            self.request(Method::GET, "/analytics/leaderboard")
                .query(query),
        )
        .await
    }

    pub async fn behavior_breakdown(
        &self,
        days: Option<i64>,
    ) -> ApiResult<BehaviorBreakdownResponse> {
        let mut builder = self.request(Method::GET, "/analytics/behavior-breakdown");
        if let Some(days) = days {
            builder = builder.query(&[("days", days)]);
        }
        self.send(builder).await
    }

    pub async fn system_stats(&self) -> ApiResult<SystemStatsResponse> {
        self.send(self.request(Method::GET, "/analytics/system-stats"))
            .await
    }

    // =========================================================================
    // Admin
    // =========================================================================

    pub async fn get_config(&self) -> ApiResult<ConfigResponse> {
        self.send(self.request(Method::GET, "/admin/config")).await
    }

    pub async fn update_config(
        &self,
        body: &UpdateConfigRequest,
    ) -> ApiResult<ConfigUpdateResponse> {
        self.send(self.request(Method::PUT, "/admin/config").json(body))
            .await
    }

    pub async fn list_users(&self) -> ApiResult<UserListResponse> {
        self.send(self.request(Method::GET, "/admin/users")).await
    }

    pub async fn create_user(&self, body: &CreateUserRequest) -> ApiResult<UserResponse> {
        self.send(self.request(Method::POST, "/admin/users").json(body))
            .await
    }

    pub async fn trigger_interest(&self) -> ApiResult<TriggerInterestResponse> {
        self.send(self.request(Method::POST, "/admin/trigger-interest"))
            .await
    }
}

fn error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(&ClientConfig::new(base_url)).unwrap()
    }

    #[test]
    fn config_from_lookup() {
        let config = ClientConfig::from_lookup(|key| match key {
            "DIBBY_API_URL" => Some("https://school.example/api/".to_string()),
            "DIBBY_HTTP_TIMEOUT_SECS" => Some("3".to_string()),
            "DIBBY_SESSION_FILE" => Some("/tmp/s.json".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "https://school.example/api");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.session_path, PathBuf::from("/tmp/s.json"));

        let defaults = ClientConfig::from_lookup(|_| None);
        assert_eq!(defaults.base_url, "http://localhost:5000/api");
        assert_eq!(defaults.timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn outcomes_are_normalized() {
        let router = Router::new()
            .route(
                "/api/balance/me",
                get(|| async {
                    Json(json!({"success": true, "balance": 7, "interestEarned": 1}))
                }),
            )
            .route(
                "/api/behaviors",
                get(|| async { Json(json!({"success": false, "error": "Catalog locked"})) }),
            )
            .route(
                "/api/auth/me",
                get(|| async {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"success": false, "error": "Not authenticated"})),
                    )
                }),
            )
            .route(
                "/api/analytics/system-stats",
                get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
            );
        let api = client(&serve(router).await);

        let balance = api.my_balance().await.unwrap().accepted().unwrap();
        assert_eq!(balance.balance, 7);
        assert_eq!(balance.rank, None);

        assert_eq!(
            api.list_behaviors().await.unwrap(),
            ApiOutcome::Rejected(Some("Catalog locked".to_string()))
        );

        let err = api.me().await.unwrap_err();
        assert_eq!(err.server_message(), Some("Not authenticated"));
        assert!(matches!(err, ClientError::Status { status: 401, .. }));

        let err = api.system_stats().await.unwrap_err();
        assert_eq!(err.server_message(), None);
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}/api"))
            .list_classes()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn queries_skip_absent_fields() {
        let query = HistoryQuery {
            kind: Some(TransactionKind::Award),
            limit: Some(10),
            ..Default::default()
        };
        let encoded = serde_json::to_value(&query).unwrap();
        assert_eq!(encoded, json!({"type": "award", "limit": 10}));

        let filter = StudentFilter {
            class_name: None,
            include_balance: true,
        };
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"include_balance": true})
        );
    }
}
