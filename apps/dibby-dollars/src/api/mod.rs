// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthenticatedUser, Role},
    models::{
        AwardRequest, Behavior, BehaviorBreakdownResponse, BehaviorCount, BehaviorListResponse,
        BehaviorResponse, ClassListResponse, ConfigEntry, ConfigResponse, ConfigUpdateResponse,
        CreateBehaviorRequest, CreateStudentRequest, CreateUserRequest, DepositRequest,
        FocusResponse, InterestSummary, LeaderboardEntry, LeaderboardKind, LeaderboardResponse,
        LedgerEntryResponse, LoginRequest, MessageResponse, OwnBalanceResponse, RaffleDraw,
        RaffleDrawRequest, RaffleDrawResponse, RaffleHistoryResponse, SetFocusRequest,
        StudentListResponse, StudentResponse, SystemStats, SystemStatsResponse, TransactionKind,
        TransactionListResponse, TransactionRecord, TriggerInterestResponse, UpdateConfigRequest,
        UpdateStudentRequest, UserBalanceResponse, UserListResponse, UserProfile, UserResponse,
    },
    state::AppState,
};

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod balance;
pub mod behaviors;
pub mod health;
pub mod raffle;
pub mod students;
pub mod transactions;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Requested page size, defaulted and capped.
pub(crate) fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).min(max)
}

/// Build the HTTP application.
///
/// `allowed_origins` are the browser origins permitted to make credentialed
/// cross-origin requests (the dashboard dev servers).
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route(
            "/students",
            get(students::list_students).post(students::create_student),
        )
        .route("/students/classes", get(students::list_classes))
        .route(
            "/students/{student_id}",
            get(students::get_student).put(students::update_student),
        )
        .route(
            "/transactions",
            get(transactions::list_transactions),
        )
        .route("/transactions/award", post(transactions::award))
        .route("/transactions/deposit", post(transactions::deposit))
        .route("/balance/me", get(balance::my_balance))
        .route("/balance/{user_id}", get(balance::user_balance))
        .route(
            "/behaviors",
            get(behaviors::list_behaviors).post(behaviors::create_behavior),
        )
        .route(
            "/behaviors/my-focus",
            get(behaviors::get_my_focus).put(behaviors::set_my_focus),
        )
        .route("/raffle/draw", post(raffle::draw))
        .route("/raffle/history", get(raffle::history))
        .route("/analytics/leaderboard", get(analytics::leaderboard))
        .route(
            "/analytics/behavior-breakdown",
            get(analytics::behavior_breakdown),
        )
        .route("/analytics/system-stats", get(analytics::system_stats))
        .route(
            "/admin/config",
            get(admin::get_config).put(admin::update_config),
        )
        .route(
            "/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route("/admin/trigger-interest", post(admin::trigger_interest))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id
                    )
                }))
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .layer(cors_layer(allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::logout,
        auth::me,
        students::list_students,
        students::get_student,
        students::create_student,
        students::update_student,
        students::list_classes,
        transactions::award,
        transactions::deposit,
        transactions::list_transactions,
        balance::my_balance,
        balance::user_balance,
        behaviors::list_behaviors,
        behaviors::create_behavior,
        behaviors::get_my_focus,
        behaviors::set_my_focus,
        raffle::draw,
        raffle::history,
        analytics::leaderboard,
        analytics::behavior_breakdown,
        analytics::system_stats,
        admin::get_config,
        admin::update_config,
        admin::list_users,
        admin::create_user,
        admin::trigger_interest,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Role,
            AuthenticatedUser,
            UserProfile,
            LoginRequest,
            UserResponse,
            MessageResponse,
            CreateStudentRequest,
            UpdateStudentRequest,
            StudentListResponse,
            StudentResponse,
            ClassListResponse,
            TransactionKind,
            TransactionRecord,
            AwardRequest,
            DepositRequest,
            LedgerEntryResponse,
            TransactionListResponse,
            OwnBalanceResponse,
            UserBalanceResponse,
            Behavior,
            CreateBehaviorRequest,
            SetFocusRequest,
            BehaviorListResponse,
            BehaviorResponse,
            FocusResponse,
            RaffleDraw,
            RaffleDrawRequest,
            RaffleDrawResponse,
            RaffleHistoryResponse,
            LeaderboardKind,
            LeaderboardEntry,
            LeaderboardResponse,
            BehaviorCount,
            BehaviorBreakdownResponse,
            SystemStats,
            SystemStatsResponse,
            ConfigEntry,
            ConfigResponse,
            UpdateConfigRequest,
            ConfigUpdateResponse,
            CreateUserRequest,
            UserListResponse,
            InterestSummary,
            TriggerInterestResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Login and session management"),
        (name = "Students", description = "Student roster"),
        (name = "Transactions", description = "Awards, deposits and ledger history"),
        (name = "Balance", description = "Balances and interest earned"),
        (name = "Behaviors", description = "Behavior catalog and focus selection"),
        (name = "Raffle", description = "Raffle draws"),
        (name = "Analytics", description = "Leaderboards and statistics"),
        (name = "Admin", description = "Configuration and staff accounts"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
pub(crate) mod test_support {
    //! In-process harness: a router over a throwaway ledger seeded with the
    //! default behavior catalog and configuration.

    use axum::{
        body::{to_bytes, Body},
        http::{header::COOKIE, Method, Request, StatusCode},
        response::Response,
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::{hash_pin, Role};
    use crate::models::TransactionKind;
    use crate::seed::seed_defaults;
    use crate::state::{tests::test_state, AppState};
    use crate::storage::{
        BehaviorRepository, NewTransaction, NewUser, StoredUser, TransactionRepository,
        UserRepository,
    };

    pub(crate) struct TestApp {
        pub state: AppState,
        router: Router,
        _dir: tempfile::TempDir,
    }

    impl TestApp {
        pub fn new() -> Self {
            let (state, dir) = test_state();
            seed_defaults(&state.ledger).unwrap();
            let router = super::router(state.clone(), &["http://localhost:5173".to_string()]);
            Self {
                state,
                router,
                _dir: dir,
            }
        }

        fn create(&self, username: &str, pin_hash: String, role: Role, first: &str, last: &str, class: Option<&str>) -> StoredUser {
            UserRepository::new(&self.state.ledger)
                .create_with_unique_username(NewUser {
                    username: username.to_string(),
                    pin_hash,
                    role,
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    class_name: class.map(str::to_string),
                })
                .unwrap()
        }

        pub fn teacher(&self) -> StoredUser {
            self.create("teacher", String::new(), Role::Teacher, "Demo", "Teacher", None)
        }

        pub fn admin(&self) -> StoredUser {
            self.create("admin", String::new(), Role::Admin, "System", "Administrator", None)
        }

        pub fn student(&self, first: &str, last: &str, class: &str) -> StoredUser {
            let username = format!("{}.{}", first.to_lowercase(), last.to_lowercase());
            self.create(&username, String::new(), Role::Student, first, last, Some(class))
        }

        /// User whose PIN verifies, for login tests.
        pub fn user_with_pin(&self, username: &str, pin: &str, role: Role) -> StoredUser {
            self.create(username, hash_pin(pin).unwrap(), role, "Pat", "Example", None)
        }

        pub fn behavior_id(&self, name: &str) -> u64 {
            BehaviorRepository::new(&self.state.ledger)
                .find_by_name(name)
                .unwrap()
                .unwrap()
                .id
        }

        fn record(&self, user_id: u64, amount: i64, kind: TransactionKind) {
            TransactionRepository::new(&self.state.ledger)
                .record(NewTransaction {
                    user_id,
                    amount,
                    kind,
                    category_id: None,
                    notes: None,
                    created_by_id: None,
                })
                .unwrap();
        }

        pub fn deposit(&self, user_id: u64, amount: i64) {
            self.record(user_id, amount, TransactionKind::Deposit);
        }

        pub fn interest(&self, user_id: u64, amount: i64) {
            self.record(user_id, amount, TransactionKind::Interest);
        }

        pub fn token_for(&self, user: &StoredUser) -> String {
            self.state.sessions.issue(user.id, user.role).unwrap()
        }

        pub async fn request(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> Response {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(COOKIE, format!("dibby_session={token}"));
            }
            let request = match body {
                Some(json) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.router.clone().oneshot(request).await.unwrap()
        }

        /// Send a request and decode the JSON body (`Null` when not JSON).
        pub async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let response = self.request(method, uri, token, body).await;
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::TestApp;
    use axum::http::{header, Method, StatusCode};

    #[test]
    fn limits_are_capped() {
        assert_eq!(super::clamp_limit(None, 50, 200), 50);
        assert_eq!(super::clamp_limit(Some(10), 50, 200), 10);
        assert_eq!(super::clamp_limit(Some(999), 50, 200), 200);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let app = TestApp::new();
        let response = app.request(Method::GET, "/health/live", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = TestApp::new();
        let (status, body) = app.call(Method::GET, "/api-doc/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/transactions/award"].is_object());
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_with_credentials() {
        let app = TestApp::new();
        let request = axum::http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/auth/me")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = tower::ServiceExt::oneshot(
            super::router(app.state.clone(), &["http://localhost:5173".to_string()]),
            request,
        )
        .await
        .unwrap();
        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }
}
