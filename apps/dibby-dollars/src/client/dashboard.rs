// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Student and admin dashboard view models.
//!
//! The teacher dashboard is [`super::workflow::TeacherDesk`] plus
//! [`super::focus::FocusEditor`].

use std::future::Future;

use crate::{
    auth::Role,
    models::{
        ConfigResponse, ConfigUpdateResponse, CreateUserRequest, OwnBalanceResponse, SystemStats,
        SystemStatsResponse, TransactionListResponse, TransactionRecord, TriggerInterestResponse,
        UpdateConfigRequest, UserListResponse, UserProfile, UserResponse,
    },
    storage::repository::settings::{INTEREST_RATE, RAFFLE_PRIZE_DEFAULT},
};

use super::{
    gateway::{ApiClient, ApiResult, HistoryQuery},
    notice::{settle, Notice},
    workflow::Submission,
};

/// Entries shown in the student's recent activity list.
pub const RECENT_TRANSACTIONS: usize = 10;
/// Shown when the server has no stored value.
const FALLBACK_INTEREST_RATE: &str = "2";
const FALLBACK_RAFFLE_PRIZE: &str = "50";

// =============================================================================
// Student
// =============================================================================

pub trait StudentBackend {
    fn balance_summary(&self) -> impl Future<Output = ApiResult<OwnBalanceResponse>> + Send;
    fn recent_transactions(
        &self,
        limit: usize,
    ) -> impl Future<Output = ApiResult<TransactionListResponse>> + Send;
}

impl StudentBackend for ApiClient {
    async fn balance_summary(&self) -> ApiResult<OwnBalanceResponse> {
        self.my_balance().await
    }

    async fn recent_transactions(&self, limit: usize) -> ApiResult<TransactionListResponse> {
        let query = HistoryQuery {
            limit: Some(limit),
            ..Default::default()
        };
        self.list_transactions(&query).await
    }
}

#[derive(Debug, Default)]
pub struct StudentDashboard {
    pub summary: Option<OwnBalanceResponse>,
    pub recent: Vec<TransactionRecord>,
    notices: Vec<Notice>,
}

impl StudentDashboard {
    /// Balance, interest, rank and the latest entries. Each part loads
    /// independently; a failed part stays empty.
    pub async fn load<B: StudentBackend>(backend: &B) -> Self {
        let mut dashboard = Self::default();
        match settle(backend.balance_summary().await, "Failed to load balance") {
            Ok(summary) => dashboard.summary = Some(summary),
            Err(message) => dashboard.notices.push(Notice::error(message)),
        }
        match settle(
            backend.recent_transactions(RECENT_TRANSACTIONS).await,
            "Failed to load transactions",
        ) {
            Ok(list) => dashboard.recent = list.transactions,
            Err(message) => dashboard.notices.push(Notice::error(message)),
        }
        dashboard
    }

    pub fn balance(&self) -> i64 {
        self.summary.as_ref().map_or(0, |s| s.balance)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

// =============================================================================
// Admin
// =============================================================================

pub trait AdminBackend {
    fn fetch_config(&self) -> impl Future<Output = ApiResult<ConfigResponse>> + Send;
    fn fetch_users(&self) -> impl Future<Output = ApiResult<UserListResponse>> + Send;
    fn fetch_stats(&self) -> impl Future<Output = ApiResult<SystemStatsResponse>> + Send;
    fn save_config(
        &self,
        request: UpdateConfigRequest,
    ) -> impl Future<Output = ApiResult<ConfigUpdateResponse>> + Send;
    fn run_interest(&self) -> impl Future<Output = ApiResult<TriggerInterestResponse>> + Send;
    fn submit_user(
        &self,
        request: CreateUserRequest,
    ) -> impl Future<Output = ApiResult<UserResponse>> + Send;
}

impl AdminBackend for ApiClient {
    async fn fetch_config(&self) -> ApiResult<ConfigResponse> {
        self.get_config().await
    }

    async fn fetch_users(&self) -> ApiResult<UserListResponse> {
        self.list_users().await
    }

    async fn fetch_stats(&self) -> ApiResult<SystemStatsResponse> {
        self.system_stats().await
    }

    async fn save_config(&self, request: UpdateConfigRequest) -> ApiResult<ConfigUpdateResponse> {
        self.update_config(&request).await
    }

    async fn run_interest(&self) -> ApiResult<TriggerInterestResponse> {
        self.trigger_interest().await
    }

    async fn submit_user(&self, request: CreateUserRequest) -> ApiResult<UserResponse> {
        self.create_user(&request).await
    }
}

/// Editable configuration values, as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigForm {
    pub interest_rate: String,
    pub raffle_prize_default: String,
}

impl Default for ConfigForm {
    fn default() -> Self {
        Self {
            interest_rate: FALLBACK_INTEREST_RATE.to_string(),
            raffle_prize_default: FALLBACK_RAFFLE_PRIZE.to_string(),
        }
    }
}

/// New staff account.
#[derive(Debug, Clone)]
pub struct StaffForm {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl Default for StaffForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Teacher,
        }
    }
}

#[derive(Debug, Default)]
pub struct AdminDashboard {
    pub config: ConfigForm,
    pub users: Vec<UserProfile>,
    pub stats: Option<SystemStats>,
    saving: bool,
    triggering: bool,
    creating: bool,
    notices: Vec<Notice>,
}

impl AdminDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Reload configuration, staff and statistics.
    pub async fn refresh<B: AdminBackend>(&mut self, backend: &B) -> Submission {
        let config = settle(backend.fetch_config().await, "");
        let users = settle(backend.fetch_users().await, "");
        let stats = settle(backend.fetch_stats().await, "");

        match (config, users, stats) {
            (Ok(config), Ok(users), Ok(stats)) => {
                let value = |key: &str, fallback: &str| {
                    config
                        .config
                        .get(key)
                        .map(|entry| entry.value.clone())
                        .unwrap_or_else(|| fallback.to_string())
                };
                self.config = ConfigForm {
                    interest_rate: value(INTEREST_RATE, FALLBACK_INTEREST_RATE),
                    raffle_prize_default: value(RAFFLE_PRIZE_DEFAULT, FALLBACK_RAFFLE_PRIZE),
                };
                self.users = users.users;
                self.stats = Some(stats.stats);
                Submission::Completed
            }
            _ => {
                self.notices.push(Notice::error("Failed to load data"));
                Submission::Failed
            }
        }
    }

    pub async fn save_config<B: AdminBackend>(&mut self, backend: &B) -> Submission {
        if self.saving {
            return Submission::Busy;
        }
        let request = UpdateConfigRequest {
            interest_rate: Some(self.config.interest_rate.trim().into()),
            raffle_prize_default: Some(self.config.raffle_prize_default.trim().into()),
            interest_day: None,
        };

        self.saving = true;
        let result = settle(backend.save_config(request).await, "Failed to save");
        self.saving = false;

        match result {
            Ok(_) => {
                self.notices.push(Notice::success("Configuration saved"));
                self.refresh(backend).await;
                Submission::Completed
            }
            Err(message) => {
                self.notices.push(Notice::error(message));
                Submission::Failed
            }
        }
    }

    pub async fn trigger_interest<B: AdminBackend>(&mut self, backend: &B) -> Submission {
        if self.triggering {
            return Submission::Busy;
        }
        self.triggering = true;
        let result = settle(
            backend.run_interest().await,
            "Failed to trigger interest calculation",
        );
        self.triggering = false;

        match result {
            Ok(_) => {
                self.notices
                    .push(Notice::success("Interest calculation completed"));
                self.refresh(backend).await;
                Submission::Completed
            }
            Err(message) => {
                self.notices.push(Notice::error(message));
                Submission::Failed
            }
        }
    }

    pub async fn create_user<B: AdminBackend>(
        &mut self,
        backend: &B,
        form: StaffForm,
    ) -> Submission {
        if self.creating {
            return Submission::Busy;
        }
        if form.username.trim().is_empty()
            || form.password.is_empty()
            || form.first_name.trim().is_empty()
            || form.last_name.trim().is_empty()
        {
            self.notices.push(Notice::error("All fields required"));
            return Submission::Invalid;
        }
        let request = CreateUserRequest {
            username: form.username.trim().to_string(),
            password: form.password,
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            role: Some(form.role),
        };

        self.creating = true;
        let result = settle(backend.submit_user(request).await, "Failed to create user");
        self.creating = false;

        match result {
            Ok(_) => {
                self.notices.push(Notice::success("User created successfully"));
                self.refresh(backend).await;
                Submission::Completed
            }
            Err(message) => {
                self.notices.push(Notice::error(message));
                Submission::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::gateway::{ApiOutcome, ClientError};
    use crate::client::workflow::tests::student;
    use crate::models::{ConfigEntry, TransactionKind};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct FakeStudent {
        fail_history: bool,
    }

    impl StudentBackend for FakeStudent {
        async fn balance_summary(&self) -> ApiResult<OwnBalanceResponse> {
            Ok(ApiOutcome::Accepted(OwnBalanceResponse {
                success: true,
                balance: 14,
                interest_earned: 2,
                rank: Some(1),
                total_students: Some(5),
            }))
        }

        async fn recent_transactions(&self, limit: usize) -> ApiResult<TransactionListResponse> {
            assert_eq!(limit, RECENT_TRANSACTIONS);
            if self.fail_history {
                return Err(ClientError::Status {
                    status: 500,
                    message: None,
                });
            }
            let record = TransactionRecord {
                id: 1,
                user_id: 3,
                amount: 1,
                kind: TransactionKind::Award,
                category_id: None,
                category_name: None,
                notes: None,
                created_at: Utc::now(),
                created_by_id: None,
            };
            Ok(ApiOutcome::Accepted(TransactionListResponse {
                success: true,
                transactions: vec![record],
                total: 1,
                limit,
                offset: 0,
            }))
        }
    }

    #[tokio::test]
    async fn student_dashboard_loads_parts_independently() {
        let mut dashboard = StudentDashboard::load(&FakeStudent { fail_history: false }).await;
        assert_eq!(dashboard.balance(), 14);
        assert_eq!(dashboard.recent.len(), 1);
        assert!(dashboard.take_notices().is_empty());

        let mut dashboard = StudentDashboard::load(&FakeStudent { fail_history: true }).await;
        assert_eq!(dashboard.balance(), 14);
        assert!(dashboard.recent.is_empty());
        assert_eq!(
            dashboard.take_notices(),
            vec![Notice::error("Failed to load transactions")]
        );
    }

    #[derive(Default)]
    struct FakeAdmin {
        config: BTreeMap<String, ConfigEntry>,
        reject_config: Option<String>,
        saved: Mutex<Vec<UpdateConfigRequest>>,
        created: Mutex<Vec<CreateUserRequest>>,
    }

    impl AdminBackend for FakeAdmin {
        async fn fetch_config(&self) -> ApiResult<ConfigResponse> {
            Ok(ApiOutcome::Accepted(ConfigResponse {
                success: true,
                config: self.config.clone(),
            }))
        }

        async fn fetch_users(&self) -> ApiResult<UserListResponse> {
            Ok(ApiOutcome::Accepted(UserListResponse {
                success: true,
                users: vec![student(1, "Admin", None)],
            }))
        }

        async fn fetch_stats(&self) -> ApiResult<SystemStatsResponse> {
            Ok(ApiOutcome::Accepted(SystemStatsResponse {
                success: true,
                stats: SystemStats {
                    total_students: 5,
                    ..Default::default()
                },
            }))
        }

        async fn save_config(&self, request: UpdateConfigRequest) -> ApiResult<ConfigUpdateResponse> {
            self.saved.lock().unwrap().push(request);
            match &self.reject_config {
                Some(message) => Err(ClientError::Status {
                    status: 400,
                    message: Some(message.clone()),
                }),
                None => Ok(ApiOutcome::Accepted(ConfigUpdateResponse {
                    success: true,
                    updated: vec![INTEREST_RATE.to_string()],
                })),
            }
        }

        async fn run_interest(&self) -> ApiResult<TriggerInterestResponse> {
            Err(ClientError::Status {
                status: 500,
                message: None,
            })
        }

        async fn submit_user(&self, request: CreateUserRequest) -> ApiResult<UserResponse> {
            self.created.lock().unwrap().push(request);
            Ok(ApiOutcome::Accepted(UserResponse {
                success: true,
                user: student(7, "New", None),
            }))
        }
    }

    #[tokio::test]
    async fn refresh_falls_back_to_defaults() {
        let mut dashboard = AdminDashboard::new();
        assert_eq!(dashboard.refresh(&FakeAdmin::default()).await, Submission::Completed);
        assert_eq!(dashboard.config, ConfigForm::default());
        assert_eq!(dashboard.config.interest_rate, "2");
        assert_eq!(dashboard.stats.as_ref().unwrap().total_students, 5);

        let mut backend = FakeAdmin::default();
        backend.config.insert(
            INTEREST_RATE.to_string(),
            ConfigEntry {
                value: "3.5".to_string(),
                description: None,
            },
        );
        dashboard.refresh(&backend).await;
        assert_eq!(dashboard.config.interest_rate, "3.5");
        assert_eq!(dashboard.config.raffle_prize_default, "50");
    }

    #[tokio::test]
    async fn save_config_reports_server_error() {
        let backend = FakeAdmin {
            reject_config: Some("Interest rate must be 0-100".to_string()),
            ..Default::default()
        };
        let mut dashboard = AdminDashboard::new();
        dashboard.config.interest_rate = "150".to_string();

        assert_eq!(dashboard.save_config(&backend).await, Submission::Failed);
        assert_eq!(
            dashboard.take_notices(),
            vec![Notice::error("Interest rate must be 0-100")]
        );
        let saved = backend.saved.lock().unwrap();
        assert_eq!(saved[0].interest_rate, Some(serde_json::json!("150")));
        assert!(!dashboard.is_saving());
    }

    #[tokio::test]
    async fn save_config_success_reloads() {
        let backend = FakeAdmin::default();
        let mut dashboard = AdminDashboard::new();
        assert_eq!(dashboard.save_config(&backend).await, Submission::Completed);
        assert_eq!(
            dashboard.take_notices(),
            vec![Notice::success("Configuration saved")]
        );
        assert_eq!(dashboard.users.len(), 1);
    }

    #[tokio::test]
    async fn trigger_interest_failure_uses_fallback() {
        let mut dashboard = AdminDashboard::new();
        assert_eq!(
            dashboard.trigger_interest(&FakeAdmin::default()).await,
            Submission::Failed
        );
        assert_eq!(
            dashboard.take_notices(),
            vec![Notice::error("Failed to trigger interest calculation")]
        );
    }

    #[tokio::test]
    async fn create_user_requires_every_field() {
        let backend = FakeAdmin::default();
        let mut dashboard = AdminDashboard::new();
        let form = StaffForm {
            username: "ms.frizzle".to_string(),
            password: String::new(),
            first_name: "Valerie".to_string(),
            last_name: "Frizzle".to_string(),
            role: Role::Teacher,
        };

        assert_eq!(
            dashboard.create_user(&backend, form.clone()).await,
            Submission::Invalid
        );
        assert_eq!(dashboard.take_notices(), vec![Notice::error("All fields required")]);
        assert!(backend.created.lock().unwrap().is_empty());

        let form = StaffForm {
            password: "bus123".to_string(),
            role: Role::Admin,
            ..form
        };
        assert_eq!(dashboard.create_user(&backend, form).await, Submission::Completed);
        let created = backend.created.lock().unwrap();
        assert_eq!(created[0].role, Some(Role::Admin));
        assert_eq!(created[0].username, "ms.frizzle");
    }
}
