// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints for system management.
//!
//! These endpoints require the Admin role and provide:
//! - System configuration (interest rate, raffle default, interest day)
//! - Staff account management
//! - Manual interest runs

use axum::{extract::State, http::StatusCode, Json};
use chrono::Local;
use serde_json::Value;

use crate::{
    auth::{hash_pin, AdminOnly, Role},
    error::{ApiError, ApiJson},
    interest::calculate_weekly_interest,
    models::{
        ConfigResponse, ConfigUpdateResponse, CreateUserRequest, TriggerInterestResponse,
        UpdateConfigRequest, UserListResponse, UserResponse,
    },
    state::AppState,
    storage::{
        repository::settings::{parse_weekday, INTEREST_DAY, INTEREST_RATE, RAFFLE_PRIZE_DEFAULT},
        LedgerError, NewUser, SettingsRepository, UserRepository,
    },
};

// ============================================================================
// Configuration
// ============================================================================

/// Config values arrive as strings from the dashboard, but plain JSON
/// numbers are accepted too.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn validate_interest_rate(value: &Value) -> Result<String, ApiError> {
    let text = value_text(value);
    let rate: f64 = text
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid interest rate"))?;
    if !(0.0..=100.0).contains(&rate) {
        return Err(ApiError::bad_request("Interest rate must be 0-100"));
    }
    Ok(text)
}

fn validate_prize(value: &Value) -> Result<String, ApiError> {
    let text = value_text(value);
    let prize: i64 = text
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid prize amount"))?;
    if prize <= 0 {
        return Err(ApiError::bad_request("Prize must be positive"));
    }
    Ok(prize.to_string())
}

fn validate_interest_day(value: &Value) -> Result<String, ApiError> {
    let text = value_text(value).to_lowercase();
    parse_weekday(&text).ok_or_else(|| ApiError::bad_request("Invalid interest day"))?;
    Ok(text)
}

/// Current configuration, defaults merged with stored values.
#[utoipa::path(
    get,
    path = "/api/admin/config",
    tag = "Admin",
    responses(
        (status = 200, description = "Configuration", body = ConfigResponse),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn get_config(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<ConfigResponse>, ApiError> {
    Ok(Json(ConfigResponse {
        success: true,
        config: SettingsRepository::new(&state.ledger).all()?,
    }))
}

/// Update configuration. Every supplied value is validated before any is
/// written.
#[utoipa::path(
    put,
    path = "/api/admin/config",
    tag = "Admin",
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Keys updated", body = ConfigUpdateResponse),
        (status = 400, description = "Invalid value")
    )
)]
pub async fn update_config(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateConfigRequest>,
) -> Result<Json<ConfigUpdateResponse>, ApiError> {
    let mut changes: Vec<(&str, String)> = Vec::new();
    if let Some(value) = &request.interest_rate {
        changes.push((INTEREST_RATE, validate_interest_rate(value)?));
    }
    if let Some(value) = &request.raffle_prize_default {
        changes.push((RAFFLE_PRIZE_DEFAULT, validate_prize(value)?));
    }
    if let Some(value) = &request.interest_day {
        changes.push((INTEREST_DAY, validate_interest_day(value)?));
    }

    let settings = SettingsRepository::new(&state.ledger);
    let mut updated = Vec::with_capacity(changes.len());
    for (key, value) in changes {
        settings.set(key, &value)?;
        updated.push(key.to_string());
    }

    tracing::info!(admin_id = admin.user_id, updated = ?updated, "Configuration updated");
    Ok(Json(ConfigUpdateResponse {
        success: true,
        updated,
    }))
}

// ============================================================================
// Staff
// ============================================================================

/// Teachers and admins.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    responses(
        (status = 200, description = "Staff accounts", body = UserListResponse)
    )
)]
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = UserRepository::new(&state.ledger)
        .staff()?
        .iter()
        .map(|u| u.to_profile(None))
        .collect();
    Ok(Json(UserListResponse {
        success: true,
        users,
    }))
}

/// Create a teacher or admin account.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "Admin",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Missing field or username taken")
    )
)]
pub async fn create_user(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    for (field, value) in [
        ("username", request.username.trim()),
        ("password", request.password.as_str()),
        ("firstName", request.first_name.trim()),
        ("lastName", request.last_name.trim()),
    ] {
        if value.is_empty() {
            return Err(ApiError::bad_request(format!("{field} is required")));
        }
    }

    let role = match request.role {
        Some(Role::Admin) => Role::Admin,
        _ => Role::Teacher,
    };
    let pin_hash = hash_pin(&request.password).map_err(|e| ApiError::internal(e.to_string()))?;

    let user = UserRepository::new(&state.ledger)
        .create(NewUser {
            username: request.username.trim().to_lowercase(),
            pin_hash,
            role,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            class_name: None,
        })
        .map_err(|e| match e {
            LedgerError::Conflict(_) => ApiError::bad_request("Username already exists"),
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, role = %role, created_by = admin.user_id, "Staff account created");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            user: user.to_profile(None),
        }),
    ))
}

// ============================================================================
// Operations
// ============================================================================

/// Run the weekly interest calculation now.
#[utoipa::path(
    post,
    path = "/api/admin/trigger-interest",
    tag = "Admin",
    responses(
        (status = 200, description = "Interest run finished", body = TriggerInterestResponse)
    )
)]
pub async fn trigger_interest(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<TriggerInterestResponse>, ApiError> {
    tracing::info!(admin_id = admin.user_id, "Manual interest run requested");
    let result = calculate_weekly_interest(&state.ledger, Local::now().date_naive())?;
    Ok(Json(TriggerInterestResponse {
        success: true,
        message: "Interest calculation triggered".to_string(),
        result,
    }))
}
