// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Liveness and readiness probes, mounted outside `/api`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{state::AppState, storage::BehaviorRepository};

const OK: &str = "ok";

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// "ok" or "degraded".
    pub status: String,
    pub checks: HealthChecks,
}

/// Per-component results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// "ok" or "unavailable".
    pub ledger: String,
    /// "ok", "empty" (no active behaviors seeded) or "unavailable".
    pub catalog: String,
}

impl HealthChecks {
    fn run(state: &AppState) -> Self {
        let ledger = if state.ledger.is_readable() {
            OK
        } else {
            "unavailable"
        };
        let catalog = match BehaviorRepository::new(&state.ledger).list_active() {
            Ok(active) if active.is_empty() => "empty",
            Ok(_) => OK,
            Err(e) => {
                tracing::warn!(error = %e, "Behavior catalog check failed");
                "unavailable"
            }
        };
        Self {
            service: OK.to_string(),
            ledger: ledger.to_string(),
            catalog: catalog.to_string(),
        }
    }

    fn all_ok(&self) -> bool {
        [&self.service, &self.ledger, &self.catalog]
            .iter()
            .all(|check| check.as_str() == OK)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Component health. 503 when any check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "All checks pass", body = ReadyResponse),
        (status = 503, description = "A check failed", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let checks = HealthChecks::run(&state);
    let (code, status) = if checks.all_ok() {
        (StatusCode::OK, OK)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(ReadyResponse {
            status: status.to_string(),
            checks,
        }),
    )
}

/// Process is up. Never touches the ledger.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is running", body = HealthResponse))
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: OK.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready for traffic", body = ReadyResponse),
        (status = 503, description = "Not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
