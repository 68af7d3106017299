// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Behavior catalog and per-teacher focus selection.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::TeacherOnly,
    error::{ApiError, ApiJson},
    models::{
        Behavior, BehaviorListResponse, BehaviorResponse, CreateBehaviorRequest, FocusResponse,
        MessageResponse, SetFocusRequest,
    },
    state::AppState,
    storage::{
        repository::{MAX_FOCUS_BEHAVIORS, MIN_FOCUS_BEHAVIORS},
        BehaviorRepository, LedgerError,
    },
};

/// Active behaviors ordered by name.
#[utoipa::path(
    get,
    path = "/api/behaviors",
    tag = "Behaviors",
    responses(
        (status = 200, description = "Behavior catalog", body = BehaviorListResponse)
    )
)]
pub async fn list_behaviors(
    TeacherOnly(_user): TeacherOnly,
    State(state): State<AppState>,
) -> Result<Json<BehaviorListResponse>, ApiError> {
    let behaviors = BehaviorRepository::new(&state.ledger)
        .list_active()?
        .into_iter()
        .map(Behavior::from)
        .collect();
    Ok(Json(BehaviorListResponse {
        success: true,
        behaviors,
    }))
}

/// Add a behavior to the catalog.
#[utoipa::path(
    post,
    path = "/api/behaviors",
    tag = "Behaviors",
    request_body = CreateBehaviorRequest,
    responses(
        (status = 201, description = "Behavior created", body = BehaviorResponse),
        (status = 400, description = "Name is required or already exists")
    )
)]
pub async fn create_behavior(
    TeacherOnly(user): TeacherOnly,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateBehaviorRequest>,
) -> Result<(StatusCode, Json<BehaviorResponse>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    let description = crate::storage::normalize_notes(request.description.as_deref());

    let behavior = BehaviorRepository::new(&state.ledger)
        .create(name, description, false)
        .map_err(|e| match e {
            LedgerError::Conflict(_) => ApiError::bad_request("Behavior already exists"),
            other => other.into(),
        })?;

    tracing::info!(behavior_id = behavior.id, created_by = user.user_id, "Behavior created");
    Ok((
        StatusCode::CREATED,
        Json(BehaviorResponse {
            success: true,
            behavior: behavior.into(),
        }),
    ))
}

/// The caller's focus behaviors in saved order.
#[utoipa::path(
    get,
    path = "/api/behaviors/my-focus",
    tag = "Behaviors",
    responses(
        (status = 200, description = "Focus behaviors", body = FocusResponse)
    )
)]
pub async fn get_my_focus(
    TeacherOnly(user): TeacherOnly,
    State(state): State<AppState>,
) -> Result<Json<FocusResponse>, ApiError> {
    let focus_behaviors = BehaviorRepository::new(&state.ledger)
        .focus_for(user.user_id)?
        .into_iter()
        .map(Behavior::from)
        .collect();
    Ok(Json(FocusResponse {
        success: true,
        focus_behaviors,
    }))
}

/// Replace the caller's focus behaviors (3 to 5 ids).
#[utoipa::path(
    put,
    path = "/api/behaviors/my-focus",
    tag = "Behaviors",
    request_body = SetFocusRequest,
    responses(
        (status = 200, description = "Focus saved", body = MessageResponse),
        (status = 400, description = "Wrong number of behaviors"),
        (status = 404, description = "Behavior not found")
    )
)]
pub async fn set_my_focus(
    TeacherOnly(user): TeacherOnly,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SetFocusRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let ids = request
        .behavior_ids
        .ok_or_else(|| ApiError::bad_request("behaviorIds required"))?;
    if ids.len() < MIN_FOCUS_BEHAVIORS {
        return Err(ApiError::bad_request("Select 3 to 5 focus behaviors"));
    }
    if ids.len() > MAX_FOCUS_BEHAVIORS {
        return Err(ApiError::bad_request("Maximum 5 focus behaviors allowed"));
    }

    BehaviorRepository::new(&state.ledger).set_focus(user.user_id, &ids)?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Set {} focus behaviors", ids.len()),
    }))
}
