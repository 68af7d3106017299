// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raffle draws.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{clamp_limit, transactions::to_records};
use crate::{
    auth::TeacherOnly,
    error::ApiError,
    models::{RaffleDrawRequest, RaffleDrawResponse, RaffleHistoryResponse},
    state::AppState,
    storage::{
        normalize_notes, RaffleRepository, SettingsRepository, StoredUser, UserRepository,
    },
};

const DEFAULT_PRIZE_DESCRIPTION: &str = "Raffle Prize";
const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

/// Query parameters for draw history.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Page size (default 20, max 100).
    pub limit: Option<usize>,
    /// Draws to skip.
    pub offset: Option<usize>,
}

/// Uniform pick, rejection-sampled from the system CSPRNG.
fn pick_winner(students: &[StoredUser]) -> Result<Option<&StoredUser>, ApiError> {
    if students.is_empty() {
        return Ok(None);
    }
    let len = students.len() as u64;
    let zone = u64::MAX - (u64::MAX % len);
    let rng = SystemRandom::new();
    loop {
        let mut buf = [0u8; 8];
        rng.fill(&mut buf)
            .map_err(|_| ApiError::internal("Secure random unavailable"))?;
        let n = u64::from_be_bytes(buf);
        if n < zone {
            return Ok(students.get((n % len) as usize));
        }
    }
}

/// Draw a uniformly random winner among active students and credit the prize.
#[utoipa::path(
    post,
    path = "/api/raffle/draw",
    tag = "Raffle",
    request_body = RaffleDrawRequest,
    responses(
        (status = 201, description = "Draw conducted", body = RaffleDrawResponse),
        (status = 400, description = "Invalid prize or no students")
    )
)]
pub async fn draw(
    TeacherOnly(user): TeacherOnly,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<RaffleDrawResponse>), ApiError> {
    // The body is optional; an empty one means "all defaults".
    let request: RaffleDrawRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RaffleDrawRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request("Invalid request body"))?
    };

    let prize_amount = match request.prize_amount {
        Some(amount) => amount,
        None => SettingsRepository::new(&state.ledger).raffle_prize_default()?,
    };
    if prize_amount <= 0 {
        return Err(ApiError::bad_request("Prize amount must be a positive integer"));
    }
    let description = normalize_notes(request.prize_description.as_deref())
        .unwrap_or_else(|| DEFAULT_PRIZE_DESCRIPTION.to_string());

    let students = UserRepository::new(&state.ledger).active_students(None)?;
    let winner = pick_winner(&students)?
        .ok_or_else(|| ApiError::bad_request("No active students to draw from"))?;

    let outcome = RaffleRepository::new(&state.ledger).record_draw(
        winner.id,
        prize_amount,
        &description,
        user.user_id,
    )?;

    tracing::info!(
        draw_id = outcome.draw.id,
        winner_id = winner.id,
        prize_amount,
        conducted_by = user.user_id,
        "Raffle drawn"
    );

    let transaction = to_records(&state, std::slice::from_ref(&outcome.transaction))?
        .pop()
        .ok_or_else(|| ApiError::internal("Failed to render transaction"))?;
    Ok((
        StatusCode::CREATED,
        Json(RaffleDrawResponse {
            success: true,
            raffle: outcome.draw.to_view(Some(winner.full_name())),
            winner: winner.to_profile(Some(outcome.new_balance)),
            transaction,
        }),
    ))
}

/// Past draws, newest first.
#[utoipa::path(
    get,
    path = "/api/raffle/history",
    tag = "Raffle",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Draw history", body = RaffleHistoryResponse)
    )
)]
pub async fn history(
    TeacherOnly(_user): TeacherOnly,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<RaffleHistoryResponse>, ApiError> {
    let limit = clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let (draws, total) = RaffleRepository::new(&state.ledger).history(limit, offset)?;

    let users = UserRepository::new(&state.ledger);
    let mut views = Vec::with_capacity(draws.len());
    for draw in &draws {
        let winner_name = users.get(draw.winner_id)?.map(|u| u.full_name());
        views.push(draw.to_view(winner_name));
    }

    Ok(Json(RaffleHistoryResponse {
        success: true,
        draws: views,
        total,
        limit,
        offset,
    }))
}
