// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance and interest summaries.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::{Auth, TeacherOnly},
    error::ApiError,
    models::{OwnBalanceResponse, TransactionKind, UserBalanceResponse},
    state::AppState,
    storage::{TransactionRepository, UserRepository},
};

/// Savings rank of `user_id` among active students that have at least one
/// ledger entry, with the size of that field.
pub(crate) fn savings_rank(state: &AppState, user_id: u64) -> Result<(Option<usize>, usize), ApiError> {
    let balances = TransactionRepository::new(&state.ledger).balances()?;
    let mut ranked: Vec<(u64, i64)> = UserRepository::new(&state.ledger)
        .active_students(None)?
        .iter()
        .filter_map(|s| balances.get(&s.id).map(|b| (s.id, *b)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let rank = ranked.iter().position(|(id, _)| *id == user_id).map(|i| i + 1);
    Ok((rank, ranked.len()))
}

/// The caller's balance and interest earned. Students also get their rank.
#[utoipa::path(
    get,
    path = "/api/balance/me",
    tag = "Balance",
    responses(
        (status = 200, description = "Own balance", body = OwnBalanceResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_balance(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<OwnBalanceResponse>, ApiError> {
    let transactions = TransactionRepository::new(&state.ledger);
    let balance = transactions.balance(user.user_id)?;
    let interest_earned = transactions.sum_by_kind(user.user_id, TransactionKind::Interest)?;

    let (rank, total_students) = if user.is_student() {
        let (rank, total) = savings_rank(&state, user.user_id)?;
        (rank, Some(total))
    } else {
        (None, None)
    };

    Ok(Json(OwnBalanceResponse {
        success: true,
        balance,
        interest_earned,
        rank,
        total_students,
    }))
}

/// Any user's balance (teacher view).
#[utoipa::path(
    get,
    path = "/api/balance/{user_id}",
    tag = "Balance",
    params(("user_id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User balance", body = UserBalanceResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_balance(
    TeacherOnly(_caller): TeacherOnly,
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<UserBalanceResponse>, ApiError> {
    let user = UserRepository::new(&state.ledger)
        .get(user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let transactions = TransactionRepository::new(&state.ledger);

    Ok(Json(UserBalanceResponse {
        success: true,
        user_id,
        balance: transactions.balance(user_id)?,
        interest_earned: transactions.sum_by_kind(user_id, TransactionKind::Interest)?,
        user: user.to_profile(None),
    }))
}
