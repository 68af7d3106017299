// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger endpoints: awards, deposits and transaction history.
//!
//! Awards are always exactly 1 DB$. Every balance-changing response carries
//! `newBalance`, computed inside the same write transaction as the entry.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{clamp_limit, students::active_student};
use crate::{
    auth::{Auth, TeacherOnly},
    error::{ApiError, ApiJson},
    models::{
        AwardRequest, DepositRequest, LedgerEntryResponse, TransactionKind, TransactionListResponse,
        TransactionRecord,
    },
    state::AppState,
    storage::{
        normalize_notes, BehaviorRepository, NewTransaction, StoredTransaction, TransactionFilter,
        TransactionRepository,
    },
};

/// Amount credited by one award.
pub const AWARD_AMOUNT: i64 = 1;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

/// Query parameters for transaction history.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TransactionQuery {
    /// Only entries for this user (ignored for students).
    pub user_id: Option<u64>,
    /// Only entries of this type; unknown types are ignored.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Page size (default 50, max 200).
    pub limit: Option<usize>,
    /// Entries to skip.
    pub offset: Option<usize>,
}

/// Attach behavior names to ledger entries.
pub(crate) fn to_records(
    state: &AppState,
    entries: &[StoredTransaction],
) -> Result<Vec<TransactionRecord>, ApiError> {
    let names: HashMap<u64, String> = BehaviorRepository::new(&state.ledger)
        .list_all()?
        .into_iter()
        .map(|b| (b.id, b.name))
        .collect();
    Ok(entries
        .iter()
        .map(|tx| tx.to_record(tx.category_id.and_then(|id| names.get(&id).cloned())))
        .collect())
}

fn entry_response(
    state: &AppState,
    tx: StoredTransaction,
    new_balance: i64,
) -> Result<(StatusCode, Json<LedgerEntryResponse>), ApiError> {
    let transaction = to_records(state, std::slice::from_ref(&tx))?
        .pop()
        .ok_or_else(|| ApiError::internal("Failed to render transaction"))?;
    Ok((
        StatusCode::CREATED,
        Json(LedgerEntryResponse {
            success: true,
            transaction,
            new_balance,
        }),
    ))
}

/// Award 1 DB$ to a student, optionally tagged with a behavior.
#[utoipa::path(
    post,
    path = "/api/transactions/award",
    tag = "Transactions",
    request_body = AwardRequest,
    responses(
        (status = 201, description = "Award recorded", body = LedgerEntryResponse),
        (status = 400, description = "studentId required"),
        (status = 404, description = "Student or behavior not found")
    )
)]
pub async fn award(
    TeacherOnly(user): TeacherOnly,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AwardRequest>,
) -> Result<(StatusCode, Json<LedgerEntryResponse>), ApiError> {
    let student_id = request
        .student_id
        .filter(|id| *id != 0)
        .ok_or_else(|| ApiError::bad_request("studentId required"))?;
    let student = active_student(&state, student_id)?;

    let behavior_id = request.behavior_id.filter(|id| *id != 0);
    if let Some(behavior_id) = behavior_id {
        BehaviorRepository::new(&state.ledger)
            .get(behavior_id)?
            .ok_or_else(|| ApiError::not_found("Behavior not found"))?;
    }

    let (tx, new_balance) = TransactionRepository::new(&state.ledger).record(NewTransaction {
        user_id: student.id,
        amount: AWARD_AMOUNT,
        kind: TransactionKind::Award,
        category_id: behavior_id,
        notes: normalize_notes(request.notes.as_deref()),
        created_by_id: Some(user.user_id),
    })?;
    entry_response(&state, tx, new_balance)
}

/// Deposit physical tokens into a student's account.
#[utoipa::path(
    post,
    path = "/api/transactions/deposit",
    tag = "Transactions",
    request_body = DepositRequest,
    responses(
        (status = 201, description = "Deposit recorded", body = LedgerEntryResponse),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn deposit(
    TeacherOnly(user): TeacherOnly,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DepositRequest>,
) -> Result<(StatusCode, Json<LedgerEntryResponse>), ApiError> {
    let (Some(student_id), Some(amount)) = (
        request.student_id.filter(|id| *id != 0),
        request.amount.filter(|a| *a != 0),
    ) else {
        return Err(ApiError::bad_request("studentId and amount required"));
    };
    if amount < 0 {
        return Err(ApiError::bad_request("Amount must be a positive integer"));
    }
    let student = active_student(&state, student_id)?;

    let (tx, new_balance) = TransactionRepository::new(&state.ledger).record(NewTransaction {
        user_id: student.id,
        amount,
        kind: TransactionKind::Deposit,
        category_id: None,
        notes: normalize_notes(request.notes.as_deref()),
        created_by_id: Some(user.user_id),
    })?;
    entry_response(&state, tx, new_balance)
}

/// Transaction history, newest first. Students only ever see their own.
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "Transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Transactions", body = TransactionListResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let user_id = if user.is_student() {
        Some(user.user_id)
    } else {
        query.user_id.filter(|id| *id != 0)
    };
    let filter = TransactionFilter {
        user_id,
        kind: query.kind.as_deref().and_then(TransactionKind::from_str),
        limit: clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT),
        offset: query.offset.unwrap_or(0),
    };

    let (entries, total) = TransactionRepository::new(&state.ledger).list(&filter)?;
    Ok(Json(TransactionListResponse {
        success: true,
        transactions: to_records(&state, &entries)?,
        total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn award_credits_exactly_one() {
        let app = TestApp::new();
        let teacher = app.teacher();
        let token = app.token_for(&teacher);
        let alice = app.student("Alice", "Johnson", "5A");
        let behavior = app.behavior_id("Teamwork");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/transactions/award",
                Some(&token),
                Some(json!({"studentId": alice.id, "behaviorId": behavior, "notes": "  great  "})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["newBalance"], 1);
        assert_eq!(body["transaction"]["amount"], 1);
        assert_eq!(body["transaction"]["type"], "award");
        assert_eq!(body["transaction"]["categoryName"], "Teamwork");
        assert_eq!(body["transaction"]["notes"], "great");
        assert_eq!(body["transaction"]["createdById"], teacher.id);

        let (_, body) = app
            .call(
                Method::POST,
                "/api/transactions/award",
                Some(&token),
                Some(json!({"studentId": alice.id})),
            )
            .await;
        assert_eq!(body["newBalance"], 2);
    }

    #[tokio::test]
    async fn award_validation() {
        let app = TestApp::new();
        let token = app.token_for(&app.teacher());
        let alice = app.student("Alice", "Johnson", "5A");

        let (status, body) = app
            .call(Method::POST, "/api/transactions/award", Some(&token), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "studentId required");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/transactions/award",
                Some(&token),
                Some(json!({"studentId": 9999})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Student not found");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/transactions/award",
                Some(&token),
                Some(json!({"studentId": alice.id, "behaviorId": 9999})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Behavior not found");
    }

    #[tokio::test]
    async fn deposit_past_balance_limit_is_rejected() {
        let app = TestApp::new();
        let token = app.token_for(&app.teacher());
        let alice = app.student("Alice", "Johnson", "5A");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/transactions/deposit",
                Some(&token),
                Some(json!({"studentId": alice.id, "amount": i64::MAX})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["newBalance"], i64::MAX);

        let (status, body) = app
            .call(
                Method::POST,
                "/api/transactions/award",
                Some(&token),
                Some(json!({"studentId": alice.id})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Amount too large");
    }

    #[tokio::test]
    async fn deposit_requires_positive_amount() {
        let app = TestApp::new();
        let token = app.token_for(&app.teacher());
        let alice = app.student("Alice", "Johnson", "5A");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/transactions/deposit",
                Some(&token),
                Some(json!({"studentId": alice.id, "amount": -3})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Amount must be a positive integer");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/transactions/deposit",
                Some(&token),
                Some(json!({"studentId": alice.id})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "studentId and amount required");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/transactions/deposit",
                Some(&token),
                Some(json!({"studentId": alice.id, "amount": 15})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["newBalance"], 15);
        assert_eq!(body["transaction"]["type"], "deposit");
    }

    #[tokio::test]
    async fn students_only_see_their_own_history() {
        let app = TestApp::new();
        let teacher_token = app.token_for(&app.teacher());
        let alice = app.student("Alice", "Johnson", "5A");
        let bob = app.student("Bob", "Smith", "5A");
        for (id, amount) in [(alice.id, 5), (bob.id, 7), (alice.id, 2)] {
            app.call(
                Method::POST,
                "/api/transactions/deposit",
                Some(&teacher_token),
                Some(json!({"studentId": id, "amount": amount})),
            )
            .await;
        }

        let alice_token = app.token_for(&alice);
        let (status, body) = app
            .call(
                Method::GET,
                &format!("/api/transactions?user_id={}", bob.id),
                Some(&alice_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["transactions"][0]["amount"], 2);
        assert_eq!(body["limit"], 50);

        let (_, body) = app
            .call(
                Method::GET,
                "/api/transactions?type=bogus&limit=1000",
                Some(&teacher_token),
                None,
            )
            .await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["limit"], 200);

        let (_, body) = app
            .call(Method::GET, "/api/transactions?type=award", Some(&teacher_token), None)
            .await;
        assert_eq!(body["total"], 0);
    }
}
