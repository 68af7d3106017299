// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Leaderboards and usage statistics (teacher or admin).

use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use super::clamp_limit;
use crate::{
    auth::TeacherOnly,
    error::ApiError,
    models::{
        BehaviorBreakdownResponse, BehaviorCount, LeaderboardEntry, LeaderboardKind,
        LeaderboardResponse, SystemStats, SystemStatsResponse, TransactionKind,
    },
    state::AppState,
    storage::{BehaviorRepository, TransactionRepository, UserRepository},
};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;
/// Window for the "earners" leaderboard.
const EARNERS_WINDOW_DAYS: i64 = 7;
const DEFAULT_BREAKDOWN_DAYS: i64 = 30;
/// Bucket for awards without a behavior.
const UNCATEGORIZED: &str = "Other";

/// Query parameters for the leaderboard.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// "savers" (balance, default) or "earners" (credits in the last 7 days).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Entries to return (default 10, max 50).
    pub limit: Option<usize>,
    /// Only students in this class.
    pub class_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BreakdownQuery {
    /// Look-back window in days (default 30).
    pub days: Option<i64>,
}

/// Top savers or earners among active students.
///
/// Only students with qualifying ledger entries appear.
#[utoipa::path(
    get,
    path = "/api/analytics/leaderboard",
    tag = "Analytics",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardResponse)
    )
)]
pub async fn leaderboard(
    TeacherOnly(_user): TeacherOnly,
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let kind = match query.kind.as_deref() {
        Some("earners") => LeaderboardKind::Earners,
        _ => LeaderboardKind::Savers,
    };
    let limit = clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let class_name = query.class_name.as_deref().filter(|c| !c.is_empty());

    let students = UserRepository::new(&state.ledger).active_students(class_name)?;
    let transactions = TransactionRepository::new(&state.ledger);

    let totals: HashMap<u64, i64> = match kind {
        LeaderboardKind::Savers => transactions.balances()?,
        LeaderboardKind::Earners => {
            let since = Utc::now() - Duration::days(EARNERS_WINDOW_DAYS);
            let mut totals = HashMap::new();
            for tx in transactions.all()? {
                if tx.amount > 0 && tx.created_at >= since {
                    let total = totals.entry(tx.user_id).or_insert(0i64);
                    *total = total.saturating_add(tx.amount);
                }
            }
            totals
        }
    };

    let mut ranked: Vec<_> = students
        .iter()
        .filter_map(|s| totals.get(&s.id).map(|value| (s, *value)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let leaderboard = ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (student, value))| LeaderboardEntry {
            rank: i + 1,
            user_id: student.id,
            name: student.full_name(),
            class_name: student.class_name.clone(),
            value,
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        success: true,
        leaderboard,
        kind,
    }))
}

/// Award counts per behavior over the last `days` days, most awarded first.
#[utoipa::path(
    get,
    path = "/api/analytics/behavior-breakdown",
    tag = "Analytics",
    params(BreakdownQuery),
    responses(
        (status = 200, description = "Awards by behavior", body = BehaviorBreakdownResponse)
    )
)]
pub async fn behavior_breakdown(
    TeacherOnly(_user): TeacherOnly,
    State(state): State<AppState>,
    Query(query): Query<BreakdownQuery>,
) -> Result<Json<BehaviorBreakdownResponse>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_BREAKDOWN_DAYS);
    let since = Utc::now() - Duration::days(days);

    let names: HashMap<u64, String> = BehaviorRepository::new(&state.ledger)
        .list_all()?
        .into_iter()
        .map(|b| (b.id, b.name))
        .collect();

    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut uncategorized = 0u64;
    for tx in TransactionRepository::new(&state.ledger).all()? {
        if tx.kind != TransactionKind::Award || tx.created_at < since {
            continue;
        }
        match tx.category_id {
            Some(id) => {
                if let Some(name) = names.get(&id) {
                    *counts.entry(name.clone()).or_insert(0) += 1;
                }
            }
            None => uncategorized += 1,
        }
    }

    let mut breakdown: Vec<BehaviorCount> = counts
        .into_iter()
        .map(|(behavior, count)| BehaviorCount { behavior, count })
        .collect();
    breakdown.sort_by(|a, b| b.count.cmp(&a.count));
    if uncategorized > 0 {
        breakdown.push(BehaviorCount {
            behavior: UNCATEGORIZED.to_string(),
            count: uncategorized,
        });
    }

    Ok(Json(BehaviorBreakdownResponse {
        success: true,
        breakdown,
        days,
    }))
}

/// Sum clamped to the `i64` range.
fn saturating_total(amounts: impl Iterator<Item = i64>) -> i64 {
    amounts.fold(0, i64::saturating_add)
}

/// Whole-school totals.
#[utoipa::path(
    get,
    path = "/api/analytics/system-stats",
    tag = "Analytics",
    responses(
        (status = 200, description = "System statistics", body = SystemStatsResponse)
    )
)]
pub async fn system_stats(
    TeacherOnly(_user): TeacherOnly,
    State(state): State<AppState>,
) -> Result<Json<SystemStatsResponse>, ApiError> {
    let students = UserRepository::new(&state.ledger).active_students(None)?;
    let entries = TransactionRepository::new(&state.ledger).all()?;
    let today = Utc::now().date_naive();

    let mut class_counts = BTreeMap::new();
    for class_name in students.iter().filter_map(|s| s.class_name.clone()) {
        *class_counts.entry(class_name).or_insert(0) += 1;
    }

    let stats = SystemStats {
        total_students: students.len(),
        total_circulation: saturating_total(entries.iter().map(|tx| tx.amount)),
        transactions_today: entries
            .iter()
            .filter(|tx| tx.created_at.date_naive() == today)
            .count(),
        total_interest_distributed: saturating_total(
            entries
                .iter()
                .filter(|tx| tx.kind == TransactionKind::Interest)
                .map(|tx| tx.amount),
        ),
        class_counts,
    };

    Ok(Json(SystemStatsResponse {
        success: true,
        stats,
    }))
}
