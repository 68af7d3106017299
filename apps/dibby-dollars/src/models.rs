// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures shared by the HTTP server and the
//! dashboard client. Field names are camelCase on the wire. Every response
//! carries a top-level `success` flag; failures use the
//! `{"success": false, "error": "..."}` envelope produced by
//! [`crate::error::ApiError`].
//!
//! ## Model Categories
//!
//! - **Users**: the authenticated principal and roster entries
//! - **Ledger**: awards, deposits, interest and raffle entries
//! - **Behaviors**: the catalog and per-teacher focus selection
//! - **Raffle / Analytics / Admin**: draws, leaderboards, configuration

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;

// =============================================================================
// Users
// =============================================================================

/// A user as seen by clients.
///
/// This is the principal stored by the client session after login and the
/// shape of every roster entry. `balance` is only present when the server
/// was asked to include it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Students
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub pin: String,
}

/// Partial student update. Absent fields are left untouched; an empty
/// `className` clears the class.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentListResponse {
    pub success: bool,
    pub students: Vec<UserProfile>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentResponse {
    pub success: bool,
    pub student: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassListResponse {
    pub success: bool,
    pub classes: Vec<String>,
}

// =============================================================================
// Ledger
// =============================================================================

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Physical tokens converted into the account
    Deposit,
    /// Behavior award (always 1 DB$)
    Award,
    /// Spending (negative amount)
    Spend,
    /// Weekly interest credit
    Interest,
    /// Raffle prize
    Raffle,
}

impl TransactionKind {
    pub fn from_str(s: &str) -> Option<TransactionKind> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Some(TransactionKind::Deposit),
            "award" => Some(TransactionKind::Award),
            "spend" => Some(TransactionKind::Spend),
            "interest" => Some(TransactionKind::Interest),
            "raffle" => Some(TransactionKind::Raffle),
            _ => None,
        }
    }
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: u64,
    pub user_id: u64,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by_id: Option<u64>,
}

/// Award intent. The amount is fixed server-side and never sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwardRequest {
    #[serde(default)]
    pub student_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    #[serde(default)]
    pub student_id: Option<u64>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Result of a balance-changing operation: the entry plus the authoritative
/// post-commit balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    pub success: bool,
    pub transaction: TransactionRecord,
    pub new_balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionListResponse {
    pub success: bool,
    pub transactions: Vec<TransactionRecord>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnBalanceResponse {
    pub success: bool,
    pub balance: i64,
    pub interest_earned: i64,
    /// Savings rank among students (students only).
    #[serde(default)]
    pub rank: Option<usize>,
    #[serde(default)]
    pub total_students: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserBalanceResponse {
    pub success: bool,
    pub user_id: u64,
    pub balance: i64,
    pub interest_earned: i64,
    pub user: UserProfile,
}

// =============================================================================
// Behaviors
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_system_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateBehaviorRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetFocusRequest {
    #[serde(default)]
    pub behavior_ids: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct BehaviorListResponse {
    pub success: bool,
    pub behaviors: Vec<Behavior>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BehaviorResponse {
    pub success: bool,
    pub behavior: Behavior,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FocusResponse {
    pub success: bool,
    pub focus_behaviors: Vec<Behavior>,
}

// =============================================================================
// Raffle
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RaffleDraw {
    pub id: u64,
    pub draw_date: DateTime<Utc>,
    pub winner_id: u64,
    #[serde(default)]
    pub winner_name: Option<String>,
    pub prize_amount: i64,
    #[serde(default)]
    pub prize_description: Option<String>,
    #[serde(default)]
    pub conducted_by_id: Option<u64>,
}

/// Raffle draw intent. An absent prize uses the configured default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RaffleDrawRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RaffleDrawResponse {
    pub success: bool,
    pub raffle: RaffleDraw,
    pub winner: UserProfile,
    pub transaction: TransactionRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RaffleHistoryResponse {
    pub success: bool,
    pub draws: Vec<RaffleDraw>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

// =============================================================================
// Analytics
// =============================================================================

/// Leaderboard ranking basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardKind {
    /// Ranked by current balance
    #[default]
    Savers,
    /// Ranked by positive entries in the last 7 days
    Earners,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: u64,
    pub name: String,
    #[serde(default)]
    pub class_name: Option<String>,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(rename = "type")]
    pub kind: LeaderboardKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BehaviorCount {
    pub behavior: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BehaviorBreakdownResponse {
    pub success: bool,
    pub breakdown: Vec<BehaviorCount>,
    pub days: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_students: usize,
    pub total_circulation: i64,
    pub transactions_today: usize,
    pub total_interest_distributed: i64,
    pub class_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SystemStatsResponse {
    pub success: bool,
    pub stats: SystemStats,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ConfigEntry {
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfigResponse {
    pub success: bool,
    pub config: BTreeMap<String, ConfigEntry>,
}

/// Configuration update. Values may be sent as strings or numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub interest_rate: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub raffle_prize_default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub interest_day: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfigUpdateResponse {
    pub success: bool,
    pub updated: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserProfile>,
}

/// Outcome of one weekly interest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterestSummary {
    pub success: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub students_receiving_interest: usize,
    pub total_interest_distributed: i64,
    pub interest_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TriggerInterestResponse {
    pub success: bool,
    pub message: String,
    pub result: InterestSummary,
}
