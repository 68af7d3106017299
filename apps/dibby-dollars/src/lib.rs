// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dibby Dollars - Classroom Token Economy
//!
//! Teachers award DB$ for positive behavior, deposit physical-token
//! conversions and run raffles; students earn weekly interest on their
//! savings. This crate holds the ledger server and the role-aware client the
//! dashboards are built on.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - PIN/password login and cookie sessions
//! - `client` - Session store, route guard, API gateway and teacher workflow
//! - `interest` - Daily snapshots and weekly interest
//! - `scheduler` - Background task running snapshot and interest jobs
//! - `seed` - Default catalog, configuration and demo accounts
//! - `storage` - Embedded ledger database (redb)

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod interest;
pub mod models;
pub mod scheduler;
pub mod seed;
pub mod state;
pub mod storage;
