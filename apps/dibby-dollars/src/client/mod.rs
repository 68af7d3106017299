// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Dashboard Client
//!
//! Role-aware client for the ledger API, independent of any UI toolkit.
//!
//! ## Components
//!
//! - [`session`]: the authenticated principal, persisted between runs
//! - [`guard`]: route access decisions from the session's role
//! - [`gateway`]: one HTTP call per server operation, normalized outcomes
//! - [`workflow`]: the teacher desk (award, deposit, raffle, roster)
//! - [`focus`]: the focus behavior editor
//! - [`login`], [`dashboard`]: login/logout and the student/admin views
//!
//! ## Flow
//!
//! ```text
//! login ──► SessionStore ──► guard::resolve ──► dashboard / TeacherDesk
//!                                                      │
//!                                               ApiClient (cookie session)
//!                                                      │
//!                                    server-confirmed balance ──► roster + selection
//! ```
//!
//! Views talk to the server through small backend traits
//! ([`workflow::DeskBackend`], [`focus::FocusBackend`], [`login::AuthBackend`],
//! [`dashboard::StudentBackend`], [`dashboard::AdminBackend`]), all
//! implemented by [`gateway::ApiClient`].

pub mod dashboard;
pub mod focus;
pub mod gateway;
pub mod guard;
pub mod login;
pub mod notice;
pub mod session;
pub mod workflow;

pub use gateway::{ApiClient, ApiOutcome, ApiResult, ClientConfig, ClientError};
pub use guard::{GuardDecision, Route};
pub use notice::{Notice, Severity};
pub use session::{SessionError, SessionStore};
pub use workflow::{Submission, TeacherDesk};
