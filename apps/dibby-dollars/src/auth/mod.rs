// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! PIN/password login with server-issued session tokens.
//!
//! ## Auth Flow
//!
//! 1. Client posts `{username, pin}` to `/api/auth/login`
//! 2. Server verifies the Argon2id hash and sets the `dibby_session` cookie
//!    (an HS256 JWT with `sub`, `role`, `exp`)
//! 3. Each request:
//!    - Reads the token from the cookie (or `Authorization: Bearer`)
//!    - Verifies signature and expiry
//!    - Reloads the user; inactive or missing users are rejected
//!    - Authorizes against the stored role
//!
//! ## Roles
//!
//! `admin` satisfies every teacher check. Teachers never pass admin checks.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod pin;
pub mod roles;
pub mod session;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{authenticate, AdminOnly, Auth, TeacherOnly};
pub use pin::{hash_pin, verify_pin, PinError};
pub use roles::Role;
pub use session::{SessionKeys, SESSION_COOKIE};
