// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::StoredUser;

/// Claims carried in the session token.
///
/// The role is informational only: every request reloads the user and
/// authorizes against the stored role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user id, decimal)
    pub sub: String,
    /// Role at issue time
    pub role: Role,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl SessionClaims {
    pub fn user_id(&self) -> Option<u64> {
        self.sub.parse().ok()
    }
}

/// Authenticated user information for the current request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: u64,
    pub username: String,
    /// Role as currently stored
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn from_stored(user: &StoredUser) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    pub fn is_student(&self) -> bool {
        self.role.is_student()
    }
}
