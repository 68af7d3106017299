// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::SessionKeys;
use crate::storage::Ledger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub sessions: Arc<SessionKeys>,
}

impl AppState {
    pub fn new(ledger: Ledger, sessions: SessionKeys) -> Self {
        Self {
            ledger: Arc::new(ledger),
            sessions: Arc::new(sessions),
        }
    }
}
