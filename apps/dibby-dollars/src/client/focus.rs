// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Focus behavior editor: a teacher's 3-5 quick-award behaviors.
//!
//! The saved order is always catalog order filtered to the selection,
//! whatever order the teacher clicked in. A catalog smaller than the minimum
//! leaves the editor inert.

use std::{collections::BTreeSet, future::Future};

use crate::{
    models::{Behavior, BehaviorListResponse, FocusResponse, MessageResponse},
    storage::repository::{MAX_FOCUS_BEHAVIORS, MIN_FOCUS_BEHAVIORS},
};

use super::{
    gateway::{ApiClient, ApiResult},
    notice::{settle, Notice},
    workflow::Submission,
};

pub trait FocusBackend {
    fn load_catalog(&self) -> impl Future<Output = ApiResult<BehaviorListResponse>> + Send;
    fn current_focus(&self) -> impl Future<Output = ApiResult<FocusResponse>> + Send;
    fn save_focus(
        &self,
        behavior_ids: Vec<u64>,
    ) -> impl Future<Output = ApiResult<MessageResponse>> + Send;
}

impl FocusBackend for ApiClient {
    async fn load_catalog(&self) -> ApiResult<BehaviorListResponse> {
        self.list_behaviors().await
    }

    async fn current_focus(&self) -> ApiResult<FocusResponse> {
        self.my_focus().await
    }

    async fn save_focus(&self, behavior_ids: Vec<u64>) -> ApiResult<MessageResponse> {
        self.set_my_focus(&behavior_ids).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FocusError {
    #[error("Select at least {} focus behaviors", MIN_FOCUS_BEHAVIORS)]
    TooFew(usize),

    #[error("Maximum {} focus behaviors allowed", MAX_FOCUS_BEHAVIORS)]
    TooMany(usize),
}

#[derive(Debug, Default)]
pub struct FocusEditor {
    catalog: Vec<Behavior>,
    selected: BTreeSet<u64>,
    saving: bool,
    notices: Vec<Notice>,
}

impl FocusEditor {
    /// Editor over `catalog`, pre-selecting the current focus entries that
    /// are still in the catalog.
    pub fn new(catalog: Vec<Behavior>, current: &[Behavior]) -> Self {
        let selected = current
            .iter()
            .filter(|b| catalog.iter().any(|c| c.id == b.id))
            .map(|b| b.id)
            .collect();
        Self {
            catalog,
            selected,
            saving: false,
            notices: Vec::new(),
        }
    }

    /// Fetch the catalog and current focus.
    pub async fn load<B: FocusBackend>(backend: &B) -> Result<Self, String> {
        let catalog = settle(backend.load_catalog().await, "Failed to load behaviors")?;
        let current = settle(backend.current_focus().await, "Failed to load focus behaviors")?;
        Ok(Self::new(catalog.behaviors, &current.focus_behaviors))
    }

    pub fn catalog(&self) -> &[Behavior] {
        &self.catalog
    }

    /// Too few behaviors exist to choose from.
    pub fn is_inert(&self) -> bool {
        self.catalog.len() < MIN_FOCUS_BEHAVIORS
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_selected(&self, behavior_id: u64) -> bool {
        self.selected.contains(&behavior_id)
    }

    /// Flip one behavior. Unknown ids and an inert editor are ignored.
    pub fn toggle(&mut self, behavior_id: u64) -> bool {
        if self.is_inert() || !self.catalog.iter().any(|b| b.id == behavior_id) {
            return false;
        }
        if !self.selected.remove(&behavior_id) {
            self.selected.insert(behavior_id);
        }
        true
    }

    /// Selected behaviors in catalog order.
    pub fn focus_behaviors(&self) -> Vec<Behavior> {
        self.catalog
            .iter()
            .filter(|b| self.selected.contains(&b.id))
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> Result<Vec<u64>, FocusError> {
        let count = self.selected.len();
        if count < MIN_FOCUS_BEHAVIORS {
            return Err(FocusError::TooFew(count));
        }
        if count > MAX_FOCUS_BEHAVIORS {
            return Err(FocusError::TooMany(count));
        }
        Ok(self.focus_behaviors().iter().map(|b| b.id).collect())
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub async fn save<B: FocusBackend>(&mut self, backend: &B) -> Submission {
        if self.saving {
            return Submission::Busy;
        }
        if self.is_inert() {
            return Submission::Invalid;
        }
        let ids = match self.validate() {
            Ok(ids) => ids,
            Err(e) => {
                self.notices.push(Notice::error(e.to_string()));
                return Submission::Invalid;
            }
        };

        self.saving = true;
        let result = settle(
            backend.save_focus(ids).await,
            "Failed to save focus behaviors",
        );
        self.saving = false;

        match result {
            Ok(response) => {
                self.notices.push(Notice::success(response.message));
                Submission::Completed
            }
            Err(message) => {
                self.notices.push(Notice::error(message));
                Submission::Failed
            }
        }
    }
}
