// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Teacher desk: roster, selection and the balance-changing actions.
//!
//! Awards, deposits and raffle draws follow the same protocol:
//!
//! 1. Validate locally; on failure emit one notice and make no call
//! 2. Mark the action busy; a second submission while busy is refused
//! 3. Send the intent
//! 4. On acceptance, replace the cached balance with the server's value
//!    through [`TeacherDesk::apply_balance`], which updates the roster entry
//!    and the selected student together
//! 5. On any failure, emit one notice and leave every cached value untouched
//!
//! Balances are never adjusted ahead of the server's answer.

use std::{collections::HashSet, future::Future};

use crate::models::{
    AwardRequest, Behavior, CreateStudentRequest, DepositRequest, FocusResponse,
    LedgerEntryResponse, RaffleDrawRequest, RaffleDrawResponse, StudentListResponse,
    StudentResponse, UserProfile,
};

use super::{
    gateway::{ApiClient, ApiResult, StudentFilter},
    notice::{settle, Notice},
};

pub const SELECT_STUDENT_FIRST: &str = "Please select a student first";
const AWARD_FAILED: &str = "Failed to award DB$";
const DEPOSIT_FAILED: &str = "Failed to deposit";
const RAFFLE_FAILED: &str = "Failed to conduct raffle";
const CREATE_STUDENT_FAILED: &str = "Failed to create student";
const INVALID_AMOUNT: &str = "Invalid amount";
const INVALID_PRIZE: &str = "Invalid prize amount";
/// Prize pre-filled in the raffle dialog.
const DEFAULT_RAFFLE_PRIZE_INPUT: &str = "50";

/// Server operations the desk needs.
pub trait DeskBackend {
    fn load_roster(&self) -> impl Future<Output = ApiResult<StudentListResponse>> + Send;
    fn load_focus(&self) -> impl Future<Output = ApiResult<FocusResponse>> + Send;
    fn submit_award(
        &self,
        request: AwardRequest,
    ) -> impl Future<Output = ApiResult<LedgerEntryResponse>> + Send;
    fn submit_deposit(
        &self,
        request: DepositRequest,
    ) -> impl Future<Output = ApiResult<LedgerEntryResponse>> + Send;
    fn submit_raffle(
        &self,
        request: RaffleDrawRequest,
    ) -> impl Future<Output = ApiResult<RaffleDrawResponse>> + Send;
    fn submit_student(
        &self,
        request: CreateStudentRequest,
    ) -> impl Future<Output = ApiResult<StudentResponse>> + Send;
}

impl DeskBackend for ApiClient {
    async fn load_roster(&self) -> ApiResult<StudentListResponse> {
        let filter = StudentFilter {
            class_name: None,
            include_balance: true,
        };
        self.list_students(&filter).await
    }

    async fn load_focus(&self) -> ApiResult<FocusResponse> {
        self.my_focus().await
    }

    async fn submit_award(&self, request: AwardRequest) -> ApiResult<LedgerEntryResponse> {
        self.award(&request).await
    }

    async fn submit_deposit(&self, request: DepositRequest) -> ApiResult<LedgerEntryResponse> {
        self.deposit(&request).await
    }

    async fn submit_raffle(&self, request: RaffleDrawRequest) -> ApiResult<RaffleDrawResponse> {
        self.raffle_draw(&request).await
    }

    async fn submit_student(&self, request: CreateStudentRequest) -> ApiResult<StudentResponse> {
        self.create_student(&request).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Load,
    Award,
    Deposit,
    Raffle,
    CreateStudent,
}

/// What happened to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Completed,
    /// Rejected locally; no call was made.
    Invalid,
    /// The call failed or was rejected by the server.
    Failed,
    /// The same action is still in flight.
    Busy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositDialog {
    pub open: bool,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaffleResult {
    pub winner: UserProfile,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaffleDialog {
    pub open: bool,
    pub prize: String,
    pub description: String,
    /// Kept for display until the dialog closes.
    pub result: Option<RaffleResult>,
}

impl Default for RaffleDialog {
    fn default() -> Self {
        Self {
            open: false,
            prize: DEFAULT_RAFFLE_PRIZE_INPUT.to_string(),
            description: String::new(),
            result: None,
        }
    }
}

/// Create-student form as typed by the teacher.
#[derive(Debug, Clone, Default)]
pub struct StudentForm {
    pub first_name: String,
    pub last_name: String,
    pub class_name: String,
    pub pin: String,
}

/// PIN rule for student accounts: 4 to 6 ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    (4..=6).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit())
}

pub struct TeacherDesk<B> {
    backend: B,
    roster: Vec<UserProfile>,
    focus: Vec<Behavior>,
    selected: Option<UserProfile>,
    deposit: DepositDialog,
    raffle: RaffleDialog,
    busy: HashSet<Action>,
    notices: Vec<Notice>,
}

impl<B: DeskBackend> TeacherDesk<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            roster: Vec::new(),
            focus: Vec::new(),
            selected: None,
            deposit: DepositDialog::default(),
            raffle: RaffleDialog::default(),
            busy: HashSet::new(),
            notices: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn roster(&self) -> &[UserProfile] {
        &self.roster
    }

    pub fn focus_behaviors(&self) -> &[Behavior] {
        &self.focus
    }

    pub fn replace_focus(&mut self, focus: Vec<Behavior>) {
        self.focus = focus;
    }

    pub fn selected(&self) -> Option<&UserProfile> {
        self.selected.as_ref()
    }

    pub fn deposit_dialog(&self) -> &DepositDialog {
        &self.deposit
    }

    pub fn raffle_dialog(&self) -> &RaffleDialog {
        &self.raffle
    }

    pub fn is_busy(&self, action: Action) -> bool {
        self.busy.contains(&action)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn begin(&mut self, action: Action) -> bool {
        self.busy.insert(action)
    }

    fn finish(&mut self, action: Action) {
        self.busy.remove(&action);
    }

    fn cached_balance(&self, student_id: u64) -> Option<i64> {
        self.roster
            .iter()
            .find(|s| s.id == student_id)
            .and_then(|s| s.balance)
    }

    /// Replace a student's cached balance in the roster and the selection.
    pub fn apply_balance(&mut self, student_id: u64, balance: i64) {
        if let Some(entry) = self.roster.iter_mut().find(|s| s.id == student_id) {
            entry.balance = Some(balance);
        }
        if let Some(selected) = self.selected.as_mut().filter(|s| s.id == student_id) {
            selected.balance = Some(balance);
        }
    }

    /// Fetch the roster (with balances) and this teacher's focus behaviors.
    pub async fn load(&mut self) -> Submission {
        if !self.begin(Action::Load) {
            return Submission::Busy;
        }
        let mut outcome = Submission::Completed;

        match settle(self.backend.load_roster().await, "Failed to load students") {
            Ok(response) => {
                self.roster = response.students;
                if let Some(id) = self.selected.as_ref().map(|s| s.id) {
                    self.selected = self.roster.iter().find(|s| s.id == id).cloned();
                }
            }
            Err(message) => {
                self.notices.push(Notice::error(message));
                outcome = Submission::Failed;
            }
        }
        match settle(self.backend.load_focus().await, "Failed to load focus behaviors") {
            Ok(response) => self.focus = response.focus_behaviors,
            Err(message) => {
                self.notices.push(Notice::error(message));
                outcome = Submission::Failed;
            }
        }

        self.finish(Action::Load);
        outcome
    }

    /// Select a roster entry, or clear the selection with `None`.
    /// Returns false when the id is not on the roster.
    pub fn select(&mut self, student_id: Option<u64>) -> bool {
        match student_id {
            None => {
                self.selected = None;
                true
            }
            Some(id) => match self.roster.iter().find(|s| s.id == id) {
                Some(student) => {
                    self.selected = Some(student.clone());
                    true
                }
                None => false,
            },
        }
    }

    // =========================================================================
    // Award
    // =========================================================================

    /// Award 1 DB$ to the selected student.
    pub async fn award(&mut self, behavior_id: Option<u64>, notes: Option<String>) -> Submission {
        if self.is_busy(Action::Award) {
            return Submission::Busy;
        }
        let Some(student) = self.selected.clone() else {
            self.notices.push(Notice::error(SELECT_STUDENT_FIRST));
            return Submission::Invalid;
        };

        self.begin(Action::Award);
        let request = AwardRequest {
            student_id: Some(student.id),
            behavior_id,
            notes: notes.filter(|n| !n.trim().is_empty()),
        };
        let result = settle(self.backend.submit_award(request).await, AWARD_FAILED);
        self.finish(Action::Award);

        match result {
            Ok(response) => {
                self.apply_balance(student.id, response.new_balance);
                self.notices.push(Notice::success(format!(
                    "Awarded 1 DB$ to {}!",
                    student.full_name
                )));
                tracing::debug!(student_id = student.id, balance = response.new_balance, "Award applied");
                Submission::Completed
            }
            Err(message) => {
                self.notices.push(Notice::error(message));
                Submission::Failed
            }
        }
    }

    // =========================================================================
    // Deposit
    // =========================================================================

    pub fn open_deposit(&mut self) {
        self.deposit.open = true;
    }

    pub fn set_deposit_amount(&mut self, amount: impl Into<String>) {
        self.deposit.amount = amount.into();
    }

    pub fn close_deposit(&mut self) {
        self.deposit = DepositDialog::default();
    }

    /// Deposit the amount typed in the dialog for the selected student.
    pub async fn submit_deposit(&mut self) -> Submission {
        if self.is_busy(Action::Deposit) {
            return Submission::Busy;
        }
        let Some(student) = self.selected.clone() else {
            self.notices.push(Notice::error(SELECT_STUDENT_FIRST));
            return Submission::Invalid;
        };
        let amount = match self.deposit.amount.trim().parse::<i64>() {
            Ok(amount) if amount > 0 => amount,
            _ => {
                self.notices.push(Notice::error(INVALID_AMOUNT));
                return Submission::Invalid;
            }
        };

        self.begin(Action::Deposit);
        let request = DepositRequest {
            student_id: Some(student.id),
            amount: Some(amount),
            notes: None,
        };
        let result = settle(self.backend.submit_deposit(request).await, DEPOSIT_FAILED);
        self.finish(Action::Deposit);

        match result {
            Ok(response) => {
                self.apply_balance(student.id, response.new_balance);
                self.notices.push(Notice::success(format!(
                    "Deposited {amount} DB$ for {}!",
                    student.full_name
                )));
                self.close_deposit();
                Submission::Completed
            }
            Err(message) => {
                self.notices.push(Notice::error(message));
                Submission::Failed
            }
        }
    }

    // =========================================================================
    // Raffle
    // =========================================================================

    pub fn open_raffle(&mut self) {
        self.raffle.open = true;
    }

    pub fn set_raffle_prize(&mut self, prize: impl Into<String>) {
        self.raffle.prize = prize.into();
    }

    pub fn set_raffle_description(&mut self, description: impl Into<String>) {
        self.raffle.description = description.into();
    }

    /// Close the dialog and drop the displayed result.
    pub fn close_raffle(&mut self) {
        self.raffle = RaffleDialog::default();
    }

    /// Draw a winner. An empty prize field lets the server use its default.
    pub async fn draw_raffle(&mut self) -> Submission {
        if self.is_busy(Action::Raffle) {
            return Submission::Busy;
        }
        let prize_input = self.raffle.prize.trim();
        let prize_amount = if prize_input.is_empty() {
            None
        } else {
            match prize_input.parse::<i64>() {
                Ok(prize) if prize > 0 => Some(prize),
                _ => {
                    self.notices.push(Notice::error(INVALID_PRIZE));
                    return Submission::Invalid;
                }
            }
        };
        let description = self.raffle.description.trim();
        let request = RaffleDrawRequest {
            prize_amount,
            prize_description: (!description.is_empty()).then(|| description.to_string()),
        };

        self.begin(Action::Raffle);
        let result = settle(self.backend.submit_raffle(request).await, RAFFLE_FAILED);
        self.finish(Action::Raffle);

        match result {
            Ok(response) => {
                let amount = response.raffle.prize_amount;
                let mut winner = response.winner;
                let balance = match winner.balance {
                    Some(balance) => balance,
                    None => self.cached_balance(winner.id).unwrap_or(0) + amount,
                };
                winner.balance = Some(balance);
                self.apply_balance(winner.id, balance);
                self.raffle.result = Some(RaffleResult { winner, amount });
                Submission::Completed
            }
            Err(message) => {
                self.notices.push(Notice::error(message));
                Submission::Failed
            }
        }
    }

    // =========================================================================
    // Roster management
    // =========================================================================

    pub async fn create_student(&mut self, form: StudentForm) -> Submission {
        if self.is_busy(Action::CreateStudent) {
            return Submission::Busy;
        }
        let first_name = form.first_name.trim();
        let last_name = form.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            self.notices
                .push(Notice::error("First and last name are required"));
            return Submission::Invalid;
        }
        if !is_valid_pin(form.pin.trim()) {
            self.notices.push(Notice::error("PIN must be 4-6 digits"));
            return Submission::Invalid;
        }
        let class_name = form.class_name.trim();
        let request = CreateStudentRequest {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            class_name: (!class_name.is_empty()).then(|| class_name.to_string()),
            pin: form.pin.trim().to_string(),
        };

        self.begin(Action::CreateStudent);
        let result = settle(
            self.backend.submit_student(request).await,
            CREATE_STUDENT_FAILED,
        );
        self.finish(Action::CreateStudent);

        match result {
            Ok(response) => {
                let mut student = response.student;
                student.balance.get_or_insert(0);
                self.notices.push(Notice::success(format!(
                    "Created {} ({})",
                    student.full_name, student.username
                )));
                self.roster.push(student);
                Submission::Completed
            }
            Err(message) => {
                self.notices.push(Notice::error(message));
                Submission::Failed
            }
        }
    }
}
