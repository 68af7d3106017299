// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raffle draw repository.
//!
//! A draw and its prize ledger entry are written in one transaction so a
//! draw never exists without the matching credit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transactions::{insert_entry, NewTransaction, StoredTransaction};
use crate::models::{RaffleDraw, TransactionKind};
use crate::storage::ledger::{
    next_id, read_all_json, to_json, Ledger, LedgerResult, RAFFLE_DRAWS,
};

/// Raffle draw as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRaffleDraw {
    pub id: u64,
    pub draw_date: DateTime<Utc>,
    pub winner_id: u64,
    pub prize_amount: i64,
    pub prize_description: Option<String>,
    pub conducted_by_id: Option<u64>,
}

impl StoredRaffleDraw {
    pub fn to_view(&self, winner_name: Option<String>) -> RaffleDraw {
        RaffleDraw {
            id: self.id,
            draw_date: self.draw_date,
            winner_id: self.winner_id,
            winner_name,
            prize_amount: self.prize_amount,
            prize_description: self.prize_description.clone(),
            conducted_by_id: self.conducted_by_id,
        }
    }
}

/// A committed draw: the draw record, the prize entry and the winner's
/// balance after the credit.
#[derive(Debug, Clone)]
pub struct DrawOutcome {
    pub draw: StoredRaffleDraw,
    pub transaction: StoredTransaction,
    pub new_balance: i64,
}

pub struct RaffleRepository<'a> {
    ledger: &'a Ledger,
}

impl<'a> RaffleRepository<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    /// Record a draw and credit the prize to the winner.
    pub fn record_draw(
        &self,
        winner_id: u64,
        prize_amount: i64,
        prize_description: &str,
        conducted_by_id: u64,
    ) -> LedgerResult<DrawOutcome> {
        let txn = self.ledger.begin_write()?;
        let outcome = {
            let draw = StoredRaffleDraw {
                id: next_id(&txn, "raffle_draws")?,
                draw_date: Utc::now(),
                winner_id,
                prize_amount,
                prize_description: Some(prize_description.to_string()),
                conducted_by_id: Some(conducted_by_id),
            };
            let mut draws = txn.open_table(RAFFLE_DRAWS)?;
            draws.insert(draw.id, to_json(&draw)?.as_slice())?;

            let (transaction, new_balance) = insert_entry(
                &txn,
                NewTransaction {
                    user_id: winner_id,
                    amount: prize_amount,
                    kind: TransactionKind::Raffle,
                    category_id: None,
                    notes: Some(format!("Raffle: {prize_description}")),
                    created_by_id: Some(conducted_by_id),
                },
            )?;
            DrawOutcome {
                draw,
                transaction,
                new_balance,
            }
        };
        txn.commit()?;

        tracing::info!(
            draw_id = outcome.draw.id,
            winner_id,
            prize_amount,
            new_balance = outcome.new_balance,
            "Raffle draw recorded"
        );
        Ok(outcome)
    }

    /// Draws newest first. Returns `(page, total)`.
    pub fn history(&self, limit: usize, offset: usize) -> LedgerResult<(Vec<StoredRaffleDraw>, usize)> {
        let txn = self.ledger.begin_read()?;
        let table = txn.open_table(RAFFLE_DRAWS)?;
        let mut draws: Vec<StoredRaffleDraw> = read_all_json(&table)?;
        draws.reverse();
        let total = draws.len();
        Ok((draws.into_iter().skip(offset).take(limit).collect(), total))
    }
}
