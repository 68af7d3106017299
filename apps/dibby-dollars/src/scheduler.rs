// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Interest Scheduler
//!
//! Background task that drives the savings jobs on the server's local
//! clock:
//!
//! | Job | When |
//! |-----|------|
//! | Daily balance snapshot | every day at 23:55 |
//! | Weekly interest | 23:59 on the configured `interest_day` |
//!
//! The interest day is re-read from the ledger before every sleep, so an
//! admin change applies to the next run without a restart.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; a pending sleep is abandoned
//! as soon as the token is cancelled.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::interest::{calculate_weekly_interest, take_daily_snapshot};
use crate::storage::{Ledger, SettingsRepository};

/// Local time of the daily snapshot.
pub const SNAPSHOT_TIME: (u32, u32) = (23, 55);
/// Local time of the weekly interest run.
pub const INTEREST_TIME: (u32, u32) = (23, 59);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Snapshot,
    Interest,
}

/// Background scheduler for snapshot and interest jobs.
pub struct InterestScheduler {
    ledger: Arc<Ledger>,
}

impl InterestScheduler {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(scheduler.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Interest scheduler starting");

        loop {
            let now_at = Local::now();
            let now = now_at.naive_local();
            let interest_day = match SettingsRepository::new(&self.ledger).interest_day() {
                Ok(day) => day,
                Err(e) => {
                    error!(error = %e, "Failed to read interest day, assuming Sunday");
                    Weekday::Sun
                }
            };
            let (job, at) = next_job(now, interest_day);
            let wait = wait_until(&now_at, at);
            info!(job = ?job, at = %at, "Next scheduled job");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {},
                _ = shutdown.cancelled() => {
                    info!("Interest scheduler shutting down");
                    return;
                }
            }

            self.execute(job, at);
        }
    }

    fn execute(&self, job: Job, at: NaiveDateTime) {
        let today = at.date();
        match job {
            Job::Snapshot => {
                if let Err(e) = take_daily_snapshot(&self.ledger, today) {
                    error!(error = %e, "Daily snapshot failed");
                }
            }
            Job::Interest => match calculate_weekly_interest(&self.ledger, today) {
                Ok(summary) => info!(
                    students = summary.students_receiving_interest,
                    total = summary.total_interest_distributed,
                    skipped = summary.skipped,
                    "Scheduled weekly interest finished"
                ),
                Err(e) => error!(error = %e, "Weekly interest failed"),
            },
        }
    }
}

/// Real time from `now` until wall-clock `at` in the same zone. Ambiguous
/// times resolve to the earlier instant; a time skipped by a forward shift
/// resolves to one hour later.
pub fn wait_until<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveDateTime) -> std::time::Duration {
    let zone = now.timezone();
    let target = zone
        .from_local_datetime(&at)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(at + Duration::hours(1))).earliest());
    match target {
        Some(target) => target
            .signed_duration_since(now.clone())
            .to_std()
            .unwrap_or_default(),
        None => std::time::Duration::ZERO,
    }
}

fn time_of((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Next occurrence of `at` strictly after `now`.
pub fn next_daily(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Next occurrence of `weekday` at `at` strictly after `now`.
pub fn next_weekly(now: NaiveDateTime, weekday: Weekday, at: NaiveTime) -> NaiveDateTime {
    let ahead = (weekday.num_days_from_monday() + 7 - now.weekday().num_days_from_monday()) % 7;
    let candidate = (now.date() + Duration::days(i64::from(ahead))).and_time(at);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

/// The job due soonest after `now`. Snapshot wins ties.
pub fn next_job(now: NaiveDateTime, interest_day: Weekday) -> (Job, NaiveDateTime) {
    let snapshot = next_daily(now, time_of(SNAPSHOT_TIME));
    let interest = next_weekly(now, interest_day, time_of(INTEREST_TIME));
    if interest < snapshot {
        (Job::Interest, interest)
    } else {
        (Job::Snapshot, snapshot)
    }
}
