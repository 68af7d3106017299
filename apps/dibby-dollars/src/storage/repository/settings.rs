// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! System configuration key/value store with built-in defaults.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc, Weekday};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use crate::models::ConfigEntry;
use crate::storage::ledger::{read_json, to_json, Ledger, LedgerResult, SYSTEM_CONFIG};

pub const INTEREST_RATE: &str = "interest_rate";
pub const RAFFLE_PRIZE_DEFAULT: &str = "raffle_prize_default";
pub const INTEREST_DAY: &str = "interest_day";

/// Built-in configuration: `(key, default value, description)`.
pub const DEFAULTS: [(&str, &str, &str); 3] = [
    (INTEREST_RATE, "2.0", "Weekly interest rate (percentage)"),
    (RAFFLE_PRIZE_DEFAULT, "50", "Default raffle prize amount"),
    (INTEREST_DAY, "sunday", "Day of week for interest calculation"),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSetting {
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

fn default_for(key: &str) -> Option<(&'static str, &'static str)> {
    DEFAULTS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, value, description)| (*value, *description))
}

/// Parse a weekday name ("sunday", "Sun", ...).
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    value.trim().parse::<Weekday>().ok()
}

/// Repository for system configuration.
pub struct SettingsRepository<'a> {
    ledger: &'a Ledger,
}

impl<'a> SettingsRepository<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    pub fn get_stored(&self, key: &str) -> LedgerResult<Option<StoredSetting>> {
        let txn = self.ledger.begin_read()?;
        let table = txn.open_table(SYSTEM_CONFIG)?;
        read_json(&table, key)
    }

    /// Stored value, falling back to the built-in default (empty when the
    /// key is unknown).
    pub fn get(&self, key: &str) -> LedgerResult<String> {
        if let Some(setting) = self.get_stored(key)? {
            return Ok(setting.value);
        }
        Ok(default_for(key).map(|(v, _)| v.to_string()).unwrap_or_default())
    }

    /// Set a value, keeping the existing or default description.
    pub fn set(&self, key: &str, value: &str) -> LedgerResult<()> {
        let txn = self.ledger.begin_write()?;
        {
            let mut table = txn.open_table(SYSTEM_CONFIG)?;
            let existing: Option<StoredSetting> = read_json(&table, key)?;
            let description = existing
                .and_then(|s| s.description)
                .or_else(|| default_for(key).map(|(_, d)| d.to_string()));
            let setting = StoredSetting {
                value: value.to_string(),
                description,
                updated_at: Utc::now(),
            };
            table.insert(key, to_json(&setting)?.as_slice())?;
        }
        txn.commit()?;

        tracing::info!(key, value, "System config updated");
        Ok(())
    }

    /// Defaults merged with stored values.
    pub fn all(&self) -> LedgerResult<BTreeMap<String, ConfigEntry>> {
        let mut config: BTreeMap<String, ConfigEntry> = DEFAULTS
            .iter()
            .map(|(key, value, description)| {
                (
                    key.to_string(),
                    ConfigEntry {
                        value: value.to_string(),
                        description: Some(description.to_string()),
                    },
                )
            })
            .collect();

        let txn = self.ledger.begin_read()?;
        let table = txn.open_table(SYSTEM_CONFIG)?;
        for entry in table.iter()? {
            let (key, value) = entry?;
            let setting: StoredSetting = serde_json::from_slice(value.value())?;
            config.insert(
                key.value().to_string(),
                ConfigEntry {
                    value: setting.value,
                    description: setting.description,
                },
            );
        }
        Ok(config)
    }

    /// Write any missing defaults. Existing values are kept.
    pub fn seed_defaults(&self) -> LedgerResult<usize> {
        let mut written = 0;
        for (key, value, _) in DEFAULTS {
            if self.get_stored(key)?.is_none() {
                self.set(key, value)?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Weekly interest rate in percent. Unparseable values count as 0.
    pub fn interest_rate(&self) -> LedgerResult<f64> {
        Ok(self.get(INTEREST_RATE)?.trim().parse().unwrap_or(0.0))
    }

    /// Default raffle prize. Unparseable values fall back to the built-in default.
    pub fn raffle_prize_default(&self) -> LedgerResult<i64> {
        Ok(self.get(RAFFLE_PRIZE_DEFAULT)?.trim().parse().unwrap_or(50))
    }

    pub fn interest_day(&self) -> LedgerResult<Weekday> {
        Ok(parse_weekday(&self.get(INTEREST_DAY)?).unwrap_or(Weekday::Sun))
    }
}
