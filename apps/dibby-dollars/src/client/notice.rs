// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dismissible user-facing messages produced at the workflow boundary.

use super::gateway::{ApiOutcome, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Collapse a call result to the accepted payload or a single failure
/// message: the server's own text when it sent one, `fallback` otherwise.
pub(crate) fn settle<T>(result: ApiResult<T>, fallback: &str) -> Result<T, String> {
    match result {
        Ok(ApiOutcome::Accepted(value)) => Ok(value),
        Ok(ApiOutcome::Rejected(message)) => Err(message.unwrap_or_else(|| fallback.to_string())),
        Err(e) => {
            tracing::debug!(error = %e, "Client call failed");
            Err(e.server_message().unwrap_or(fallback).to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::gateway::ClientError;

    #[test]
    fn settle_prefers_server_text() {
        assert_eq!(settle(Ok(ApiOutcome::Accepted(3)), "nope"), Ok(3));
        assert_eq!(
            settle::<()>(Ok(ApiOutcome::Rejected(Some("Student not found".into()))), "nope"),
            Err("Student not found".to_string())
        );
        assert_eq!(
            settle::<()>(Ok(ApiOutcome::Rejected(None)), "nope"),
            Err("nope".to_string())
        );
        let err = ClientError::Status {
            status: 403,
            message: Some("Teacher access required".into()),
        };
        assert_eq!(
            settle::<()>(Err(err), "nope"),
            Err("Teacher access required".to_string())
        );
        let err = ClientError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(settle::<()>(Err(err), "nope"), Err("nope".to_string()));
    }
}
