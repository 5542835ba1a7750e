//! The value a check run reports to the monitoring agent.

use std::fmt;

use serde::Serialize;

use crate::error::{ConnectionError, ValidationError};
use crate::severity::Severity;

/// Severity plus the one-line message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    /// Outcome level
    pub severity: Severity,
    /// Human-readable explanation
    pub message: String,
    /// Whole days until the certificate expires, when a certificate was read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

impl CheckOutcome {
    pub fn new<M: Into<String>>(severity: Severity, message: M) -> Self {
        CheckOutcome {
            severity,
            message: message.into(),
            days_remaining: None,
        }
    }

    /// The check is misconfigured; reported as WARNING.
    pub fn misconfigured<M: fmt::Display>(reason: M) -> Self {
        CheckOutcome::new(Severity::Warning, reason.to_string())
    }

    /// Exit code for the process.
    pub fn exit_code(&self) -> i32 {
        self.severity.exit_code()
    }

    /// JSON object with `status`, `severity`, `output` and, when known,
    /// `days_remaining`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "status": self.exit_code(),
            "severity": self.severity,
            "output": self.message,
        });
        if let Some(days) = self.days_remaining {
            value["days_remaining"] = serde_json::Value::from(days);
        }
        value
    }
}

impl From<ValidationError> for CheckOutcome {
    fn from(e: ValidationError) -> Self {
        CheckOutcome::misconfigured(e)
    }
}

impl From<ConnectionError> for CheckOutcome {
    fn from(e: ConnectionError) -> Self {
        CheckOutcome::new(Severity::Critical, e.to_string())
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}
