//! Severity levels reported to the monitoring agent.

use serde::Serialize;
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// Outcome level of one check run.
///
/// Variants are ordered by seriousness, so `Severity::Critical > Severity::Warning`
/// and the most severe of several candidates is simply their maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Certificate is valid for longer than the warning threshold
    Ok,
    /// Certificate expires within the warning threshold, or the check is misconfigured
    Warning,
    /// Certificate expires within the critical threshold, or the check could not run
    Critical,
}

impl Severity {
    /// Process exit code following the monitoring plugin convention.
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
        }
    }
}
