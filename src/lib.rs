//! TLS certificate expiry check for monitoring agents.
//!
//! A run validates its [`CheckConfiguration`] into a [`TlsTrustPolicy`], opens
//! one TLS connection with that policy, reads the server's leaf certificate and
//! reports a [`Severity`] from the days left before it expires.
//!
//! ```no_run
//! use check_tls_cert::{run, CheckConfiguration};
//!
//! let config = CheckConfiguration {
//!     hostname: "example.com".to_string(),
//!     warning_days: 30,
//!     critical_days: 7,
//!     ..Default::default()
//! };
//! let outcome = run(&config);
//! println!("{}", outcome);
//! std::process::exit(outcome.exit_code());
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod report;
pub mod severity;
pub mod trust;
pub mod validator;

pub use checker::{classify, CertificateFact, ExpiryChecker};
pub use config::{CheckConfiguration, Config, ConfigError};
pub use error::{ConnectionError, ValidationError};
pub use report::CheckOutcome;
pub use severity::Severity;
pub use trust::{RootCertificates, TlsTrustPolicy};
pub use validator::validate;

/// Validates `config` and, if it is valid, checks the server it names.
///
/// Validation failures are reported at WARNING, connection failures at
/// CRITICAL. Nothing on this path panics.
pub fn run(config: &CheckConfiguration) -> CheckOutcome {
    let policy = match validate(config) {
        Ok(policy) => policy,
        Err(e) => return e.into(),
    };

    ExpiryChecker::new(config.timeout)
        .check(
            &config.hostname,
            config.port,
            &policy,
            config.warning_days,
            config.critical_days,
        )
        .unwrap_or_else(CheckOutcome::from)
}
