//! Validation of check parameters.

use log::debug;
use url::Host;

use crate::config::CheckConfiguration;
use crate::error::ValidationError;
use crate::trust::{load_ca_bundle, RootCertificates, TlsTrustPolicy};

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 253;

/// Validates `config` and derives the trust policy for the connection.
///
/// Checks run in a fixed order and stop at the first failure: hostname,
/// thresholds, then the CA bundle. The only side effect is reading the CA
/// bundle when one is configured.
///
/// ```
/// # use check_tls_cert::{validate, CheckConfiguration, ValidationError};
/// let config = CheckConfiguration {
///     hostname: "example.com".to_string(),
///     warning_days: 7,
///     critical_days: 7,
///     ..Default::default()
/// };
/// assert!(matches!(
///     validate(&config),
///     Err(ValidationError::InvertedThresholds { .. })
/// ));
/// ```
pub fn validate(config: &CheckConfiguration) -> Result<TlsTrustPolicy, ValidationError> {
    if config.hostname.is_empty() {
        return Err(ValidationError::MissingHostname);
    }
    if !is_fqdn(&config.hostname) {
        return Err(ValidationError::InvalidHostname {
            hostname: config.hostname.clone(),
        });
    }
    if config.critical_days <= 0 {
        return Err(ValidationError::MissingCritical);
    }
    if config.warning_days <= 0 {
        return Err(ValidationError::MissingWarning);
    }
    if config.warning_days <= config.critical_days {
        return Err(ValidationError::InvertedThresholds {
            warning: config.warning_days,
            critical: config.critical_days,
        });
    }

    let root_certificates = match &config.trusted_ca_file {
        Some(path) if !path.as_os_str().is_empty() => {
            let certificates =
                load_ca_bundle(path).map_err(|e| ValidationError::CaFileLoad {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            RootCertificates::Bundle(certificates)
        }
        _ => RootCertificates::Platform,
    };

    debug!(
        "configuration for {}:{} is valid (warning {}d, critical {}d)",
        config.hostname, config.port, config.warning_days, config.critical_days
    );

    Ok(TlsTrustPolicy::new(
        root_certificates,
        config.insecure_skip_verify,
    ))
}

/// Syntactic check for a fully-qualified domain name. No DNS lookup happens.
///
/// At least two labels are required, the last one starting with a letter, so
/// single-label names and IP literals are rejected. One trailing dot is allowed.
pub fn is_fqdn(hostname: &str) -> bool {
    let name = hostname.strip_suffix('.').unwrap_or(hostname);
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }

    // Rejects forbidden code points and IP literals.
    match Host::parse(name) {
        Ok(Host::Domain(_)) => {}
        _ => return false,
    }

    let labels: Vec<&str> = name.split('.').collect();
    let (tld, rest) = match labels.split_last() {
        Some((tld, rest)) if !rest.is_empty() => (tld, rest),
        _ => return false,
    };

    rest.iter().all(|label| is_label(label))
        && is_label(tld)
        && tld.starts_with(|c: char| c.is_ascii_alphabetic())
        && tld.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label.starts_with(|c: char| c.is_ascii_alphanumeric())
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
