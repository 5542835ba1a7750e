//! Error types for the certificate expiry check.
//!
//! Errors fall into two disjoint families:
//!
//! - [`ValidationError`]: the check is misconfigured. Detected before any
//!   network activity and reported at WARNING severity.
//! - [`ConnectionError`]: the check ran but could not obtain the server's
//!   certificate. Reported at CRITICAL severity.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Reasons a [`CheckConfiguration`](crate::CheckConfiguration) is rejected.
///
/// The display strings are the user-facing messages printed by the check.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// No hostname was supplied
    #[error("--hostname is required")]
    MissingHostname,

    /// Hostname is not a syntactically valid fully-qualified domain name
    #[error("hostname is not a valid FQDN")]
    InvalidHostname {
        /// The rejected hostname
        hostname: String,
    },

    /// Critical threshold is zero or negative
    #[error("--critical is required")]
    MissingCritical,

    /// Warning threshold is zero or negative
    #[error("--warning is required")]
    MissingWarning,

    /// Warning threshold does not exceed the critical threshold
    #[error("warning cannot be lower than Critical value")]
    InvertedThresholds {
        /// Warning threshold in days
        warning: i64,
        /// Critical threshold in days
        critical: i64,
    },

    /// Trusted CA bundle could not be read or holds no certificates
    #[error("error loading specified CA file {}: {reason}", path.display())]
    CaFileLoad {
        /// Path of the bundle
        path: PathBuf,
        /// Why loading failed
        reason: String,
    },
}

/// Failures while connecting to the server or reading its certificate.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// DNS resolution failed for the given hostname
    #[error("failed to resolve hostname {hostname}: {source}")]
    DnsResolution {
        /// The hostname that failed to resolve
        hostname: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TCP connection failed to the target address
    #[error("connection failed to {address}: {source}")]
    ConnectionFailed {
        /// The address (host:port) that connection failed to
        address: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// Connecting did not finish within the configured timeout
    #[error("connection to {address} timed out after {seconds}s")]
    Timeout {
        /// The address (host:port) that timed out
        address: String,
        /// Configured timeout in seconds
        seconds: u64,
    },

    /// TLS handshake failed, including chain or hostname verification failures
    #[error("TLS handshake failed: {details}")]
    HandshakeFailed {
        /// Details about why the handshake failed
        details: String,
    },

    /// The server's certificate could not be read
    #[error("certificate error: {reason}")]
    CertificateError {
        /// Description of what went wrong
        reason: String,
    },

    /// OpenSSL error while preparing the connection
    #[error("OpenSSL error: {details}")]
    OpenSSLError {
        /// The underlying OpenSSL error
        details: String,
    },
}

impl From<openssl::error::ErrorStack> for ConnectionError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Self::OpenSSLError {
            details: e.to_string(),
        }
    }
}

impl<S> From<openssl::ssl::HandshakeError<S>> for ConnectionError {
    fn from(e: openssl::ssl::HandshakeError<S>) -> Self {
        let details = match e {
            openssl::ssl::HandshakeError::SetupFailure(stack) => stack.to_string(),
            openssl::ssl::HandshakeError::Failure(mid) => describe_ssl_error(mid.error(), mid.ssl()),
            openssl::ssl::HandshakeError::WouldBlock(mid) => {
                describe_ssl_error(mid.error(), mid.ssl())
            }
        };
        Self::HandshakeFailed { details }
    }
}

fn describe_ssl_error(error: &openssl::ssl::Error, ssl: &openssl::ssl::SslRef) -> String {
    let verify = ssl.verify_result();
    if verify != openssl::x509::X509VerifyResult::OK {
        format!("{} ({})", error, verify.error_string())
    } else {
        error.to_string()
    }
}
