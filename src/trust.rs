//! TLS trust policy derived from a validated configuration.

use std::fs;
use std::path::Path;

use log::debug;
use openssl::error::ErrorStack;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;
use thiserror::Error;

/// Certificate authorities accepted when verifying the server's chain.
#[derive(Debug, Clone)]
pub enum RootCertificates {
    /// The platform's default trust store
    Platform,
    /// Certificates loaded from a PEM bundle; replaces the platform store
    Bundle(Vec<X509>),
}

/// How the expiry checker trusts the server it connects to.
///
/// Built by [`validate`](crate::validate) and handed to
/// [`ExpiryChecker::check`](crate::ExpiryChecker::check) for the connection.
#[derive(Debug, Clone)]
pub struct TlsTrustPolicy {
    root_certificates: RootCertificates,
    insecure_skip_verify: bool,
}

impl TlsTrustPolicy {
    pub fn new(root_certificates: RootCertificates, insecure_skip_verify: bool) -> Self {
        TlsTrustPolicy {
            root_certificates,
            insecure_skip_verify,
        }
    }

    /// Platform trust store with verification enabled.
    pub fn platform() -> Self {
        TlsTrustPolicy::new(RootCertificates::Platform, false)
    }

    pub fn root_certificates(&self) -> &RootCertificates {
        &self.root_certificates
    }

    pub fn insecure_skip_verify(&self) -> bool {
        self.insecure_skip_verify
    }

    /// Builds an OpenSSL connector that applies this policy.
    ///
    /// A bundle replaces the default verify paths; skipping verification turns
    /// off peer verification entirely.
    pub fn connector(&self) -> Result<SslConnector, ErrorStack> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())?;

        if let RootCertificates::Bundle(certificates) = &self.root_certificates {
            let mut store = X509StoreBuilder::new()?;
            for certificate in certificates {
                store.add_cert(certificate.clone())?;
            }
            builder.set_cert_store(store.build());
        }

        if self.insecure_skip_verify {
            builder.set_verify(SslVerifyMode::NONE);
        } else {
            builder.set_verify(SslVerifyMode::PEER);
        }

        Ok(builder.build())
    }
}

/// Reasons a CA bundle cannot be used.
#[derive(Debug, Error)]
pub enum CaBundleError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid PEM data: {0}")]
    Pem(#[from] ErrorStack),
    #[error("no certificates found")]
    Empty,
}

/// Reads every certificate from a PEM bundle.
pub fn load_ca_bundle(path: &Path) -> Result<Vec<X509>, CaBundleError> {
    let pem = fs::read(path)?;
    let certificates = X509::stack_from_pem(&pem)?;
    if certificates.is_empty() {
        return Err(CaBundleError::Empty);
    }
    debug!(
        "loaded {} CA certificate(s) from {}",
        certificates.len(),
        path.display()
    );
    Ok(certificates)
}
