//! Reads the server certificate and classifies its expiry.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use log::{debug, warn};
use openssl::asn1::Asn1Time;
use openssl::ssl::{HandshakeError, SslRef};
use openssl::x509::{X509Ref, X509};

use crate::error::ConnectionError;
use crate::report::CheckOutcome;
use crate::severity::Severity;
use crate::trust::TlsTrustPolicy;

/// Expiry of the server's leaf certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateFact {
    pub not_after: DateTime<Utc>,
}

impl CertificateFact {
    pub fn from_x509(certificate: &X509Ref) -> Result<Self, ConnectionError> {
        let epoch = Asn1Time::from_unix(0)?;
        let diff = epoch.diff(certificate.not_after())?;
        let seconds = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
        let not_after = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| ConnectionError::CertificateError {
                reason: format!("notAfter out of range: {}", certificate.not_after()),
            })?;
        Ok(CertificateFact { not_after })
    }

    /// Whole days left, truncated toward zero: 47 hours is 1 day.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.not_after - now).num_hours() / 24
    }

    /// True when `now` plus `days` reaches or passes `not_after`.
    fn expires_within(&self, now: DateTime<Utc>, days: i64) -> bool {
        match TimeDelta::try_days(days).and_then(|window| now.checked_add_signed(window)) {
            Some(deadline) => deadline >= self.not_after,
            None => days > 0,
        }
    }
}

/// Maps a certificate's expiry to a severity, critical bound first.
pub fn classify(
    fact: &CertificateFact,
    now: DateTime<Utc>,
    hostname: &str,
    port: u16,
    warning_days: i64,
    critical_days: i64,
) -> CheckOutcome {
    let days = fact.days_remaining(now);

    let (severity, message) = if fact.expires_within(now, critical_days) {
        (Severity::Critical, format!("cert expires in {} days", days))
    } else if fact.expires_within(now, warning_days) {
        (Severity::Warning, format!("cert expires in {} days", days))
    } else {
        (
            Severity::Ok,
            format!(
                "certificate for {}:{} expires in {} days",
                hostname, port, days
            ),
        )
    };
    debug!("{}:{} not after {}: {}", hostname, port, fact.not_after, severity);

    CheckOutcome {
        severity,
        message,
        days_remaining: Some(days),
    }
}

/// Connects to a server and reports how close its certificate is to expiry.
///
/// One TCP connection and one handshake per call; there are no retries.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryChecker {
    timeout: Duration,
}

impl ExpiryChecker {
    /// `timeout` bounds connecting, reading and writing. Zero disables it.
    pub fn new(timeout: Duration) -> Self {
        ExpiryChecker { timeout }
    }

    /// Checks the certificate of `hostname:port` against the thresholds.
    ///
    /// The connection is made with exactly `policy`: its root certificates are
    /// the trust anchors and its skip-verify flag disables chain and hostname
    /// verification.
    pub fn check(
        &self,
        hostname: &str,
        port: u16,
        policy: &TlsTrustPolicy,
        warning_days: i64,
        critical_days: i64,
    ) -> Result<CheckOutcome, ConnectionError> {
        let fact = self.fetch(hostname, port, policy)?;
        Ok(classify(
            &fact,
            Utc::now(),
            hostname,
            port,
            warning_days,
            critical_days,
        ))
    }

    /// Performs the handshake and returns the leaf certificate's expiry.
    ///
    /// The stream is shut down and dropped before returning, whatever the result.
    pub fn fetch(
        &self,
        hostname: &str,
        port: u16,
        policy: &TlsTrustPolicy,
    ) -> Result<CertificateFact, ConnectionError> {
        let tcp_stream = self.connect(hostname, port)?;
        self.read_certificate(hostname, port, tcp_stream, policy)
    }

    /// Handshakes over an already connected stream and reads the leaf's expiry.
    ///
    /// One trailing dot is dropped from `hostname` for SNI and hostname
    /// verification, since certificates never name the absolute form.
    pub fn read_certificate(
        &self,
        hostname: &str,
        port: u16,
        tcp_stream: TcpStream,
        policy: &TlsTrustPolicy,
    ) -> Result<CertificateFact, ConnectionError> {
        let connector = policy.connector()?;
        let mut configuration = connector.configure()?;
        if policy.insecure_skip_verify() {
            configuration.set_verify_hostname(false);
        }

        let server_name = hostname.strip_suffix('.').unwrap_or(hostname);
        let mut stream = configuration
            .connect(server_name, tcp_stream)
            .map_err(|e| self.handshake_error(hostname, port, e))?;
        debug!(
            "handshake with {}:{} complete ({})",
            hostname,
            port,
            stream.ssl().version_str()
        );

        let fact =
            leaf_certificate(stream.ssl()).and_then(|cert| CertificateFact::from_x509(&cert));
        if let Err(e) = stream.shutdown() {
            debug!("TLS shutdown with {}:{} failed: {}", hostname, port, e);
        }
        fact
    }

    /// A handshake that stalls until the read timeout is a timeout, not a TLS failure.
    fn handshake_error(
        &self,
        hostname: &str,
        port: u16,
        e: HandshakeError<TcpStream>,
    ) -> ConnectionError {
        let timed_out = match &e {
            HandshakeError::Failure(mid) | HandshakeError::WouldBlock(mid) => mid
                .error()
                .io_error()
                .map_or(false, |io| {
                    matches!(io.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
                }),
            HandshakeError::SetupFailure(_) => false,
        };
        if timed_out {
            ConnectionError::Timeout {
                address: format!("{}:{}", hostname, port),
                seconds: self.timeout.as_secs(),
            }
        } else {
            e.into()
        }
    }

    fn connect(&self, hostname: &str, port: u16) -> Result<TcpStream, ConnectionError> {
        let address = format!("{}:{}", hostname, port);
        let socket_addrs: Vec<SocketAddr> = (hostname, port)
            .to_socket_addrs()
            .map_err(|source| ConnectionError::DnsResolution {
                hostname: hostname.to_string(),
                source,
            })?
            .collect();
        if socket_addrs.is_empty() {
            return Err(ConnectionError::DnsResolution {
                hostname: hostname.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
            });
        }

        let timeout = (!self.timeout.is_zero()).then_some(self.timeout);
        let mut last_error = None;
        for socket_addr in socket_addrs {
            debug!("connecting to {} ({})", address, socket_addr);
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&socket_addr, timeout),
                None => TcpStream::connect(socket_addr),
            };
            match attempt {
                Ok(stream) => {
                    stream
                        .set_read_timeout(timeout)
                        .and_then(|_| stream.set_write_timeout(timeout))
                        .map_err(|source| ConnectionError::ConnectionFailed {
                            address: address.clone(),
                            source,
                        })?;
                    return Ok(stream);
                }
                Err(e) => {
                    warn!("connection to {} failed: {}", socket_addr, e);
                    last_error = Some(e);
                }
            }
        }

        let source = last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses found"));
        if source.kind() == io::ErrorKind::TimedOut {
            Err(ConnectionError::Timeout {
                address,
                seconds: self.timeout.as_secs(),
            })
        } else {
            Err(ConnectionError::ConnectionFailed { address, source })
        }
    }
}

/// First certificate the server presented.
///
/// On the client side OpenSSL keeps the leaf at index 0 of the peer chain. The
/// chain is not kept for resumed sessions, so `peer_certificate`, which is
/// always the leaf, covers that case.
fn leaf_certificate(ssl: &SslRef) -> Result<X509, ConnectionError> {
    ssl.peer_cert_chain()
        .and_then(|chain| chain.get(0))
        .map(|cert| cert.to_owned())
        .or_else(|| ssl.peer_certificate())
        .ok_or_else(|| ConnectionError::CertificateError {
            reason: "server presented no certificate".to_string(),
        })
}
