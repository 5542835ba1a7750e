//! Local TLS servers with generated certificates for integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::ssl::{SslAcceptor, SslMethod};
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
};
use openssl::x509::{X509Name, X509NameBuilder, X509Ref, X509};
use tempfile::NamedTempFile;

/// Keeps the certificate's day count stable while the test runs.
const EXPIRY_MARGIN_SECS: i64 = 120;

pub fn new_key() -> PKey<Private> {
    let rsa = Rsa::generate(2048).unwrap();
    PKey::from_rsa(rsa).unwrap()
}

fn name(common_name: &str, organization: &str) -> X509Name {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("O", organization).unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    name.build()
}

fn not_after_in_days(days: i64) -> Asn1Time {
    Asn1Time::from_unix(Utc::now().timestamp() + days * 86_400 + EXPIRY_MARGIN_SECS).unwrap()
}

fn an_hour_ago() -> Asn1Time {
    Asn1Time::from_unix(Utc::now().timestamp() - 3_600).unwrap()
}

/// Self-signed CA certificate valid for a year.
pub fn ca_certificate() -> (X509, PKey<Private>) {
    let key = new_key();
    let name = name("Test CA", "Test CA");

    let mut cert = X509::builder().unwrap();
    cert.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    cert.set_serial_number(&serial).unwrap();
    cert.set_subject_name(&name).unwrap();
    cert.set_issuer_name(&name).unwrap();
    cert.set_pubkey(&key).unwrap();
    cert.set_not_before(&an_hour_ago()).unwrap();
    cert.set_not_after(&not_after_in_days(365)).unwrap();
    cert.append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    cert.append_extension(
        KeyUsage::new()
            .critical()
            .key_cert_sign()
            .crl_sign()
            .build()
            .unwrap(),
    )
    .unwrap();
    cert.sign(&key, MessageDigest::sha256()).unwrap();

    (cert.build(), key)
}

/// Server certificate for `localhost` and `127.0.0.1` expiring in `days`.
///
/// Signed by `issuer` when given, self-signed otherwise.
pub fn server_certificate(
    days: i64,
    issuer: Option<(&X509, &PKey<Private>)>,
) -> (X509, PKey<Private>) {
    let key = new_key();
    let subject = name("localhost", "Test Server");

    let mut cert = X509::builder().unwrap();
    cert.set_version(2).unwrap();
    let serial = BigNum::from_u32(2).unwrap().to_asn1_integer().unwrap();
    cert.set_serial_number(&serial).unwrap();
    cert.set_subject_name(&subject).unwrap();
    match issuer {
        Some((ca, _)) => cert.set_issuer_name(ca.subject_name()).unwrap(),
        None => cert.set_issuer_name(&subject).unwrap(),
    }
    cert.set_pubkey(&key).unwrap();
    cert.set_not_before(&an_hour_ago()).unwrap();
    cert.set_not_after(&not_after_in_days(days)).unwrap();
    cert.append_extension(
        KeyUsage::new()
            .digital_signature()
            .key_encipherment()
            .build()
            .unwrap(),
    )
    .unwrap();
    cert.append_extension(ExtendedKeyUsage::new().server_auth().build().unwrap())
        .unwrap();
    let san = SubjectAlternativeName::new()
        .dns("localhost")
        .ip("127.0.0.1")
        .build(&cert.x509v3_context(issuer.map(|(ca, _)| &**ca), None))
        .unwrap();
    cert.append_extension(san).unwrap();

    match issuer {
        Some((_, ca_key)) => cert.sign(ca_key, MessageDigest::sha256()).unwrap(),
        None => cert.sign(&key, MessageDigest::sha256()).unwrap(),
    }

    (cert.build(), key)
}

/// Writes `certificates` as a PEM bundle to a temporary file.
pub fn pem_file(certificates: &[&X509]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for certificate in certificates {
        file.write_all(&certificate.to_pem().unwrap()).unwrap();
    }
    file.flush().unwrap();
    file
}

/// TLS server on `127.0.0.1` presenting `certificate`.
///
/// Accepts connections until the test process exits.
pub struct TestServer {
    pub port: u16,
}

impl TestServer {
    pub fn start(certificate: &X509Ref, key: &PKeyRef<Private>) -> TestServer {
        let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server()).unwrap();
        acceptor.set_private_key(key).unwrap();
        acceptor.set_certificate(certificate).unwrap();
        acceptor.check_private_key().unwrap();
        let acceptor = acceptor.build();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => continue,
                };
                let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
                let acceptor = acceptor.clone();
                thread::spawn(move || {
                    if let Ok(mut tls) = acceptor.accept(stream) {
                        let mut buf = [0u8; 256];
                        let _ = tls.read(&mut buf);
                        let _ = tls.shutdown();
                    }
                });
            }
        });

        TestServer { port }
    }

    /// Self-signed server whose certificate expires in `days`.
    pub fn self_signed(days: i64) -> TestServer {
        let (certificate, key) = server_certificate(days, None);
        TestServer::start(&certificate, &key)
    }
}

/// A port on 127.0.0.1 that nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
