//! Transport security for the etcd connection
//!
//! Certificate material is read and decoded up front so that a bad path, a
//! corrupt PEM file or an undecodable certificate or key stops the process at
//! startup instead of at the first request. A key that does not belong to its
//! certificate still surfaces only when the connection is made.

use crate::{Config, LocatorError, Result};
use etcd_client::{Certificate, Identity, TlsOptions};
use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::RootCertStore;
use std::fmt;
use std::fs;
use std::str::FromStr;
use tracing::{debug, warn};

/// Minimum TLS protocol version accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    V1_0,
    V1_1,
    V1_2,
    V1_3,
}

impl FromStr for TlsVersion {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1.0" => Ok(TlsVersion::V1_0),
            "1.1" => Ok(TlsVersion::V1_1),
            "1.2" => Ok(TlsVersion::V1_2),
            "1.3" => Ok(TlsVersion::V1_3),
            other => Err(LocatorError::TlsError(format!(
                "invalid min tls version {:?}, only 1.0, 1.1, 1.2 and 1.3 are supported",
                other
            ))),
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TlsVersion::V1_0 => "1.0",
            TlsVersion::V1_1 => "1.1",
            TlsVersion::V1_2 => "1.2",
            TlsVersion::V1_3 => "1.3",
        };
        f.write_str(s)
    }
}

/// Validated PEM material for a mutually authenticated etcd connection
#[derive(Clone)]
pub struct TlsMaterial {
    pub min_version: TlsVersion,
    ca_pem: Option<Vec<u8>>,
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("min_version", &self.min_version)
            .field("has_ca", &self.ca_pem.is_some())
            .finish_non_exhaustive()
    }
}

impl TlsMaterial {
    /// Returns `None` when TLS is disabled in `config`.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        if !config.enable_tls {
            return Ok(None);
        }

        let min_version: TlsVersion = config.tls_min_version.parse()?;
        check_min_version(min_version)?;

        let ca_pem = if config.root_ca.is_empty() {
            None
        } else {
            let bytes = read_pem(&config.root_ca, "root CA")?;
            parse_certificates(&bytes, "root CA")?;
            Some(bytes)
        };

        let cert_pem = read_pem(&config.etcd_cert, "etcd cert")?;
        parse_certificates(&cert_pem, "etcd cert")?;

        let key_pem = read_pem(&config.etcd_key, "etcd key")?;
        parse_private_key(&key_pem)?;

        debug!(
            "Loaded etcd TLS material (min version {}, custom CA: {})",
            min_version,
            ca_pem.is_some()
        );

        Ok(Some(Self {
            min_version,
            ca_pem,
            cert_pem,
            key_pem,
        }))
    }

    /// Connection options for `etcd-client`.
    ///
    /// The system trust store is always loaded; a configured root CA is
    /// trusted in addition to it.
    pub fn to_options(&self) -> TlsOptions {
        let mut options = TlsOptions::new()
            .with_native_roots()
            .identity(Identity::from_pem(&self.cert_pem, &self.key_pem));
        if let Some(ca) = &self.ca_pem {
            options = options.ca_certificate(Certificate::from_pem(ca));
        }
        options
    }
}

// The rustls transport negotiates 1.2 or 1.3 and has no floor setting.
// Lower floors are looser than what it enforces; a 1.3 floor cannot be honoured.
fn check_min_version(min_version: TlsVersion) -> Result<()> {
    match min_version {
        TlsVersion::V1_3 => Err(LocatorError::TlsError(
            "min tls version 1.3 cannot be enforced by the etcd transport, use 1.2".to_string(),
        )),
        TlsVersion::V1_0 | TlsVersion::V1_1 => {
            warn!(
                "min tls version {} is below what the transport supports; TLS 1.2 is the effective minimum",
                min_version
            );
            Ok(())
        }
        TlsVersion::V1_2 => Ok(()),
    }
}

fn read_pem(path: &str, what: &str) -> Result<Vec<u8>> {
    if path.is_empty() {
        return Err(LocatorError::TlsError(format!(
            "{} path is not configured",
            what
        )));
    }
    fs::read(path).map_err(|e| LocatorError::TlsError(format!("failed to read {} {}: {}", what, path, e)))
}

fn parse_certificates(pem: &[u8], what: &str) -> Result<()> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| LocatorError::TlsError(format!("{} PEM cannot be parsed: {}", what, e)))?;

    if certs.is_empty() {
        return Err(LocatorError::TlsError(format!(
            "{} PEM contains no certificate",
            what
        )));
    }

    certs
        .into_iter()
        .try_for_each(|der| check_certificate_der(der, what))
}

// Adding to a root store decodes the X.509 structure of the certificate.
fn check_certificate_der(der: CertificateDer<'static>, what: &str) -> Result<()> {
    RootCertStore::empty().add(der).map_err(|e| {
        LocatorError::TlsError(format!("{} is not a valid X.509 certificate: {}", what, e))
    })
}

fn parse_private_key(pem: &[u8]) -> Result<()> {
    match rustls_pemfile::private_key(&mut &pem[..]) {
        Ok(Some(key)) => check_private_key_der(key),
        Ok(None) => Err(LocatorError::TlsError(
            "etcd key PEM contains no private key".to_string(),
        )),
        Err(e) => Err(LocatorError::TlsError(format!(
            "etcd key PEM cannot be parsed: {}",
            e
        ))),
    }
}

fn check_private_key_der(key: PrivateKeyDer<'static>) -> Result<()> {
    ring::default_provider()
        .key_provider
        .load_private_key(key)
        .map(|_| ())
        .map_err(|e| LocatorError::TlsError(format!("etcd key is not a usable private key: {}", e)))
}
