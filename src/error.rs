use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("Kubernetes error: {0}")]
    KubernetesError(String),

    #[error("etcd error: {0}")]
    EtcdError(String),

    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    #[error("etcd connection is closed")]
    KvClosed,

    #[error("Scanning prefix {prefix} timed out after {timeout:?}")]
    ScanTimeout { prefix: String, timeout: Duration },

    #[error("TLS error: {0}")]
    TlsError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<etcd_client::Error> for LocatorError {
    fn from(e: etcd_client::Error) -> Self {
        LocatorError::EtcdError(e.to_string())
    }
}

impl From<prometheus::Error> for LocatorError {
    fn from(e: prometheus::Error) -> Self {
        LocatorError::MetricsError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LocatorError>;
