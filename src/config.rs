//! Process configuration loaded from `<config_dir>/config.yaml`
//!
//! Every key is optional; anything missing takes the built-in default below.

use crate::{LocatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name looked up inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// What to do with a matched pod whose node is missing from the node label map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeFallback {
    /// Leave the worker out of the result
    #[default]
    Skip,
    /// Advertise the worker with its own pod labels as selectors
    PodLabels,
}

/// Which side wins when both the node and the pod define the colocation label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColocationPrecedence {
    #[default]
    Node,
    Pod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "serverPort")]
    pub server_port: u16,
    #[serde(rename = "etcd")]
    pub etcd_addr: String,
    #[serde(rename = "rootPath")]
    pub root_path: String,
    #[serde(rename = "metaPath")]
    pub meta_path: String,
    #[serde(rename = "dialTimeoutSecs")]
    pub dial_timeout_secs: u64,

    #[serde(rename = "enableTLS")]
    pub enable_tls: bool,
    #[serde(rename = "rootCAPem")]
    pub root_ca: String,
    #[serde(rename = "etcdCert")]
    pub etcd_cert: String,
    #[serde(rename = "etcdKey")]
    pub etcd_key: String,
    #[serde(rename = "min_version")]
    pub tls_min_version: String,

    pub namespace: String,
    #[serde(rename = "workerSelector")]
    pub worker_selector: String,
    #[serde(rename = "sessionPrefix")]
    pub session_prefix: String,
    #[serde(rename = "workerPort")]
    pub worker_port: u16,
    #[serde(rename = "colocationKey")]
    pub colocation_key: String,
    #[serde(rename = "nodeEnrichment")]
    pub node_enrichment: bool,
    #[serde(rename = "nodeFallback")]
    pub node_fallback: NodeFallback,
    #[serde(rename = "colocationPrecedence")]
    pub colocation_precedence: ColocationPrecedence,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            etcd_addr: "127.0.0.1:2379".to_string(),
            root_path: "by-dev".to_string(),
            meta_path: "meta".to_string(),
            dial_timeout_secs: 10,
            enable_tls: false,
            root_ca: String::new(),
            etcd_cert: String::new(),
            etcd_key: String::new(),
            tls_min_version: "1.2".to_string(),
            namespace: "milvus".to_string(),
            worker_selector: "component=querynode".to_string(),
            session_prefix: "querynode".to_string(),
            worker_port: 21123,
            colocation_key: "dce.netease.com/workload-type".to_string(),
            node_enrichment: true,
            node_fallback: NodeFallback::Skip,
            colocation_precedence: ColocationPrecedence::Node,
        }
    }
}

impl Config {
    /// Load `config.yaml` from `config_dir`.
    ///
    /// Missing, unreadable, or malformed files are reported as errors; the
    /// caller decides whether to continue with [`Config::default`].
    pub fn load(config_dir: impl AsRef<Path>) -> Result<Self> {
        let path = Self::file_path(config_dir.as_ref());
        debug!("Loading configuration from {}", path.display());

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            LocatorError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&raw).map_err(|e| match e {
            LocatorError::ConfigError(msg) => {
                LocatorError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Like [`Config::load`], but a missing or broken file is not fatal: the
    /// problem is logged and the defaults are used.
    pub fn load_or_default(config_dir: impl AsRef<Path>) -> Self {
        let config_dir = config_dir.as_ref();
        match Self::load(config_dir) {
            Ok(config) => {
                info!("Loaded configuration from {}", config_dir.display());
                config
            }
            Err(e) => {
                warn!("Load config file failed, running in default setting: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| LocatorError::ConfigError(e.to_string()))
    }

    pub fn file_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }
}
