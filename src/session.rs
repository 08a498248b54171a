//! Session registry reader
//!
//! Live workers register themselves under `session/<server_name>...` in the
//! coordination store. Registrations come from independently deployed
//! processes that may run different versions, so a record that does not
//! decode is skipped rather than failing the listing.

use crate::kv::{join_path, MetaKv};
use crate::{LocatorError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use worker_locator_common::Session;

/// Top-level namespace for session keys
pub const SESSION_PREFIX: &str = "session";

/// Upper bound on a single registry scan
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct SessionRegistry {
    kv: Arc<dyn MetaKv>,
    scan_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(kv: Arc<dyn MetaKv>) -> Self {
        Self {
            kv,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }

    pub fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    /// All decodable sessions, regardless of server name
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.list_sessions_by_prefix("").await
    }

    /// Decodable sessions whose key starts with `session/<prefix>`.
    ///
    /// An empty registry yields an empty list. Only the scan itself (including
    /// its timeout) can fail the call.
    pub async fn list_sessions_by_prefix(&self, prefix: &str) -> Result<Vec<Session>> {
        let prefix = join_path(&[SESSION_PREFIX, prefix]);

        let pairs = tokio::time::timeout(self.scan_timeout, self.kv.load_with_prefix(&prefix))
            .await
            .map_err(|_| LocatorError::ScanTimeout {
                prefix: prefix.clone(),
                timeout: self.scan_timeout,
            })??;

        let mut sessions = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            match Session::from_json(&value) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("Skipping undecodable session {}: {}", key, e),
            }
        }

        debug!("Found {} sessions under {}", sessions.len(), prefix);
        Ok(sessions)
    }
}
