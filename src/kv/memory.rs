//! In-memory [`MetaKv`] used for tests and offline runs

use super::{join_path, MetaKv};
use crate::{LocatorError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

pub struct MemKv {
    root_path: String,
    meta_path: String,
    entries: RwLock<BTreeMap<String, String>>,
    closed: RwLock<bool>,
}

impl MemKv {
    pub fn new(root_path: &str, meta_path: &str) -> Self {
        Self {
            root_path: root_path.to_string(),
            meta_path: meta_path.to_string(),
            entries: RwLock::new(BTreeMap::new()),
            closed: RwLock::new(false),
        }
    }

    /// Store `value` under `key`, relative to the namespace like reads are
    pub async fn put(&self, key: &str, value: impl Into<String>) {
        let full_key = self.full_key(key);
        self.entries.write().await.insert(full_key, value.into());
    }

    fn full_key(&self, key: &str) -> String {
        join_path(&[self.root_path.as_str(), self.meta_path.as_str(), key])
    }

    async fn ensure_open(&self) -> Result<()> {
        if *self.closed.read().await {
            return Err(LocatorError::KvClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl MetaKv for MemKv {
    async fn load(&self, key: &str) -> Result<String> {
        self.ensure_open().await?;

        let full_key = self.full_key(key);
        self.entries
            .read()
            .await
            .get(&full_key)
            .cloned()
            .ok_or(LocatorError::KeyNotFound { key: full_key })
    }

    async fn load_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        self.ensure_open().await?;

        let full_prefix = self.full_key(prefix);
        let entries = self.entries.read().await;

        Ok(entries
            .range(full_prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&full_prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn close(&self) {
        *self.closed.write().await = true;
    }
}
