use super::{join_path, MetaKv, TlsMaterial};
use crate::{Config, LocatorError, Result};
use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, GetOptions, KvClient, SortOrder, SortTarget};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// etcd-backed [`MetaKv`] rooted at `<root_path>/<meta_path>`
pub struct EtcdKv {
    kv: RwLock<Option<KvClient>>,
    root_path: String,
    meta_path: String,
}

impl EtcdKv {
    pub fn new(client: Client, root_path: &str, meta_path: &str) -> Self {
        Self {
            kv: RwLock::new(Some(client.kv_client())),
            root_path: root_path.to_string(),
            meta_path: meta_path.to_string(),
        }
    }

    /// Connect to the endpoint in `config`, with TLS when enabled.
    ///
    /// Invalid TLS settings fail here, before any network traffic.
    pub async fn connect(config: &Config) -> Result<Self> {
        let tls = TlsMaterial::from_config(config)?;

        let mut options =
            ConnectOptions::new().with_connect_timeout(Duration::from_secs(config.dial_timeout_secs));
        if let Some(material) = &tls {
            options = options.with_tls(material.to_options());
        }

        debug!(
            "Connecting to etcd at {} (tls: {})",
            config.etcd_addr,
            tls.is_some()
        );

        let client = Client::connect([config.etcd_addr.as_str()], Some(options))
            .await
            .map_err(|e| {
                LocatorError::EtcdError(format!(
                    "Failed to connect to etcd at {}: {}",
                    config.etcd_addr, e
                ))
            })?;

        info!("Connected to etcd at {}", config.etcd_addr);

        Ok(Self::new(client, &config.root_path, &config.meta_path))
    }

    fn full_key(&self, key: &str) -> String {
        join_path(&[self.root_path.as_str(), self.meta_path.as_str(), key])
    }

    // KvClient is a cheap handle over a shared channel; each read works on its own clone.
    async fn kv_client(&self) -> Result<KvClient> {
        self.kv.read().await.clone().ok_or(LocatorError::KvClosed)
    }
}

#[async_trait]
impl MetaKv for EtcdKv {
    async fn load(&self, key: &str) -> Result<String> {
        let key = self.full_key(key);
        let mut kv = self.kv_client().await?;

        let resp = kv.get(key.as_str(), None).await?;
        match resp.kvs().first() {
            Some(entry) => Ok(String::from_utf8_lossy(entry.value()).into_owned()),
            None => Err(LocatorError::KeyNotFound { key }),
        }
    }

    async fn load_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let prefix = self.full_key(prefix);
        let mut kv = self.kv_client().await?;

        let options = GetOptions::new()
            .with_prefix()
            .with_sort(SortTarget::Key, SortOrder::Ascend);
        let resp = kv.get(prefix.as_str(), Some(options)).await?;

        // Lossy: undecodable values surface later as skipped sessions
        let pairs: Vec<(String, String)> = resp
            .kvs()
            .iter()
            .map(|entry| {
                (
                    String::from_utf8_lossy(entry.key()).into_owned(),
                    String::from_utf8_lossy(entry.value()).into_owned(),
                )
            })
            .collect();

        debug!("Loaded {} keys under {}", pairs.len(), prefix);
        Ok(pairs)
    }

    async fn close(&self) {
        if self.kv.write().await.take().is_some() {
            info!("Closed etcd connection");
        }
    }
}
