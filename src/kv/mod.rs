//! Coordination-store access
//!
//! All reads go through [`MetaKv`], which addresses keys below a
//! `<root_path>/<meta_path>` namespace. [`EtcdKv`] talks to a real etcd
//! cluster; [`MemKv`] keeps the same contract in memory.

pub mod etcd;
pub mod memory;
pub mod tls;

pub use etcd::EtcdKv;
pub use memory::MemKv;
pub use tls::{TlsMaterial, TlsVersion};

use crate::Result;
use async_trait::async_trait;

/// Read-only key-value operations against the coordination store
#[async_trait]
pub trait MetaKv: Send + Sync {
    /// Value stored under `key`, or `KeyNotFound`
    async fn load(&self, key: &str) -> Result<String>;

    /// All `(key, value)` pairs whose key starts with `prefix`, ascending by key
    async fn load_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;

    /// Release the connection. Calling it more than once is harmless.
    async fn close(&self);
}

/// Join path segments with `/`, dropping empty segments and repeated slashes.
///
/// A leading `/` on the first segment is preserved.
pub fn join_path(parts: &[&str]) -> String {
    let absolute = parts
        .iter()
        .find(|p| !p.is_empty())
        .map(|p| p.starts_with('/'))
        .unwrap_or(false);

    let joined = parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}
