//! Wire types shared between worker-locator and the schedulers that consume it
//!
//! This crate defines:
//! - `Session`: the JSON registration a live worker writes into etcd
//! - `WorkerInfo`: one entry of the reconciled worker list served over HTTP
//!
//! Neither type depends on a Kubernetes or etcd client, so downstream routers
//! can decode the `/workers` response without pulling those stacks in.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// A live worker process's self-registration in the coordination store.
///
/// Decoding is tolerant: unknown fields are ignored, missing fields take their
/// default, and a field holding the wrong JSON type also falls back to its
/// default instead of rejecting the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "ServerID", default, deserialize_with = "lenient")]
    pub server_id: i64,
    #[serde(rename = "ServerName", default, deserialize_with = "lenient")]
    pub server_name: String,
    #[serde(rename = "Address", default, deserialize_with = "lenient")]
    pub address: String,
    #[serde(rename = "Exclusive", default, deserialize_with = "lenient")]
    pub exclusive: bool,
    #[serde(rename = "Version", default, deserialize_with = "lenient")]
    pub version: String,
}

impl Session {
    /// Decode a registration payload. Fails only when the payload is not
    /// well-formed JSON of object shape.
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Host portion of `address`, compared against pod IPs.
    ///
    /// `10.0.0.5:19530` and `[fd00::5]:19530` yield the IP; an address without
    /// a port is taken as a bare host. IP literals come back in canonical
    /// form, the way Kubernetes reports pod IPs: `[FD00:0::5]:19530` yields
    /// `fd00::5`. Anything else (a hostname) is returned as written and
    /// compares case-sensitively. Returns `None` when no host can be
    /// extracted (empty address, empty host before the port).
    pub fn host(&self) -> Option<String> {
        let address = self.address.trim();
        if address.is_empty() {
            return None;
        }

        if let Ok(sock) = address.parse::<SocketAddr>() {
            return Some(sock.ip().to_string());
        }
        if let Ok(ip) = address.parse::<IpAddr>() {
            return Some(ip.to_string());
        }

        let host = match address.rsplit_once(':') {
            Some((host, _port)) => host,
            None => address,
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');

        if host.is_empty() {
            None
        } else {
            Some(host.to_string())
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session:{}, ServerID: {}, Version: {}, Address: {}",
            self.server_name, self.server_id, self.version, self.address
        )
    }
}

/// A worker that is both scheduled by the orchestrator and registered in the
/// coordination store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerInfo {
    #[serde(rename = "podName")]
    pub pod_name: String,
    /// `<pod IP>:<worker port>`
    #[serde(rename = "addr")]
    pub address: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selectors: BTreeMap<String, String>,
    #[serde(rename = "k8sNode")]
    pub k8s_node: String,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
