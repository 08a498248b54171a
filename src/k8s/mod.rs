pub mod client;
pub mod types;

pub use client::K8sClient;
pub use types::{NodeLabelMap, PodRecord};

use crate::Result;
use async_trait::async_trait;

/// Point-in-time view of the orchestrator's pods and nodes
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Pods in `namespace` matching the label `selector` (e.g. `component=querynode`)
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodRecord>>;

    /// Labels of every node in the cluster, keyed by node name
    async fn list_node_labels(&self) -> Result<NodeLabelMap>;
}
