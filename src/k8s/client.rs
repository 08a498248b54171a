use super::{Inventory, NodeLabelMap, PodRecord};
use crate::{LocatorError, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::{debug, info};

pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Uses the in-cluster service account when running in a pod, the local
    /// kubeconfig otherwise.
    pub async fn try_default() -> Result<Self> {
        debug!("Initializing Kubernetes client");

        let client = Client::try_default().await.map_err(|e| {
            LocatorError::KubernetesError(format!("Failed to create K8s client: {}", e))
        })?;

        info!("Successfully connected to Kubernetes cluster");

        Ok(Self { client })
    }

    pub fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    pub fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl Inventory for K8sClient {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodRecord>> {
        let params = ListParams::default().labels(selector);

        let pod_list = self.pods(namespace).list(&params).await.map_err(|e| {
            LocatorError::KubernetesError(format!(
                "Failed to list pods in {} with selector {}: {}",
                namespace, selector, e
            ))
        })?;

        debug!(
            "Listed {} pods in {} matching {}",
            pod_list.items.len(),
            namespace,
            selector
        );

        Ok(pod_list.items.iter().map(PodRecord::from_k8s_pod).collect())
    }

    async fn list_node_labels(&self) -> Result<NodeLabelMap> {
        let node_list = self
            .nodes()
            .list(&ListParams::default())
            .await
            .map_err(|e| LocatorError::KubernetesError(format!("Failed to list nodes: {}", e)))?;

        debug!("Listed {} nodes", node_list.items.len());

        Ok(NodeLabelMap::from_k8s_nodes(&node_list.items))
    }
}
