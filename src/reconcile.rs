//! Worker reconciliation
//!
//! The orchestrator knows which worker pods are scheduled and where; the
//! session registry knows which worker processes are actually up. A worker is
//! advertised only when both agree, and the only key shared by the two
//! sources is the network address: a pod is matched when its IP equals the
//! host part of some live session's address.
//!
//! For each matched pod the selector set starts from the labels of the node it
//! runs on, then the pod's colocation label is merged in according to
//! [`ColocationPrecedence`]. Pods whose node is missing from the node label
//! map follow [`NodeFallback`].

use crate::config::{ColocationPrecedence, Config, NodeFallback};
use crate::k8s::types::Labels;
use crate::k8s::{Inventory, NodeLabelMap, PodRecord};
use crate::metrics::LocatorMetrics;
use crate::session::SessionRegistry;
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use worker_locator_common::{Session, WorkerInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub namespace: String,
    pub selector: String,
    pub session_prefix: String,
    pub worker_port: u16,
    pub colocation_key: String,
    /// When false, nodes are never listed and pod labels form the selector base
    pub node_enrichment: bool,
    pub node_fallback: NodeFallback,
    pub colocation_precedence: ColocationPrecedence,
}

impl From<&Config> for ReconcilePolicy {
    fn from(config: &Config) -> Self {
        Self {
            namespace: config.namespace.clone(),
            selector: config.worker_selector.clone(),
            session_prefix: config.session_prefix.clone(),
            worker_port: config.worker_port,
            colocation_key: config.colocation_key.clone(),
            node_enrichment: config.node_enrichment,
            node_fallback: config.node_fallback,
            colocation_precedence: config.colocation_precedence,
        }
    }
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub workers: Vec<WorkerInfo>,
    /// Pods with no live session at their IP
    pub unmatched_pods: usize,
    /// Matched pods left out because their node was not in the node label map
    pub unresolved_nodes: usize,
    /// Sessions whose address had no usable host
    pub sessions_without_host: usize,
}

/// Correlate `pods` with `sessions`.
///
/// `nodes` is `None` when node enrichment is disabled; pod labels are then
/// the selector base for every worker. Output follows the order of `pods`.
pub fn reconcile(
    pods: &[PodRecord],
    sessions: &[Session],
    nodes: Option<&NodeLabelMap>,
    policy: &ReconcilePolicy,
) -> Reconciliation {
    let mut result = Reconciliation::default();

    let mut session_hosts = HashSet::with_capacity(sessions.len());
    for session in sessions {
        match session.host() {
            Some(host) => {
                session_hosts.insert(host);
            }
            None => {
                debug!("Session has no usable host, ignoring: {}", session);
                result.sessions_without_host += 1;
            }
        }
    }

    for pod in pods {
        if pod.ip.is_empty() || !session_hosts.contains(&pod.ip) {
            warn!(
                "match pod failed, pod name: {}, pod ip: {}",
                pod.name, pod.ip
            );
            result.unmatched_pods += 1;
            continue;
        }

        let Some(selectors) = resolve_selectors(pod, nodes, policy) else {
            warn!(
                "match node failed, pod name: {}, node name: {}",
                pod.name, pod.node_name
            );
            result.unresolved_nodes += 1;
            continue;
        };

        let worker = WorkerInfo {
            pod_name: pod.name.clone(),
            address: format!("{}:{}", pod.ip, policy.worker_port),
            selectors,
            k8s_node: pod.node_name.clone(),
        };
        info!(
            "get worker, name: {}, addr: {}, node name: {}",
            worker.pod_name, worker.address, worker.k8s_node
        );
        result.workers.push(worker);
    }

    result
}

fn resolve_selectors(
    pod: &PodRecord,
    nodes: Option<&NodeLabelMap>,
    policy: &ReconcilePolicy,
) -> Option<Labels> {
    let mut selectors = match nodes {
        None => return Some(pod.labels.clone()),
        Some(nodes) => match (nodes.get(&pod.node_name), policy.node_fallback) {
            (Some(node_labels), _) => node_labels.clone(),
            (None, NodeFallback::PodLabels) => return Some(pod.labels.clone()),
            (None, NodeFallback::Skip) => return None,
        },
    };

    if let Some(value) = pod.labels.get(&policy.colocation_key) {
        let overwrite = match policy.colocation_precedence {
            ColocationPrecedence::Node => !selectors.contains_key(&policy.colocation_key),
            ColocationPrecedence::Pod => true,
        };
        if overwrite {
            selectors.insert(policy.colocation_key.clone(), value.clone());
        }
    }

    Some(selectors)
}

/// Runs a full reconciliation against live upstreams on every call
pub struct WorkerReconciler {
    inventory: Arc<dyn Inventory>,
    registry: SessionRegistry,
    policy: ReconcilePolicy,
    metrics: LocatorMetrics,
}

impl WorkerReconciler {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        registry: SessionRegistry,
        policy: ReconcilePolicy,
        metrics: LocatorMetrics,
    ) -> Self {
        Self {
            inventory,
            registry,
            policy,
            metrics,
        }
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &LocatorMetrics {
        &self.metrics
    }

    /// Current worker set. Any upstream listing failure fails the whole call.
    pub async fn list_workers(&self) -> Result<Vec<WorkerInfo>> {
        match self.run().await {
            Ok(result) => {
                self.metrics.record_success(&result);
                Ok(result.workers)
            }
            Err(e) => {
                self.metrics.record_failure();
                Err(e)
            }
        }
    }

    async fn run(&self) -> Result<Reconciliation> {
        let policy = &self.policy;

        let pods = self.inventory.list_pods(&policy.namespace, &policy.selector);
        let nodes = async {
            if policy.node_enrichment {
                self.inventory.list_node_labels().await.map(Some)
            } else {
                Ok(None)
            }
        };
        let sessions = self.registry.list_sessions_by_prefix(&policy.session_prefix);

        let (pods, nodes, sessions) = futures::try_join!(pods, nodes, sessions)?;

        if nodes.as_ref().is_some_and(NodeLabelMap::is_empty) {
            warn!(
                "Node listing returned no nodes; every matched worker falls back to {:?}",
                policy.node_fallback
            );
        }

        debug!(
            "Reconciling {} pods against {} sessions ({} nodes)",
            pods.len(),
            sessions.len(),
            nodes.as_ref().map(NodeLabelMap::len).unwrap_or(0)
        );

        Ok(reconcile(&pods, &sessions, nodes.as_ref(), policy))
    }
}
