use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use worker_locator::error::{LocatorError, Result};
use worker_locator::k8s::types::Labels;
use worker_locator::k8s::{Inventory, NodeLabelMap, PodRecord};
use worker_locator::kv::{MemKv, MetaKv};
use worker_locator::metrics::LocatorMetrics;
use worker_locator::reconcile::{ReconcilePolicy, WorkerReconciler};
use worker_locator::server::build_router;
use worker_locator::session::SessionRegistry;
use worker_locator::WorkerInfo;

const COLOCATION: &str = "dce.netease.com/workload-type";

fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Inventory whose pod listing can be made to fail between requests
struct ClusterInventory {
    pods: Vec<PodRecord>,
    nodes: NodeLabelMap,
    fail: AtomicBool,
}

#[async_trait]
impl Inventory for ClusterInventory {
    async fn list_pods(&self, _namespace: &str, _selector: &str) -> Result<Vec<PodRecord>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LocatorError::KubernetesError(
                "connection refused".to_string(),
            ));
        }
        Ok(self.pods.clone())
    }

    async fn list_node_labels(&self) -> Result<NodeLabelMap> {
        Ok(self.nodes.clone())
    }
}

fn cluster() -> Arc<ClusterInventory> {
    let mut nodes = NodeLabelMap::new();
    nodes.insert("node-a", labels(&[("zone", "us-1")]));

    Arc::new(ClusterInventory {
        pods: vec![PodRecord {
            name: "qn-0".to_string(),
            ip: "10.0.0.5".to_string(),
            node_name: "node-a".to_string(),
            labels: labels(&[(COLOCATION, "gpu"), ("component", "querynode")]),
        }],
        nodes,
        fail: AtomicBool::new(false),
    })
}

async fn registry_kv() -> Arc<MemKv> {
    let kv = MemKv::new("by-dev", "meta");
    kv.put(
        "session/querynode-1",
        r#"{"ServerID":1,"ServerName":"querynode","Address":"10.0.0.5:19530","Version":"2.2.0"}"#,
    )
    .await;
    kv.put("session/querynode-2", "corrupt{").await;
    Arc::new(kv)
}

fn reconciler(inventory: Arc<dyn Inventory>, kv: Arc<dyn MetaKv>) -> Arc<WorkerReconciler> {
    Arc::new(WorkerReconciler::new(
        inventory,
        SessionRegistry::new(kv),
        ReconcilePolicy::default(),
        LocatorMetrics::new().unwrap(),
    ))
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_health() {
    let router = build_router(reconciler(cluster(), registry_kv().await));

    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_workers_endpoint_returns_reconciled_set() {
    let router = build_router(reconciler(cluster(), registry_kv().await));

    for uri in ["/workers", "/querynodes"] {
        let (status, body) = get(&router, uri).await;
        assert_eq!(status, StatusCode::OK);

        let workers: Vec<WorkerInfo> = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            workers,
            vec![WorkerInfo {
                pod_name: "qn-0".to_string(),
                address: "10.0.0.5:21123".to_string(),
                selectors: labels(&[("zone", "us-1"), (COLOCATION, "gpu")]),
                k8s_node: "node-a".to_string(),
            }]
        );

        let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(raw[0]["addr"], "10.0.0.5:21123");
        assert_eq!(raw[0]["k8sNode"], "node-a");
    }
}

#[tokio::test]
async fn test_no_matching_session_returns_empty_array() {
    let kv = Arc::new(MemKv::new("by-dev", "meta"));
    kv.put(
        "session/querynode-1",
        r#"{"ServerID":1,"Address":"10.0.0.9:19530"}"#,
    )
    .await;
    let router = build_router(reconciler(cluster(), kv));

    let (status, body) = get(&router, "/workers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn test_upstream_failure_is_request_scoped() {
    let inventory = cluster();
    let router = build_router(reconciler(inventory.clone(), registry_kv().await));

    inventory.fail.store(true, Ordering::SeqCst);
    let (status, _) = get(&router, "/workers").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    inventory.fail.store(false, Ordering::SeqCst);
    let (status, _) = get(&router, "/workers").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&router, "/metrics").await;
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("worker_locator_reconcile_failures_total 1"));
    assert!(text.contains("worker_locator_reconciliations_total 1"));
}

struct SlowKv;

#[async_trait]
impl MetaKv for SlowKv {
    async fn load(&self, key: &str) -> Result<String> {
        Err(LocatorError::KeyNotFound {
            key: key.to_string(),
        })
    }

    async fn load_with_prefix(&self, _prefix: &str) -> Result<Vec<(String, String)>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn test_registry_timeout_returns_server_error() {
    let registry = SessionRegistry::new(Arc::new(SlowKv)).with_scan_timeout(Duration::from_millis(20));
    let reconciler = Arc::new(WorkerReconciler::new(
        cluster(),
        registry,
        ReconcilePolicy::default(),
        LocatorMetrics::new().unwrap(),
    ));
    let router = build_router(reconciler);

    let (status, _) = get(&router, "/workers").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sessions_endpoint_skips_corrupt_records() {
    let router = build_router(reconciler(cluster(), registry_kv().await));

    let (status, body) = get(&router, "/sessions").await;
    assert_eq!(status, StatusCode::OK);

    let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let sessions = raw.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["Address"], "10.0.0.5:19530");
}

#[test]
fn test_error_types() {
    let err = LocatorError::KeyNotFound {
        key: "by-dev/meta/session/querynode-1".to_string(),
    };

    assert!(err.to_string().contains("session/querynode-1"));
}

#[test]
fn test_version_const() {
    assert!(!worker_locator::VERSION.is_empty());
}
