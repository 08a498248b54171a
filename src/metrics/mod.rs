//! Prometheus counters for reconciliation outcomes

use crate::reconcile::Reconciliation;
use crate::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Correlation-miss reasons recorded under `worker_locator_correlation_misses_total`
pub const MISS_NO_SESSION: &str = "no_session";
pub const MISS_NODE_UNRESOLVED: &str = "node_unresolved";

#[derive(Clone)]
pub struct LocatorMetrics {
    registry: Registry,
    reconciliations: IntCounter,
    failures: IntCounter,
    workers: IntGauge,
    misses: IntCounterVec,
}

impl LocatorMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let reconciliations = IntCounter::new(
            "worker_locator_reconciliations_total",
            "Reconciliation passes that completed",
        )?;
        let failures = IntCounter::new(
            "worker_locator_reconcile_failures_total",
            "Reconciliation passes aborted by an upstream failure",
        )?;
        let workers = IntGauge::new(
            "worker_locator_workers",
            "Workers returned by the last successful reconciliation",
        )?;
        let misses = IntCounterVec::new(
            Opts::new(
                "worker_locator_correlation_misses_total",
                "Pods left out of a reconciliation, by reason",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(workers.clone()))?;
        registry.register(Box::new(misses.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self {
            registry,
            reconciliations,
            failures,
            workers,
            misses,
        })
    }

    pub fn record_success(&self, result: &Reconciliation) {
        self.reconciliations.inc();
        self.workers.set(result.workers.len() as i64);
        self.misses
            .with_label_values(&[MISS_NO_SESSION])
            .inc_by(result.unmatched_pods as u64);
        self.misses
            .with_label_values(&[MISS_NODE_UNRESOLVED])
            .inc_by(result.unresolved_nodes as u64);
    }

    pub fn record_failure(&self) {
        self.failures.inc();
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| crate::LocatorError::MetricsError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkerInfo;

    #[test]
    fn test_render_after_success() {
        let metrics = LocatorMetrics::new().unwrap();
        metrics.record_success(&Reconciliation {
            workers: vec![WorkerInfo::default(), WorkerInfo::default()],
            unmatched_pods: 3,
            unresolved_nodes: 1,
            sessions_without_host: 0,
        });
        metrics.record_failure();

        let text = metrics.render().unwrap();
        assert!(text.contains("worker_locator_reconciliations_total 1"));
        assert!(text.contains("worker_locator_reconcile_failures_total 1"));
        assert!(text.contains("worker_locator_workers 2"));
        assert!(text.contains(r#"worker_locator_correlation_misses_total{reason="no_session"} 3"#));
        assert!(text.contains(r#"worker_locator_correlation_misses_total{reason="node_unresolved"} 1"#));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = LocatorMetrics::new().unwrap();
        let b = LocatorMetrics::new().unwrap();
        a.record_failure();

        assert!(b
            .render()
            .unwrap()
            .contains("worker_locator_reconcile_failures_total 0"));
    }
}
