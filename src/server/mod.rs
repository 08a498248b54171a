//! HTTP query service
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Liveness probe, empty 200 |
//! | GET | `/workers`, `/querynodes` | Reconciled worker list |
//! | GET | `/sessions` | Every decodable registry session |
//! | GET | `/metrics` | Prometheus exposition |
//!
//! Every worker-list request runs a fresh reconciliation; nothing is cached.

pub mod handlers;

use crate::reconcile::WorkerReconciler;
use crate::Result;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<WorkerReconciler>,
}

pub fn build_router(reconciler: Arc<WorkerReconciler>) -> Router {
    let state = AppState { reconciler };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/workers", get(handlers::list_workers))
        .route("/querynodes", get(handlers::list_workers))
        .route("/sessions", get(handlers::list_sessions))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}

/// Serve `router` on `0.0.0.0:port` until `shutdown` resolves
pub async fn serve<F>(router: Router, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Starting HTTP service at {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP service stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
///
/// The SIGTERM handler is installed when this is called, not when the future
/// is first polled, so a signal sent in between is not lost.
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    #[cfg(unix)]
    let sigterm = signal::unix::signal(signal::unix::SignalKind::terminate());

    async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match sigterm {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => info!("Received Ctrl+C"),
            () = terminate => info!("Received SIGTERM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_serve_returns_when_shutdown_resolves() {
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(Router::new(), 0, async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_resolves_shutdown_signal() {
        let shutdown = shutdown_signal();

        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("kill -TERM {}", std::process::id()))
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .unwrap();
    }
}
