use crate::cli::Commands;
use crate::config::Config;
use crate::k8s::K8sClient;
use crate::kv::{EtcdKv, MetaKv};
use crate::metrics::LocatorMetrics;
use crate::reconcile::{ReconcilePolicy, WorkerReconciler};
use crate::server;
use crate::session::SessionRegistry;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

pub async fn handle_command(command: Commands, config_dir: &Path) -> Result<()> {
    let config = Config::load_or_default(config_dir);

    let kv = Arc::new(
        EtcdKv::connect(&config)
            .await
            .context("Failed to set up etcd client")?,
    );

    let result = match command {
        Commands::Serve => handle_serve(&config, kv.clone()).await,
        Commands::Workers => handle_workers(&config, kv.clone()).await,
        Commands::Sessions { prefix } => handle_sessions(kv.clone(), &prefix).await,
    };

    kv.close().await;
    result
}

async fn build_reconciler(config: &Config, kv: Arc<dyn MetaKv>) -> Result<WorkerReconciler> {
    let k8s = K8sClient::try_default()
        .await
        .context("Failed to set up Kubernetes client")?;
    let metrics = LocatorMetrics::new().context("Failed to register metrics")?;

    Ok(WorkerReconciler::new(
        Arc::new(k8s),
        SessionRegistry::new(kv),
        ReconcilePolicy::from(config),
        metrics,
    ))
}

async fn handle_serve(config: &Config, kv: Arc<dyn MetaKv>) -> Result<()> {
    let reconciler = Arc::new(build_reconciler(config, kv).await?);
    let router = server::build_router(reconciler);

    server::serve(router, config.server_port, server::shutdown_signal())
        .await
        .context("HTTP service failed")?;
    Ok(())
}

async fn handle_workers(config: &Config, kv: Arc<dyn MetaKv>) -> Result<()> {
    let reconciler = build_reconciler(config, kv).await?;
    let workers = reconciler
        .list_workers()
        .await
        .context("Failed to reconcile workers")?;

    println!("{}", serde_json::to_string_pretty(&workers)?);
    Ok(())
}

async fn handle_sessions(kv: Arc<dyn MetaKv>, prefix: &str) -> Result<()> {
    let sessions = SessionRegistry::new(kv)
        .list_sessions_by_prefix(prefix)
        .await
        .context("Failed to list sessions")?;

    println!("{}", serde_json::to_string_pretty(&sessions)?);
    Ok(())
}
