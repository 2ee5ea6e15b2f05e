use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kubediag_core::{
    AppConfig, ClusterRegistry, DiagnosisOrchestrator, InMemoryClusterStore, OpenRouterClient,
    ResourceAccessor, ScanOrchestrator,
};

/// Thin runnable entry point: this binary only exercises the library's
/// caller-facing APIs (cluster reconciliation plus one on-demand scan per
/// registered cluster). Any outer HTTP/UI surface is the consumer's concern,
/// not this crate's.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("starting kubediag-core");
    info!(version = env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env().context("loading configuration from environment")?;

    let store = Arc::new(InMemoryClusterStore::new());
    let registry = Arc::new(ClusterRegistry::new(store));
    registry.reconcile_on_startup().await;

    let accessor = Arc::new(ResourceAccessor::new(registry.clone()));
    let scanner = ScanOrchestrator::new(accessor.clone());

    let llm: Option<Arc<dyn kubediag_core::LlmClient>> = if config.ai_diagnosis.enabled
        && !config.openrouter.api_key.is_empty()
    {
        let client = OpenRouterClient::new(config.openrouter.clone())
            .context("building OpenRouter client")?;
        Some(Arc::new(client))
    } else {
        None
    };
    let diagnoser = DiagnosisOrchestrator::new(accessor, llm, config.ai_diagnosis.clone());

    let clusters = registry.list().context("listing registered clusters")?;
    if clusters.is_empty() {
        info!("no clusters registered, nothing to scan");
        return Ok(());
    }

    for cluster in clusters {
        info!(cluster_id = %cluster.id, cluster_name = %cluster.name, "scanning cluster");
        let faults = match scanner.scan_cluster(cluster.id).await {
            Ok(faults) => kubediag_core::dedup_faults(faults),
            Err(e) => {
                warn!(cluster_id = %cluster.id, error = %e, "scan failed, skipping cluster");
                continue;
            }
        };
        info!(cluster_id = %cluster.id, fault_count = faults.len(), "scan complete");

        for fault in &faults {
            let result = diagnoser.diagnose(cluster.id, fault, &faults).await;
            info!(
                cluster_id = %cluster.id,
                resource = %fault.resource_name,
                fault_type = %fault.fault_type,
                severity = %fault.severity,
                root_cause = %result.root_cause,
                "diagnosis ready"
            );
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kubediag_core=debug,kube=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}
