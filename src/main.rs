// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dockyard::config::Config;
use dockyard::kubernetes::KubeClusterStore;
use dockyard::providers::DockerRegistryClient;
use dockyard::reconcilers::{DnsReconciler, RegistryReconciler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Dockyard operator");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: operator_namespace={}, resync_interval={:?}",
        config.operator_namespace, config.resync_interval
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let store = Arc::new(KubeClusterStore::new(client.clone()));
    let registry_auth = Arc::new(DockerRegistryClient::new(config.registry_timeout)?);

    let registry_reconciler =
        RegistryReconciler::new(client.clone(), config.clone(), store, registry_auth);
    let dns_reconciler = DnsReconciler::new(client, config);

    info!("Starting reconcilers...");

    tokio::try_join!(registry_reconciler.run(), dns_reconciler.run())?;

    // Reconcilers run until their watch streams end
    warn!("All reconcilers stopped unexpectedly");
    Ok(())
}
