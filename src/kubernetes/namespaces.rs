// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Workload namespace discovery

use crate::constants::labels;
use crate::error::Result;
use k8s_openapi::api::core::v1::Namespace;
use kube::{api::ListParams, Api, Client, ResourceExt};
use tracing::{debug, instrument};

/// Label selector matching namespaces that receive pull secrets
pub fn enabled_selector() -> String {
    format!("{}=true", labels::ENABLED)
}

/// A namespace takes pull secrets when it is labelled enabled and is not being torn down
pub fn is_active_workload_namespace(namespace: &Namespace) -> bool {
    let enabled = namespace
        .labels()
        .get(labels::ENABLED)
        .is_some_and(|v| v == "true");

    let terminating = namespace.metadata.deletion_timestamp.is_some()
        || namespace
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .is_some_and(|p| p == "Terminating");

    enabled && !terminating
}

/// List the active workload namespaces, sorted by name
#[instrument(skip(client))]
pub async fn list_active_namespaces(client: &Client) -> Result<Vec<String>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let lp = ListParams::default().labels(&enabled_selector());

    let mut names: Vec<String> = namespaces
        .list(&lp)
        .await?
        .items
        .iter()
        .filter(|ns| is_active_workload_namespace(ns))
        .map(|ns| ns.name_any())
        .collect();
    names.sort();

    debug!("Found {} active workload namespaces", names.len());
    Ok(names)
}
