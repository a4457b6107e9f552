// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Fan-out of registry pull secrets across workload namespaces.

use crate::error::{DockyardError, Result};
use crate::kubernetes::ClusterStore;
use crate::sync::ownership::OwnerRef;
use crate::sync::secrets::{build_pull_secret, is_up_to_date, RegistryCredentials};
use crate::types::Registry;
use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretAction {
    Created,
    Updated,
    Unchanged,
    Deleted,
}

/// What happened to one namespace during a fan-out
#[derive(Debug)]
pub struct NamespaceOutcome {
    pub namespace: String,
    pub secret: String,
    pub result: Result<SecretAction>,
}

/// Per-namespace outcomes of a fan-out. Failures do not stop the other writes.
#[derive(Debug, Default)]
pub struct FanOutReport {
    pub outcomes: Vec<NamespaceOutcome>,
}

impl FanOutReport {
    pub fn count(&self, action: SecretAction) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Ok(a) if *a == action))
            .count()
    }

    /// Number of mutations sent to the cluster
    pub fn writes(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(a) if a != SecretAction::Unchanged))
            .count()
    }

    pub fn failures(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                o.result
                    .as_ref()
                    .err()
                    .map(|e| format!("{}/{}: {}", o.namespace, o.secret, e))
            })
            .collect()
    }

    /// Turn accumulated failures into one error so the key is retried
    pub fn into_result(self) -> Result<Self> {
        let failures = self.failures();
        if failures.is_empty() {
            Ok(self)
        } else {
            Err(DockyardError::PartialFanOut { failures })
        }
    }
}

/// Keeps exactly one pull secret per (registry, active namespace)
#[derive(Clone)]
pub struct SecretDistributor {
    store: Arc<dyn ClusterStore>,
    concurrency: usize,
}

impl SecretDistributor {
    pub fn new(store: Arc<dyn ClusterStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Upsert the registry's pull secret into every target namespace and delete
    /// owned copies anywhere else.
    #[instrument(skip(self, registry, credentials, targets), fields(registry = %registry.name_any(), targets = targets.len()))]
    pub async fn converge(
        &self,
        registry: &Registry,
        credentials: &RegistryCredentials,
        targets: &[String],
    ) -> Result<FanOutReport> {
        let namespaces: BTreeSet<&String> = targets.iter().collect();
        let desired = namespaces
            .into_iter()
            .map(|ns| build_pull_secret(registry, ns, credentials))
            .collect::<Result<Vec<_>>>()?;

        self.apply_plan(&OwnerRef::from_resource(registry), desired)
            .await
    }

    /// Delete every pull secret owned by the registry
    #[instrument(skip(self, registry), fields(registry = %registry.name_any()))]
    pub async fn remove_all(&self, registry: &Registry) -> Result<FanOutReport> {
        self.apply_plan(&OwnerRef::from_resource(registry), Vec::new())
            .await
    }

    async fn apply_plan(&self, owner: &OwnerRef, desired: Vec<Secret>) -> Result<FanOutReport> {
        let live: BTreeMap<(String, String), Secret> = self
            .store
            .list_owned_secrets(owner)
            .await?
            .into_iter()
            .map(|s| ((s.namespace().unwrap_or_default(), s.name_any()), s))
            .collect();

        let wanted: BTreeSet<(String, String)> = desired
            .iter()
            .map(|s| (s.namespace().unwrap_or_default(), s.name_any()))
            .collect();

        let mut tasks: Vec<BoxFuture<'_, NamespaceOutcome>> = Vec::new();

        for secret in desired {
            let key = (secret.namespace().unwrap_or_default(), secret.name_any());
            let current = live.get(&key).cloned();
            tasks.push(self.upsert(key, secret, current).boxed());
        }

        for key in live.keys().filter(|k| !wanted.contains(*k)) {
            tasks.push(self.remove(key.clone()).boxed());
        }

        let mut outcomes: Vec<NamespaceOutcome> = stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        outcomes.sort_by(|a, b| (&a.namespace, &a.secret).cmp(&(&b.namespace, &b.secret)));

        let report = FanOutReport { outcomes };
        info!(
            created = report.count(SecretAction::Created),
            updated = report.count(SecretAction::Updated),
            unchanged = report.count(SecretAction::Unchanged),
            deleted = report.count(SecretAction::Deleted),
            failed = report.failures().len(),
            "Converged pull secrets for {}",
            owner
        );
        Ok(report)
    }

    async fn upsert(
        &self,
        (namespace, name): (String, String),
        desired: Secret,
        current: Option<Secret>,
    ) -> NamespaceOutcome {
        let result = match current {
            Some(live) if is_up_to_date(&live, &desired) => {
                debug!("Pull secret {}/{} is up to date", namespace, name);
                Ok(SecretAction::Unchanged)
            }
            Some(_) => self
                .store
                .apply_secret(&desired)
                .await
                .map(|_| SecretAction::Updated),
            None => self
                .store
                .apply_secret(&desired)
                .await
                .map(|_| SecretAction::Created),
        };

        if let Err(e) = &result {
            warn!("Failed to write pull secret {}/{}: {}", namespace, name, e);
        }

        NamespaceOutcome {
            namespace,
            secret: name,
            result,
        }
    }

    async fn remove(&self, (namespace, name): (String, String)) -> NamespaceOutcome {
        let result = self
            .store
            .delete_secret(&namespace, &name)
            .await
            .map(|_| SecretAction::Deleted);

        match &result {
            Ok(_) => info!("Deleted pull secret {}/{}", namespace, name),
            Err(e) => warn!("Failed to delete pull secret {}/{}: {}", namespace, name, e),
        }

        NamespaceOutcome {
            namespace,
            secret: name,
            result,
        }
    }
}
