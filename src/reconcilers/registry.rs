// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Registry reconciler - verifies registry credentials and distributes pull secrets.

use crate::config::Config;
use crate::constants::finalizers::REGISTRY_CLEANUP;
use crate::error::{DockyardError, Result};
use crate::kubernetes::namespaces::enabled_selector;
use crate::kubernetes::ClusterStore;
use crate::providers::RegistryAuth;
use crate::runtime::{drain, requeue_after_error, requeue_after_success, resource_key, RetryTracker};
use crate::sync::{OwnerRef, RegistryCredentials, SecretDistributor};
use crate::types::{Registry, RegistryStatus};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::{
    runtime::{
        controller::Action,
        finalizer::{finalizer, Error as FinalizerError, Event},
        reflector::ObjectRef,
        watcher, Controller,
    },
    Api, Client, Resource, ResourceExt,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct RegistryReconciler {
    client: Client,
    config: Config,
    store: Arc<dyn ClusterStore>,
    auth: Arc<dyn RegistryAuth>,
    distributor: SecretDistributor,
    retries: RetryTracker,
}

impl RegistryReconciler {
    pub fn new(
        client: Client,
        config: Config,
        store: Arc<dyn ClusterStore>,
        auth: Arc<dyn RegistryAuth>,
    ) -> Self {
        let distributor = SecretDistributor::new(store.clone(), config.fanout_concurrency);
        Self {
            client,
            config,
            store,
            auth,
            distributor,
            retries: RetryTracker::default(),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let registries: Api<Registry> = Api::all(self.client.clone());
        let secrets: Api<Secret> = Api::all(self.client.clone());
        let namespaces: Api<Namespace> = Api::all(self.client.clone());

        let controller = Controller::new(registries, watcher::Config::default());
        let secret_store = controller.store();
        let namespace_store = controller.store();
        let operator_namespace = self.config.operator_namespace.clone();
        let context = Arc::new(self);

        let results = controller
            .watches(secrets, watcher::Config::default(), move |secret| {
                registries_for_secret(&secret, &secret_store.state(), &operator_namespace)
            })
            .watches(
                namespaces,
                watcher::Config::default().labels(&enabled_selector()),
                move |_namespace| {
                    namespace_store
                        .state()
                        .iter()
                        .map(|r| ObjectRef::from_obj(r.as_ref()))
                        .collect::<Vec<_>>()
                },
            )
            .run(reconcile, error_policy, context);

        drain(results, "registry").await;
        Ok(())
    }

    /// Verify credentials, publish the outcome and fan out pull secrets
    #[instrument(skip(self, registry), fields(registry = %registry.name_any()))]
    pub async fn apply(&self, registry: &Registry) -> Result<Action> {
        if let Err(e) = registry.validate() {
            self.write_status(registry, false, known_repositories(registry), Some(e.to_string()))
                .await?;
            return Err(e);
        }

        let (secret_namespace, secret_name) =
            registry.credential_secret(&self.config.operator_namespace);
        let credentials = self
            .store
            .get_secret(&secret_namespace, &secret_name)
            .await?
            .as_ref()
            .and_then(RegistryCredentials::from_secret);

        let Some(credentials) = credentials else {
            info!(
                "Credential secret {}/{} is missing or has no username/password",
                secret_namespace, secret_name
            );
            self.write_status(
                registry,
                false,
                known_repositories(registry),
                Some(format!(
                    "credential secret {}/{} not found or incomplete",
                    secret_namespace, secret_name
                )),
            )
            .await?;
            return Ok(requeue_after_success(
                &self.retries,
                &resource_key(registry),
                self.config.resync_interval,
            ));
        };

        let verified = match self
            .auth
            .verify_credentials(&registry.spec.host, &credentials.username, &credentials.password)
            .await
        {
            Ok(verified) => verified,
            Err(e) if !e.is_transient() => {
                self.write_status(registry, false, known_repositories(registry), Some(e.to_string()))
                    .await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if !verified {
            info!("Registry {} rejected the credentials", registry.spec.host);
            self.write_status(
                registry,
                false,
                known_repositories(registry),
                Some("registry rejected the credentials".to_string()),
            )
            .await?;
            return Ok(requeue_after_success(
                &self.retries,
                &resource_key(registry),
                self.config.resync_interval,
            ));
        }

        let repositories = match self
            .auth
            .list_repositories(&registry.spec.host, &credentials.username, &credentials.password)
            .await
        {
            Ok(repositories) => repositories,
            Err(e) => {
                warn!("Failed to list repositories: {}", e);
                known_repositories(registry)
            }
        };

        let targets = self.store.list_active_namespaces().await?;
        let fan_out = self
            .distributor
            .converge(registry, &credentials, &targets)
            .await;

        // Verification outcome is published even if some namespaces failed
        self.write_status(registry, true, repositories, None).await?;
        fan_out?.into_result()?;

        Ok(requeue_after_success(
            &self.retries,
            &resource_key(registry),
            self.config.resync_interval,
        ))
    }

    /// Remove every pull secret the registry owns. An error keeps the finalizer in place.
    #[instrument(skip(self, registry), fields(registry = %registry.name_any()))]
    pub async fn cleanup(&self, registry: &Registry) -> Result<Action> {
        self.distributor.remove_all(registry).await?.into_result()?;
        info!("Removed all pull secrets of registry {}", registry.name_any());
        self.retries.reset(&resource_key(registry));
        Ok(Action::await_change())
    }

    async fn write_status(
        &self,
        registry: &Registry,
        verified: bool,
        repositories: Vec<String>,
        message: Option<String>,
    ) -> Result<()> {
        let current = registry.status.as_ref();
        let next = next_status(current, verified, repositories, message, Utc::now());

        if current == Some(&next) {
            debug!("Registry status unchanged");
            return Ok(());
        }

        if registry.is_verified() != verified {
            info!(
                "Registry authentication verified changed to {}",
                verified
            );
        }
        self.store
            .update_registry_status(&registry.name_any(), &next)
            .await
    }
}

/// Repositories from the last successful catalog listing. Only a new listing replaces them.
fn known_repositories(registry: &Registry) -> Vec<String> {
    registry
        .status
        .as_ref()
        .map(|s| s.repositories.clone())
        .unwrap_or_default()
}

/// Status after a verification. `lastVerifiedAt` only moves when the outcome flips.
pub fn next_status(
    current: Option<&RegistryStatus>,
    verified: bool,
    repositories: Vec<String>,
    message: Option<String>,
    now: DateTime<Utc>,
) -> RegistryStatus {
    let last_verified_at = match current {
        Some(s) if s.authentication_verified == verified && s.last_verified_at.is_some() => {
            s.last_verified_at.clone()
        }
        _ => Some(now.to_rfc3339()),
    };

    RegistryStatus {
        authentication_verified: verified,
        last_verified_at,
        repositories,
        message,
    }
}

/// Registries to reconcile when a secret changes: the owner of a distributed
/// pull secret, or every registry reading its credentials from it.
pub fn registries_for_secret(
    secret: &Secret,
    registries: &[Arc<Registry>],
    operator_namespace: &str,
) -> Vec<ObjectRef<Registry>> {
    if let Some(owner) = secret.metadata.labels.as_ref().and_then(OwnerRef::from_labels) {
        if owner.kind == Registry::kind(&()) {
            return vec![ObjectRef::new(&owner.name)];
        }
    }

    let key = (secret.namespace().unwrap_or_default(), secret.name_any());
    registries
        .iter()
        .filter(|r| r.credential_secret(operator_namespace) == key)
        .map(|r| ObjectRef::from_obj(r.as_ref()))
        .collect()
}

async fn reconcile(registry: Arc<Registry>, ctx: Arc<RegistryReconciler>) -> Result<Action> {
    let registries: Api<Registry> = Api::all(ctx.client.clone());
    let handler = ctx.clone();

    finalizer(&registries, REGISTRY_CLEANUP, registry, |event| async move {
        match event {
            Event::Apply(registry) => handler.apply(&registry).await,
            Event::Cleanup(registry) => handler.cleanup(&registry).await,
        }
    })
    .await
    .map_err(|e| match e {
        FinalizerError::ApplyFailed(err) | FinalizerError::CleanupFailed(err) => err,
        other => DockyardError::FinalizerError(other.to_string()),
    })
}

fn error_policy(
    registry: Arc<Registry>,
    error: &DockyardError,
    ctx: Arc<RegistryReconciler>,
) -> Action {
    requeue_after_error(&ctx.retries, &resource_key(registry.as_ref()), error)
}
