// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster reads and writes performed by the registry reconciler.

use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use crate::kubernetes::namespaces::list_active_namespaces;
use crate::sync::ownership::OwnerRef;
use crate::types::{Registry, RegistryStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams},
    Api, Client, ResourceExt,
};
use serde_json::json;
use tracing::{debug, instrument};

#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Namespaces that should hold pull secrets, listed fresh on every call
    async fn list_active_namespaces(&self) -> Result<Vec<String>>;

    /// Secrets in any namespace carrying `owner`'s relation
    async fn list_owned_secrets(&self, owner: &OwnerRef) -> Result<Vec<Secret>>;

    /// Create or update a secret
    async fn apply_secret(&self, secret: &Secret) -> Result<()>;

    /// Delete a secret; deleting a missing secret succeeds
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()>;

    async fn update_registry_status(&self, name: &str, status: &RegistryStatus) -> Result<()>;
}

/// `ClusterStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl KubeClusterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(secrets.get_opt(name).await?)
    }

    async fn list_active_namespaces(&self) -> Result<Vec<String>> {
        list_active_namespaces(&self.client).await
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn list_owned_secrets(&self, owner: &OwnerRef) -> Result<Vec<Secret>> {
        let secrets: Api<Secret> = Api::all(self.client.clone());
        let lp = ListParams::default().labels(&owner.selector());

        Ok(secrets
            .list(&lp)
            .await?
            .items
            .into_iter()
            .filter(|s| owner.owns(&s.metadata))
            .collect())
    }

    async fn apply_secret(&self, secret: &Secret) -> Result<()> {
        let namespace = secret.namespace().unwrap_or_default();
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);

        let pp = PatchParams::apply(OPERATOR_NAME).force();
        secrets
            .patch(&secret.name_any(), &pp, &Patch::Apply(secret))
            .await?;
        Ok(())
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        match secrets.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("Secret {}/{} already gone", namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_registry_status(&self, name: &str, status: &RegistryStatus) -> Result<()> {
        let registries: Api<Registry> = Api::all(self.client.clone());

        // Explicit nulls so a merge patch clears fields that are no longer set
        let patch = json!({
            "status": {
                "authenticationVerified": status.authentication_verified,
                "lastVerifiedAt": status.last_verified_at,
                "repositories": status.repositories,
                "message": status.message,
            }
        });
        registries
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
