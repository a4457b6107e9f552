// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::labels::MAX_VALUE_LEN;
use crate::constants::registry::{CREDENTIAL_SECRET_SUFFIX, PULL_SECRET_SUFFIX};
use crate::error::{DockyardError, Result};
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use url::Url;

/// A container registry whose credentials are distributed as pull secrets
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[kube(group = "dockyard.geeko.me", version = "v1alpha1", kind = "Registry")]
#[kube(status = "RegistryStatus")]
#[kube(printcolumn = r#"{"name":"Host","type":"string","jsonPath":".spec.host"}"#)]
#[kube(printcolumn = r#"{"name":"Verified","type":"boolean","jsonPath":".status.authenticationVerified"}"#)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySpec {
    /// Registry base URL, e.g. `https://gcr.io`
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_secret_ref: Option<SecretRef>,
}

/// Reference to the Secret holding `username` and `password`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatus {
    #[serde(default)]
    pub authentication_verified: bool,
    /// When the current verification outcome was first observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified_at: Option<String>,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Registry {
    /// Resolve the credential secret as `(namespace, name)`
    pub fn credential_secret(&self, operator_namespace: &str) -> (String, String) {
        match &self.spec.credential_secret_ref {
            Some(r) => (
                r.namespace
                    .clone()
                    .unwrap_or_else(|| operator_namespace.to_string()),
                r.name.clone(),
            ),
            None => (
                operator_namespace.to_string(),
                format!("{}{}", self.name_any(), CREDENTIAL_SECRET_SUFFIX),
            ),
        }
    }

    /// Name of the pull secret distributed into workload namespaces
    pub fn pull_secret_name(&self) -> String {
        format!("{}{}", self.name_any(), PULL_SECRET_SUFFIX)
    }

    /// Check that the name fits the owner label and the host is an absolute http(s) URL
    pub fn validate(&self) -> Result<()> {
        let name = self.name_any();
        if name.len() > MAX_VALUE_LEN {
            return Err(DockyardError::InvalidSpec(format!(
                "name '{}' is longer than {} characters and cannot be used as a label value",
                name, MAX_VALUE_LEN
            )));
        }

        let url = Url::parse(&self.spec.host).map_err(|e| {
            DockyardError::InvalidSpec(format!("host '{}' is not a URL: {}", self.spec.host, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(DockyardError::InvalidSpec(format!(
                "host '{}' must use http or https",
                self.spec.host
            )));
        }
        if url.host_str().unwrap_or_default().is_empty() {
            return Err(DockyardError::InvalidSpec(format!(
                "host '{}' has no hostname",
                self.spec.host
            )));
        }

        Ok(())
    }

    pub fn is_verified(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.authentication_verified)
    }
}
