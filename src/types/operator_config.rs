// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operating mode and DNS settings of the platform
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "dockyard.geeko.me", version = "v1alpha1", kind = "OperatorConfig")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfigSpec {
    /// Present when the cluster runs in SaaS mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saas_mode: Option<SaasModeConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaasModeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_provider: Option<DnsProviderConfig>,
    /// Domain under which the ACME server and dashboard records live
    #[serde(default)]
    pub base_dns_domain: String,
    /// Domain under which applications are exposed
    #[serde(default)]
    pub base_app_domain: String,
}

/// Cloudflare credentials
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsProviderConfig {
    pub api_token: String,
    /// Maps a domain to the id of the zone that serves it
    #[serde(default)]
    pub domain_to_zone_id: BTreeMap<String, String>,
}

impl OperatorConfigSpec {
    /// The SaaS settings when DNS records should be managed.
    /// Missing mode, credentials or base DNS domain all mean "nothing to do".
    pub fn dns_settings(&self) -> Option<(&SaasModeConfig, &DnsProviderConfig)> {
        let saas = self.saas_mode.as_ref()?;
        let provider = saas.dns_provider.as_ref()?;
        if provider.api_token.is_empty() || saas.base_dns_domain.is_empty() {
            return None;
        }
        Some((saas, provider))
    }
}
