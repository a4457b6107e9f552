// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::dns::WILDCARD_CERT_PREFIX;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Certificate issued by the certificate controller. Dockyard only reads its status.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "dockyard.geeko.me", version = "v1alpha1", kind = "HttpsCert")]
#[kube(status = "HttpsCertStatus")]
#[serde(rename_all = "camelCase")]
pub struct HttpsCertSpec {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpsCertStatus {
    /// Domain → intermediate domain answering its DNS-01 challenge
    #[serde(default)]
    pub wildcard_cert_dns_challenge_domain_map: BTreeMap<String, String>,
}

impl HttpsCert {
    /// Name of the wildcard certificate covering `domain`
    pub fn wildcard_name(domain: &str) -> String {
        format!("{}{}", WILDCARD_CERT_PREFIX, domain.replace('.', "-"))
    }

    /// Challenge domain reported for `domain`, once issuance reached the DNS-01 stage
    pub fn challenge_domain(&self, domain: &str) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.wildcard_cert_dns_challenge_domain_map.get(domain))
            .map(String::as_str)
            .filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_name() {
        assert_eq!(
            HttpsCert::wildcard_name("apps.example.com"),
            "wildcard-apps-example-com"
        );
    }

    #[test]
    fn test_challenge_domain() {
        let mut cert = HttpsCert::new("wildcard-apps-example-com", HttpsCertSpec::default());
        assert_eq!(cert.challenge_domain("apps.example.com"), None);

        cert.status = Some(HttpsCertStatus {
            wildcard_cert_dns_challenge_domain_map: BTreeMap::from([(
                "apps.example.com".to_string(),
                "abc.acme.dns.example.com".to_string(),
            )]),
        });
        assert_eq!(
            cert.challenge_domain("apps.example.com"),
            Some("abc.acme.dns.example.com")
        );
        assert_eq!(cert.challenge_domain("other.example.com"), None);
    }
}
