// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Namespace/name reference to a Service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    pub namespace: String,
    pub name: String,
}

impl ServiceRef {
    /// Parse `namespace/name`, or a bare `name` resolved in `default_namespace`
    pub fn parse(value: &str, default_namespace: &str) -> Result<Self> {
        match value.split_once('/') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => Ok(ServiceRef {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            Some(_) => bail!("invalid service reference '{}'", value),
            None if value.is_empty() => bail!("empty service reference"),
            None => Ok(ServiceRef {
                namespace: default_namespace.to_string(),
                name: value.to_string(),
            }),
        }
    }
}

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace the operator runs in; holds credential secrets and the OperatorConfig
    pub operator_namespace: String,
    /// Interval after which a converged resource is reconciled again
    pub resync_interval: Duration,
    /// Maximum number of namespaces written concurrently during fan-out
    pub fanout_concurrency: usize,
    /// Timeout for calls to registry authentication endpoints
    pub registry_timeout: Duration,
    /// Timeout for calls to the DNS provider API
    pub dns_timeout: Duration,
    /// Load balancer Service fronting cluster ingress
    pub ingress_service: ServiceRef,
    /// Load balancer Service exposing the ACME name server
    pub nameserver_service: ServiceRef,
    pub cloudflare_api_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let operator_namespace = env::var("OPERATOR_NAMESPACE")
            .context("OPERATOR_NAMESPACE environment variable not set")?;

        let resync_secs: u64 = parse_var("RESYNC_INTERVAL_SECS", 300)?;
        let fanout_concurrency: usize = parse_var("FANOUT_CONCURRENCY", 8)?;
        let registry_timeout_secs: u64 = parse_var("REGISTRY_TIMEOUT_SECS", 10)?;
        let dns_timeout_secs: u64 = parse_var("DNS_TIMEOUT_SECS", 10)?;

        let ingress_service = ServiceRef::parse(
            &env::var("INGRESS_SERVICE")
                .unwrap_or_else(|_| "istio-system/istio-ingressgateway".to_string()),
            &operator_namespace,
        )
        .context("INGRESS_SERVICE is invalid")?;
        let nameserver_service = ServiceRef::parse(
            &env::var("NAMESERVER_SERVICE").unwrap_or_else(|_| "lb-svc-acme-server".to_string()),
            &operator_namespace,
        )
        .context("NAMESERVER_SERVICE is invalid")?;

        let cloudflare_api_url = env::var("CLOUDFLARE_API_URL")
            .unwrap_or_else(|_| DEFAULT_CLOUDFLARE_API_URL.to_string());

        Ok(Config {
            operator_namespace,
            resync_interval: Duration::from_secs(resync_secs),
            fanout_concurrency: fanout_concurrency.max(1),
            registry_timeout: Duration::from_secs(registry_timeout_secs),
            dns_timeout: Duration::from_secs(dns_timeout_secs),
            ingress_service,
            nameserver_service,
            cloudflare_api_url,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
