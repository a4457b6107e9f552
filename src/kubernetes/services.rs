// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Load balancer address lookup

use crate::config::ServiceRef;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use tracing::{debug, instrument};

/// First ingress IP the load balancer assigned to a Service
pub fn load_balancer_ip(service: &Service) -> Option<String> {
    service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first())
        .and_then(|i| i.ip.clone())
        .filter(|ip| !ip.is_empty())
}

/// Fetch a Service and return its load balancer IP. Lookup failures count as "no IP yet".
#[instrument(skip(client), fields(service = %format!("{}/{}", svc.namespace, svc.name)))]
pub async fn fetch_load_balancer_ip(client: &Client, svc: &ServiceRef) -> Option<String> {
    let services: Api<Service> = Api::namespaced(client.clone(), &svc.namespace);

    match services.get(&svc.name).await {
        Ok(service) => load_balancer_ip(&service),
        Err(e) => {
            debug!("Failed to get service: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{service_json, MockService};

    #[test]
    fn test_load_balancer_ip_missing_status() {
        assert_eq!(load_balancer_ip(&Service::default()), None);
    }

    #[tokio::test]
    async fn test_fetch_load_balancer_ip() {
        let client = MockService::new()
            .on_get(
                "/api/v1/namespaces/istio-system/services/istio-ingressgateway",
                200,
                &service_json("istio-system", "istio-ingressgateway", Some("203.0.113.7")),
            )
            .into_client();
        let svc = ServiceRef {
            namespace: "istio-system".to_string(),
            name: "istio-ingressgateway".to_string(),
        };

        assert_eq!(
            fetch_load_balancer_ip(&client, &svc).await,
            Some("203.0.113.7".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_load_balancer_ip_pending() {
        let client = MockService::new()
            .on_get(
                "/api/v1/namespaces/dockyard-system/services/lb-svc-acme-server",
                200,
                &service_json("dockyard-system", "lb-svc-acme-server", None),
            )
            .into_client();
        let svc = ServiceRef {
            namespace: "dockyard-system".to_string(),
            name: "lb-svc-acme-server".to_string(),
        };

        assert_eq!(fetch_load_balancer_ip(&client, &svc).await, None);
    }

    #[tokio::test]
    async fn test_fetch_load_balancer_ip_not_found() {
        let client = MockService::new().into_client();
        let svc = ServiceRef {
            namespace: "istio-system".to_string(),
            name: "istio-ingressgateway".to_string(),
        };

        assert_eq!(fetch_load_balancer_ip(&client, &svc).await, None);
    }
}
