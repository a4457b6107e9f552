// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mocked Kubernetes API, canned resource bodies and
//! in-memory fakes for the reconciler seams.

use crate::config::{Config, ServiceRef};
use crate::constants::labels;
use crate::error::{DockyardError, Result as DockyardResult};
use crate::kubernetes::ClusterStore;
use crate::providers::{DnsProvider, DnsRecord, RegistryAuth};
use crate::sync::OwnerRef;
use crate::types::RegistryStatus;
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(("GET".to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);

        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create a mock namespace list JSON response from `(name, enabled, phase)` entries
pub fn namespace_list_json(namespaces: &[(&str, bool, &str)]) -> String {
    let items: Vec<serde_json::Value> = namespaces
        .iter()
        .map(|(name, enabled, phase)| {
            let ns_labels = BTreeMap::from([(labels::ENABLED, enabled.to_string())]);
            serde_json::json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": {
                    "name": name,
                    "uid": format!("uid-{}", name),
                    "labels": ns_labels
                },
                "status": { "phase": phase }
            })
        })
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "NamespaceList",
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Create a mock LoadBalancer service JSON response, with an ingress IP once assigned
pub fn service_json(namespace: &str, name: &str, ip: Option<&str>) -> String {
    let ingress: Vec<serde_json::Value> = ip
        .map(|ip| vec![serde_json::json!({ "ip": ip })])
        .unwrap_or_default();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "test-uid"
        },
        "spec": { "type": "LoadBalancer" },
        "status": { "loadBalancer": { "ingress": ingress } }
    })
    .to_string()
}

fn secret_value(namespace: &str, name: &str, labels: Option<&BTreeMap<String, String>>) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": format!("uid-{}-{}", namespace, name),
            "labels": labels.cloned().unwrap_or_default()
        },
        "type": "Opaque",
        "data": {}
    })
}

/// Create a mock secret JSON response
pub fn secret_json(namespace: &str, name: &str, labels: Option<&BTreeMap<String, String>>) -> String {
    secret_value(namespace, name, labels).to_string()
}

/// Create a mock secret list JSON response from `(namespace, name, labels)` entries
pub fn secret_list_json(secrets: &[(&str, &str, Option<&BTreeMap<String, String>>)]) -> String {
    let items: Vec<serde_json::Value> = secrets
        .iter()
        .map(|(namespace, name, labels)| secret_value(namespace, name, *labels))
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "SecretList",
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Create a mock HttpsCert JSON response reporting a challenge domain for `domain`
pub fn httpscert_json(name: &str, domain: &str, challenge: &str) -> String {
    serde_json::json!({
        "apiVersion": "dockyard.geeko.me/v1alpha1",
        "kind": "HttpsCert",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        },
        "spec": { "domains": [domain, format!("*.{}", domain)] },
        "status": {
            "wildcardCertDnsChallengeDomainMap": { domain: challenge }
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Credential secret holding `username` and `password` in `data`
pub fn make_credential_secret(namespace: &str, name: &str, username: &str, password: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([
            ("username".to_string(), ByteString(username.as_bytes().to_vec())),
            ("password".to_string(), ByteString(password.as_bytes().to_vec())),
        ])),
        ..Default::default()
    }
}

pub fn test_config() -> Config {
    Config {
        operator_namespace: "dockyard-system".to_string(),
        resync_interval: Duration::from_secs(300),
        fanout_concurrency: 4,
        registry_timeout: Duration::from_secs(5),
        dns_timeout: Duration::from_secs(5),
        ingress_service: ServiceRef {
            namespace: "istio-system".to_string(),
            name: "istio-ingressgateway".to_string(),
        },
        nameserver_service: ServiceRef {
            namespace: "dockyard-system".to_string(),
            name: "lb-svc-acme-server".to_string(),
        },
        cloudflare_api_url: "http://127.0.0.1:1".to_string(),
    }
}

fn rejected(namespace: &str, name: &str) -> DockyardError {
    DockyardError::KubeError(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("secrets \"{}\" is forbidden in {}", name, namespace),
        reason: "Forbidden".to_string(),
        code: 403,
    }))
}

/// In-memory cluster holding secrets, active namespaces and registry statuses
#[derive(Default)]
pub struct FakeCluster {
    secrets: Mutex<BTreeMap<(String, String), Secret>>,
    namespaces: Mutex<Vec<String>>,
    statuses: Mutex<BTreeMap<String, RegistryStatus>>,
    failing: Mutex<BTreeSet<String>>,
    writes: AtomicUsize,
    status_writes: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_secret(&self, secret: Secret) {
        let key = (secret.namespace().unwrap_or_default(), secret.name_any());
        self.secrets.lock().unwrap().insert(key, secret);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Keys of the secrets carrying an owner relation, sorted
    pub fn secret_keys(&self) -> Vec<(String, String)> {
        self.secrets
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s.labels().contains_key(labels::OWNER_KIND))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn set_namespaces(&self, names: &[&str]) {
        *self.namespaces.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
    }

    /// Reject every secret write and delete in `namespace`
    pub fn fail_writes_in(&self, namespace: &str) {
        self.failing.lock().unwrap().insert(namespace.to_string());
    }

    pub fn allow_writes_in(&self, namespace: &str) {
        self.failing.lock().unwrap().remove(namespace);
    }

    /// Number of secret writes and deletes that reached the cluster
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    pub fn registry_status(&self, name: &str) -> Option<RegistryStatus> {
        self.statuses.lock().unwrap().get(name).cloned()
    }

    fn check_writable(&self, namespace: &str, name: &str) -> DockyardResult<()> {
        if self.failing.lock().unwrap().contains(namespace) {
            return Err(rejected(namespace, name));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterStore for FakeCluster {
    async fn get_secret(&self, namespace: &str, name: &str) -> DockyardResult<Option<Secret>> {
        Ok(self.secret(namespace, name))
    }

    async fn list_active_namespaces(&self) -> DockyardResult<Vec<String>> {
        let mut names = self.namespaces.lock().unwrap().clone();
        names.sort();
        Ok(names)
    }

    async fn list_owned_secrets(&self, owner: &OwnerRef) -> DockyardResult<Vec<Secret>> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .values()
            .filter(|s| owner.owns(&s.metadata))
            .cloned()
            .collect())
    }

    async fn apply_secret(&self, secret: &Secret) -> DockyardResult<()> {
        let namespace = secret.namespace().unwrap_or_default();
        self.check_writable(&namespace, &secret.name_any())?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.put_secret(secret.clone());
        Ok(())
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> DockyardResult<()> {
        self.check_writable(namespace, name)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn update_registry_status(&self, name: &str, status: &RegistryStatus) -> DockyardResult<()> {
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .insert(name.to_string(), status.clone());
        Ok(())
    }
}

/// Registry accepting a single username/password pair
pub struct FakeRegistry {
    username: String,
    password: String,
    repositories: Vec<String>,
    unreachable: AtomicBool,
    not_a_registry: AtomicBool,
    probes: AtomicUsize,
}

impl FakeRegistry {
    pub fn accepting(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            repositories: vec!["team/app".to_string()],
            unreachable: AtomicBool::new(false),
            not_a_registry: AtomicBool::new(false),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Answer like a host that does not serve the registry API
    pub fn set_not_a_registry(&self, not_a_registry: bool) {
        self.not_a_registry.store(not_a_registry, Ordering::SeqCst);
    }

    /// Number of credential probes received
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn accepts(&self, host: &str, username: &str, password: &str) -> DockyardResult<bool> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DockyardError::RegistryError(format!("{} timed out", host)));
        }
        if self.not_a_registry.load(Ordering::SeqCst) {
            return Err(DockyardError::InvalidSpec(format!(
                "{}/v2/ answered 404 Not Found, host is not a Docker registry",
                host
            )));
        }
        Ok(username == self.username && password == self.password)
    }
}

#[async_trait]
impl RegistryAuth for FakeRegistry {
    async fn verify_credentials(&self, host: &str, username: &str, password: &str) -> DockyardResult<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.accepts(host, username, password)
    }

    async fn list_repositories(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> DockyardResult<Vec<String>> {
        match self.accepts(host, username, password)? {
            true => Ok(self.repositories.clone()),
            false => Err(DockyardError::RegistryError("unauthorized".to_string())),
        }
    }
}

/// DNS zone keeping one record per (type, name); names in the reject set fail
#[derive(Default)]
pub struct FakeDns {
    records: Mutex<BTreeMap<(String, String), String>>,
    rejected: Mutex<BTreeSet<String>>,
}

impl FakeDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, name: &str) {
        self.rejected.lock().unwrap().insert(name.to_string());
    }

    pub fn accept(&self, name: &str) {
        self.rejected.lock().unwrap().remove(name);
    }

    /// Stored records as `(type, name) -> target`
    pub fn records(&self) -> BTreeMap<(String, String), String> {
        self.records.lock().unwrap().clone()
    }

    pub fn target(&self, record_type: &str, name: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(&(record_type.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DnsProvider for FakeDns {
    async fn upsert_record(&self, record: &DnsRecord) -> DockyardResult<()> {
        if self.rejected.lock().unwrap().contains(&record.name) {
            return Err(DockyardError::DnsProviderError(format!(
                "record {} rejected",
                record.name
            )));
        }
        self.records.lock().unwrap().insert(
            (record.record_type.to_string(), record.name.clone()),
            record.target.clone(),
        );
        Ok(())
    }
}
