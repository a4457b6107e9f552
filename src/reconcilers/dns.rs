// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! DNS reconciler - publishes the records that route ingress and ACME traffic to this cluster.

use crate::config::{Config, ServiceRef};
use crate::constants::dns::{ACME_CHALLENGE_PREFIX, ACME_PREFIX, DASHBOARD_IP_PREFIX, NS_ACME_PREFIX};
use crate::error::{DockyardError, Result};
use crate::kubernetes::{fetch_load_balancer_ip, wait_for_crd};
use crate::providers::{CloudflareDns, DnsProvider, DnsRecord, RecordType};
use crate::runtime::{drain, requeue_after_error, requeue_after_success, resource_key, RetryTracker};
use crate::types::{HttpsCert, OperatorConfig, SaasModeConfig};
use k8s_openapi::api::core::v1::Service;
use kube::{
    runtime::{controller::Action, reflector::ObjectRef, reflector::Store, watcher, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Live cluster state the record set depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observations {
    pub ingress_ip: Option<String>,
    pub nameserver_ip: Option<String>,
    /// ACME challenge domain reported for the application domain's wildcard certificate
    pub challenge_domain: Option<String>,
}

/// Outcome of one pass over the desired records
#[derive(Debug, Default)]
pub struct UpsertReport {
    pub applied: Vec<DnsRecord>,
    pub failed: Vec<(DnsRecord, DockyardError)>,
}

impl UpsertReport {
    pub fn into_result(self) -> Result<Self> {
        if self.failed.is_empty() {
            return Ok(self);
        }
        Err(DockyardError::PartialDnsSync {
            attempted: self.applied.len() + self.failed.len(),
            failures: self
                .failed
                .iter()
                .map(|(record, e)| format!("{}: {}", record, e))
                .collect(),
        })
    }
}

pub struct DnsReconciler {
    client: Client,
    config: Config,
    retries: RetryTracker,
}

impl DnsReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        Self {
            client,
            config,
            retries: RetryTracker::default(),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        // HttpsCert is installed separately and must be watchable first
        info!("Waiting for HttpsCert CRD to become available...");
        wait_for_crd::<HttpsCert>(&self.client).await?;

        let configs: Api<OperatorConfig> =
            Api::namespaced(self.client.clone(), &self.config.operator_namespace);
        let controller = Controller::new(configs, watcher::Config::default());

        let ingress = self.config.ingress_service.clone();
        let nameserver = self.config.nameserver_service.clone();
        let ingress_api: Api<Service> = Api::namespaced(self.client.clone(), &ingress.namespace);
        let nameserver_api: Api<Service> =
            Api::namespaced(self.client.clone(), &nameserver.namespace);
        let certs: Api<HttpsCert> = Api::all(self.client.clone());

        let ingress_store = controller.store();
        let nameserver_store = controller.store();
        let cert_store = controller.store();
        let context = Arc::new(self);

        let results = controller
            .watches(ingress_api, service_watch(&ingress), move |_svc| {
                all_configs(&ingress_store)
            })
            .watches(nameserver_api, service_watch(&nameserver), move |_svc| {
                all_configs(&nameserver_store)
            })
            .watches(certs, watcher::Config::default(), move |_cert| {
                all_configs(&cert_store)
            })
            .run(reconcile, error_policy, context);

        drain(results, "operator config").await;
        Ok(())
    }

    #[instrument(skip(self, operator_config), fields(config = %operator_config.name_any()))]
    pub async fn apply(&self, operator_config: &OperatorConfig) -> Result<Action> {
        let key = resource_key(operator_config);

        let Some((saas, provider)) = operator_config.spec.dns_settings() else {
            info!("SaaS mode or DNS provider not configured, skipping DNS sync");
            return Ok(requeue_after_success(
                &self.retries,
                &key,
                self.config.resync_interval,
            ));
        };

        let dns = CloudflareDns::new(
            &self.config.cloudflare_api_url,
            &provider.api_token,
            provider.domain_to_zone_id.clone(),
            self.config.dns_timeout,
        )?;
        self.sync(saas, &dns).await?;

        Ok(requeue_after_success(
            &self.retries,
            &key,
            self.config.resync_interval,
        ))
    }

    /// Observe, compute and upsert the full record set against `dns`
    pub async fn sync(&self, saas: &SaasModeConfig, dns: &dyn DnsProvider) -> Result<UpsertReport> {
        let observations = observe(&self.client, &self.config, saas).await;
        debug!("Observed {:?}", observations);

        let records = desired_records(saas, &observations);
        let report = upsert_all(dns, &records).await;
        info!(
            applied = report.applied.len(),
            failed = report.failed.len(),
            "Synced DNS records for {}",
            saas.base_dns_domain
        );
        report.into_result()
    }
}

/// Gather load balancer IPs and the certificate challenge domain.
/// Anything unreadable is reported as not available.
pub async fn observe(client: &Client, config: &Config, saas: &SaasModeConfig) -> Observations {
    let ingress_ip = fetch_load_balancer_ip(client, &config.ingress_service).await;
    let nameserver_ip = fetch_load_balancer_ip(client, &config.nameserver_service).await;

    let challenge_domain = if saas.base_app_domain.is_empty() {
        None
    } else {
        fetch_challenge_domain(client, &saas.base_app_domain).await
    };

    Observations {
        ingress_ip,
        nameserver_ip,
        challenge_domain,
    }
}

async fn fetch_challenge_domain(client: &Client, domain: &str) -> Option<String> {
    let certs: Api<HttpsCert> = Api::all(client.clone());
    let name = HttpsCert::wildcard_name(domain);

    match certs.get_opt(&name).await {
        Ok(Some(cert)) => cert.challenge_domain(domain).map(str::to_string),
        Ok(None) => {
            debug!("HttpsCert {} not found", name);
            None
        }
        Err(e) => {
            warn!("Failed to read HttpsCert {}: {}", name, e);
            None
        }
    }
}

/// The records this cluster should have, in upsert order
pub fn desired_records(saas: &SaasModeConfig, obs: &Observations) -> Vec<DnsRecord> {
    let base_dns = saas.base_dns_domain.as_str();
    let ns_host = format!("{}.{}", NS_ACME_PREFIX, base_dns);
    let mut records = vec![DnsRecord::new(
        RecordType::Ns,
        format!("{}.{}", ACME_PREFIX, base_dns),
        ns_host.clone(),
    )];

    if let Some(ip) = &obs.nameserver_ip {
        records.push(DnsRecord::new(RecordType::A, ns_host, ip.clone()));
    }

    let app = saas.base_app_domain.as_str();
    if !app.is_empty() {
        if let Some(challenge) = &obs.challenge_domain {
            records.push(DnsRecord::new(
                RecordType::Cname,
                format!("{}.{}", ACME_CHALLENGE_PREFIX, app),
                challenge.clone(),
            ));
        }
        if let Some(ip) = &obs.ingress_ip {
            records.push(DnsRecord::new(RecordType::A, app, ip.clone()));
            records.push(DnsRecord::new(RecordType::A, format!("*.{}", app), ip.clone()));
        }
    }

    if let Some(ip) = &obs.ingress_ip {
        records.push(DnsRecord::new(
            RecordType::A,
            format!("{}.{}", DASHBOARD_IP_PREFIX, base_dns),
            ip.clone(),
        ));
    }

    records
}

/// Upsert every record; one rejection does not stop the rest
pub async fn upsert_all(dns: &dyn DnsProvider, records: &[DnsRecord]) -> UpsertReport {
    let mut report = UpsertReport::default();

    for record in records {
        match dns.upsert_record(record).await {
            Ok(()) => report.applied.push(record.clone()),
            Err(e) => {
                warn!("Failed to upsert {}: {}", record, e);
                report.failed.push((record.clone(), e));
            }
        }
    }

    report
}

fn service_watch(svc: &ServiceRef) -> watcher::Config {
    watcher::Config::default().fields(&format!("metadata.name={}", svc.name))
}

fn all_configs(store: &Store<OperatorConfig>) -> Vec<ObjectRef<OperatorConfig>> {
    store
        .state()
        .iter()
        .map(|c| ObjectRef::from_obj(c.as_ref()))
        .collect()
}

async fn reconcile(operator_config: Arc<OperatorConfig>, ctx: Arc<DnsReconciler>) -> Result<Action> {
    ctx.apply(&operator_config).await
}

fn error_policy(
    operator_config: Arc<OperatorConfig>,
    error: &DockyardError,
    ctx: Arc<DnsReconciler>,
) -> Action {
    requeue_after_error(&ctx.retries, &resource_key(operator_config.as_ref()), error)
}
