// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name used for server-side apply
pub const OPERATOR_NAME: &str = "dockyard";

/// Kubernetes label keys used by Dockyard
pub mod labels {
    /// When set to "true", the namespace receives distributed pull secrets
    pub const ENABLED: &str = "dockyard.geeko.me/enabled";
    /// Kind of the resource owning a distributed object
    pub const OWNER_KIND: &str = "dockyard.geeko.me/owner-kind";
    /// Name of the resource owning a distributed object
    pub const OWNER_NAME: &str = "dockyard.geeko.me/owner-name";
    /// Namespace of the owning resource, absent for cluster-scoped owners
    pub const OWNER_NAMESPACE: &str = "dockyard.geeko.me/owner-namespace";
    /// Kubernetes limit on label values; owner names must fit
    pub const MAX_VALUE_LEN: usize = 63;
}

/// Kubernetes annotation keys used by Dockyard
pub mod annotations {
    /// Full `Kind/namespace/name` reference to the owner of a distributed object
    pub const OWNER: &str = "dockyard.geeko.me/owner";
}

/// Finalizer names
pub mod finalizers {
    pub const REGISTRY_CLEANUP: &str = "dockyard.geeko.me/registry-cleanup";
}

/// Registry and pull secret conventions
pub mod registry {
    /// Key holding the username in a credential secret
    pub const USERNAME_KEY: &str = "username";
    /// Key holding the password in a credential secret
    pub const PASSWORD_KEY: &str = "password";
    /// Secret type of distributed pull secrets
    pub const PULL_SECRET_TYPE: &str = "kubernetes.io/dockercfg";
    /// Data key of distributed pull secrets
    pub const PULL_SECRET_KEY: &str = ".dockercfg";
    /// Suffix of the default credential secret name
    pub const CREDENTIAL_SECRET_SUFFIX: &str = "-authentication";
    /// Suffix of the distributed pull secret name
    pub const PULL_SECRET_SUFFIX: &str = "-image-pull-secret";
}

/// DNS naming conventions for the SaaS mode records
pub mod dns {
    /// Sub-domain delegated to the ACME DNS server
    pub const ACME_PREFIX: &str = "acme";
    /// Sub-domain of the ACME name server itself
    pub const NS_ACME_PREFIX: &str = "ns-acme";
    /// Label used for DNS-01 challenges
    pub const ACME_CHALLENGE_PREFIX: &str = "_acme-challenge";
    /// Intermediate sub-domain pointing at the cluster ingress IP
    pub const DASHBOARD_IP_PREFIX: &str = "dashboard-ip";
    /// Prefix of the wildcard certificate name for a domain
    pub const WILDCARD_CERT_PREFIX: &str = "wildcard-";
}

/// Reconcile scheduling
pub mod requeue {
    /// First retry delay after a failed reconcile
    pub const BACKOFF_BASE_SECS: u64 = 5;
    /// Upper bound of the retry delay
    pub const BACKOFF_MAX_SECS: u64 = 300;
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
