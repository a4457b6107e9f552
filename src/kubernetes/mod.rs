// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, namespace and service lookup, and secret storage.

pub mod crd;
pub mod namespaces;
pub mod services;
pub mod store;

pub use crd::wait_for_crd;
pub use namespaces::{is_active_workload_namespace, list_active_namespaces};
pub use services::fetch_load_balancer_ip;
pub use store::{ClusterStore, KubeClusterStore};
