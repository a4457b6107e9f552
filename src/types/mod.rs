// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources read and written by the operator.

pub mod https_cert;
pub mod operator_config;
pub mod registry;

pub use https_cert::{HttpsCert, HttpsCertSpec, HttpsCertStatus};
pub use operator_config::{DnsProviderConfig, OperatorConfig, OperatorConfigSpec, SaasModeConfig};
pub use registry::{Registry, RegistrySpec, RegistryStatus, SecretRef};
