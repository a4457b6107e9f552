// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Clients for the external systems the reconcilers converge against.

pub mod dns;
pub mod registry;

pub use dns::{CloudflareDns, DnsProvider, DnsRecord, RecordType};
pub use registry::{DockerRegistryClient, RegistryAuth};
