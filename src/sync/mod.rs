// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pull secret construction, ownership and distribution.

pub mod distributor;
pub mod ownership;
pub mod secrets;

pub use distributor::{FanOutReport, NamespaceOutcome, SecretAction, SecretDistributor};
pub use ownership::OwnerRef;
pub use secrets::{build_pull_secret, RegistryCredentials};
