// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Credential reading and pull secret construction

use crate::constants::registry::{
    PASSWORD_KEY, PULL_SECRET_KEY, PULL_SECRET_TYPE, USERNAME_KEY,
};
use crate::error::Result;
use crate::sync::ownership::OwnerRef;
use crate::types::Registry;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Username and password read from a credential secret
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl RegistryCredentials {
    /// Read `username` and `password` from `data`, falling back to `stringData`.
    /// Returns `None` if either is missing or empty.
    pub fn from_secret(secret: &Secret) -> Option<Self> {
        let read = |key: &str| -> Option<String> {
            secret
                .data
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(|v| String::from_utf8(v.0.clone()).ok())
                .or_else(|| secret.string_data.as_ref().and_then(|d| d.get(key)).cloned())
                .filter(|v| !v.is_empty())
        };

        Some(Self {
            username: read(USERNAME_KEY)?,
            password: read(PASSWORD_KEY)?,
        })
    }
}

#[derive(Serialize)]
struct DockerCfgEntry<'a> {
    username: &'a str,
    password: &'a str,
    email: &'a str,
    auth: String,
}

/// Render the `.dockercfg` document for one registry host
pub fn dockercfg(host: &str, credentials: &RegistryCredentials) -> Result<Vec<u8>> {
    let entry = DockerCfgEntry {
        username: &credentials.username,
        password: &credentials.password,
        email: "",
        auth: STANDARD.encode(format!("{}:{}", credentials.username, credentials.password)),
    };
    Ok(serde_json::to_vec(&BTreeMap::from([(host, entry)]))?)
}

/// Build the pull secret a registry distributes into `namespace`.
/// The output depends only on its inputs, so re-applying it is a no-op.
pub fn build_pull_secret(
    registry: &Registry,
    namespace: &str,
    credentials: &RegistryCredentials,
) -> Result<Secret> {
    let owner = OwnerRef::from_resource(registry);

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(registry.pull_secret_name()),
            namespace: Some(namespace.to_string()),
            labels: Some(owner.labels()),
            annotations: Some(owner.annotations()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            PULL_SECRET_KEY.to_string(),
            ByteString(dockercfg(&registry.spec.host, credentials)?),
        )])),
        type_: Some(PULL_SECRET_TYPE.to_string()),
        ..Default::default()
    })
}

/// Whether a live secret already carries everything `desired` specifies
pub fn is_up_to_date(live: &Secret, desired: &Secret) -> bool {
    let contains = |live: &Option<BTreeMap<String, String>>, wanted: &Option<BTreeMap<String, String>>| {
        wanted.iter().flatten().all(|(k, v)| {
            live.as_ref().and_then(|l| l.get(k)) == Some(v)
        })
    };

    live.type_ == desired.type_
        && live.data == desired.data
        && contains(&live.metadata.labels, &desired.metadata.labels)
        && contains(&live.metadata.annotations, &desired.metadata.annotations)
}
