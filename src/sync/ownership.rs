// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cross-namespace owner relation carried as labels on distributed objects.
//!
//! Native owner references cannot point across namespaces, so owned objects are
//! found with a label selector and removed by the owning reconciler itself.

use crate::constants::{annotations, labels};
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl OwnerRef {
    pub fn from_resource<K>(owner: &K) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self {
            kind: K::kind(&()).to_string(),
            namespace: owner.namespace(),
            name: owner.name_any(),
        }
    }

    /// Labels written on every owned object
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (labels::OWNER_KIND.to_string(), self.kind.clone()),
            (labels::OWNER_NAME.to_string(), self.name.clone()),
        ]);
        if let Some(ns) = &self.namespace {
            labels.insert(labels::OWNER_NAMESPACE.to_string(), ns.clone());
        }
        labels
    }

    /// Label selector matching every object owned by this owner
    pub fn selector(&self) -> String {
        self.labels()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Annotations written on every owned object
    pub fn annotations(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(annotations::OWNER.to_string(), self.to_string())])
    }

    /// Whether `meta` carries this owner's relation
    pub fn owns(&self, meta: &ObjectMeta) -> bool {
        let Some(labels) = meta.labels.as_ref() else {
            return false;
        };
        labels.get(labels::OWNER_KIND) == Some(&self.kind)
            && labels.get(labels::OWNER_NAME) == Some(&self.name)
            && labels.get(labels::OWNER_NAMESPACE) == self.namespace.as_ref()
    }

    /// Recover the owner of an object from its labels
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Option<Self> {
        Some(Self {
            kind: labels.get(labels::OWNER_KIND)?.clone(),
            namespace: labels.get(labels::OWNER_NAMESPACE).cloned(),
            name: labels.get(labels::OWNER_NAME)?.clone(),
        })
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.kind,
            self.namespace.as_deref().unwrap_or_default(),
            self.name
        )
    }
}
