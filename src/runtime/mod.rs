// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Scheduling shared by the reconcilers.
//!
//! `kube::runtime::Controller` provides the per-key queue: one reconcile in
//! flight per object, events for a busy key coalesced into a single rerun.
//! This module adds the retry classification and backoff on top of it.

pub mod backoff;

pub use backoff::RetryTracker;

use crate::error::DockyardError;
use futures::{Stream, StreamExt};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Stable `Kind/namespace/name` key of an object
pub fn resource_key<K>(obj: &K) -> String
where
    K: Resource<DynamicType = ()>,
{
    format!(
        "{}/{}/{}",
        K::kind(&()),
        obj.namespace().unwrap_or_default(),
        obj.name_any()
    )
}

/// Requeue after a converged reconcile so external drift is noticed without an event
pub fn requeue_after_success(retries: &RetryTracker, key: &str, resync: Duration) -> Action {
    retries.reset(key);
    Action::requeue(resync)
}

/// Decide when to retry a failed reconcile.
/// Transient errors back off per key; invalid specs wait for the next spec change.
pub fn requeue_after_error(retries: &RetryTracker, key: &str, err: &DockyardError) -> Action {
    if !err.is_transient() {
        warn!("Reconciliation of {} halted until its spec changes: {}", key, err);
        retries.reset(key);
        return Action::await_change();
    }

    let delay = retries.record_failure(key);
    error!(
        "Reconciliation of {} failed (attempt {}), retrying in {:?}: {}",
        key,
        retries.failures(key),
        delay,
        err
    );
    Action::requeue(delay)
}

/// Consume a controller's result stream until it ends
pub async fn drain<S, T, E>(results: S, kind: &str)
where
    S: Stream<Item = std::result::Result<T, E>>,
    T: Debug,
    E: Debug,
{
    results
        .for_each(|res| async move {
            match res {
                Ok(o) => debug!("Reconciled {}: {:?}", kind, o),
                Err(e) => warn!("{} reconciliation error: {:?}", kind, e),
            }
        })
        .await;
}
