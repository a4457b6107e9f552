// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockyardError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("DNS provider error: {0}")]
    DnsProviderError(String),

    #[error("Pull secret distribution failed in {} namespace(s): {}", failures.len(), failures.join("; "))]
    PartialFanOut { failures: Vec<String> },

    #[error("{} of {} DNS record upserts failed: {}", failures.len(), attempted, failures.join("; "))]
    PartialDnsSync {
        attempted: usize,
        failures: Vec<String>,
    },

    #[error("Finalizer error: {0}")]
    FinalizerError(String),
}

impl DockyardError {
    /// Whether a retry can succeed without the resource spec being edited
    pub fn is_transient(&self) -> bool {
        !matches!(self, DockyardError::InvalidSpec(_))
    }
}

pub type Result<T> = std::result::Result<T, DockyardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_spec_is_terminal() {
        assert!(!DockyardError::InvalidSpec("bad host".to_string()).is_transient());
    }

    #[test]
    fn test_partial_failures_are_transient() {
        let fan_out = DockyardError::PartialFanOut {
            failures: vec!["team-a: timeout".to_string()],
        };
        let dns = DockyardError::PartialDnsSync {
            attempted: 5,
            failures: vec!["A example.com: rejected".to_string()],
        };

        assert!(fan_out.is_transient());
        assert!(dns.is_transient());
        assert_eq!(
            dns.to_string(),
            "1 of 5 DNS record upserts failed: A example.com: rejected"
        );
    }
}
