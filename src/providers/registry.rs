// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Docker Registry v2 authentication probe and catalog listing.

use crate::error::{DockyardError, Result};
use async_trait::async_trait;
use reqwest::{header::WWW_AUTHENTICATE, Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Access to a registry's authentication endpoint
#[async_trait]
pub trait RegistryAuth: Send + Sync {
    /// Probe the registry with the given credentials.
    /// `Ok(false)` means the registry rejected them. `InvalidSpec` means the host
    /// is not a registry; other errors are transient.
    async fn verify_credentials(&self, host: &str, username: &str, password: &str) -> Result<bool>;

    /// List repository names visible to the given credentials, sorted
    async fn list_repositories(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct DockerRegistryClient {
    http: Client,
}

/// Parameters of a `WWW-Authenticate: Bearer ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
    scope: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    repositories: Vec<String>,
}

impl DockerRegistryClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// GET a registry API path, answering a bearer challenge if one is returned.
    /// `None` means the credentials were rejected.
    async fn get_authorized(
        &self,
        host: &str,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<Option<Response>> {
        let url = format!("{}{}", host.trim_end_matches('/'), path);

        let response = self
            .http
            .get(&url)
            .basic_auth(username, Some(password))
            .send()
            .await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            let Some(challenge) = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_bearer_challenge)
            else {
                debug!("Registry rejected basic credentials for {}", url);
                return Ok(None);
            };

            let Some(token) = self.fetch_token(&challenge, username, password).await? else {
                return Ok(None);
            };

            self.http.get(&url).bearer_auth(token).send().await?
        } else {
            response
        };

        match response.status() {
            s if s.is_success() => Ok(Some(response)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            // Retrying cannot help when the host does not serve the registry API
            s if s.is_client_error() => Err(DockyardError::InvalidSpec(format!(
                "{} answered {}, host is not a Docker registry",
                url, s
            ))),
            s => Err(DockyardError::RegistryError(format!(
                "unexpected status {} from {}",
                s, url
            ))),
        }
    }

    async fn fetch_token(
        &self,
        challenge: &BearerChallenge,
        username: &str,
        password: &str,
    ) -> Result<Option<String>> {
        let mut query = Vec::new();
        if let Some(service) = &challenge.service {
            query.push(("service", service.as_str()));
        }
        if let Some(scope) = &challenge.scope {
            query.push(("scope", scope.as_str()));
        }

        let response = self
            .http
            .get(&challenge.realm)
            .query(&query)
            .basic_auth(username, Some(password))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let body: TokenResponse = response.json().await?;
                body.token
                    .or(body.access_token)
                    .map(Some)
                    .ok_or_else(|| {
                        DockyardError::RegistryError(format!(
                            "token endpoint {} returned no token",
                            challenge.realm
                        ))
                    })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("Token endpoint {} rejected credentials", challenge.realm);
                Ok(None)
            }
            s => Err(DockyardError::RegistryError(format!(
                "unexpected status {} from token endpoint {}",
                s, challenge.realm
            ))),
        }
    }
}

#[async_trait]
impl RegistryAuth for DockerRegistryClient {
    #[instrument(skip(self, password))]
    async fn verify_credentials(&self, host: &str, username: &str, password: &str) -> Result<bool> {
        Ok(self
            .get_authorized(host, "/v2/", username, password)
            .await?
            .is_some())
    }

    #[instrument(skip(self, password))]
    async fn list_repositories(
        &self,
        host: &str,
        username: &str,
        password: &str,
    ) -> Result<Vec<String>> {
        let Some(response) = self
            .get_authorized(host, "/v2/_catalog", username, password)
            .await?
        else {
            return Err(DockyardError::RegistryError(format!(
                "catalog of {} is not accessible with these credentials",
                host
            )));
        };

        let mut repositories = response.json::<CatalogResponse>().await?.repositories;
        repositories.sort();
        repositories.dedup();
        Ok(repositories)
    }
}

/// Parse `Bearer realm="...",service="...",scope="..."`
fn parse_bearer_challenge(header: &str) -> Option<BearerChallenge> {
    let (scheme, params) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut realm = None;
    let mut service = None;
    let mut scope = None;

    let mut rest = params.trim();
    while !rest.is_empty() {
        let (key, after_key) = rest.split_once('=')?;
        let key = key.trim().trim_start_matches(',').trim();

        let (value, remainder) = if let Some(quoted) = after_key.strip_prefix('"') {
            let end = quoted.find('"')?;
            (&quoted[..end], &quoted[end + 1..])
        } else {
            match after_key.find(',') {
                Some(end) => (&after_key[..end], &after_key[end..]),
                None => (after_key, ""),
            }
        };

        match key.to_ascii_lowercase().as_str() {
            "realm" => realm = Some(value.to_string()),
            "service" => service = Some(value.to_string()),
            "scope" => scope = Some(value.to_string()),
            _ => {}
        }

        rest = remainder.trim_start_matches([',', ' ']);
    }

    Some(BearerChallenge {
        realm: realm?,
        service,
        scope,
    })
}
