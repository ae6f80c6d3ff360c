//! Registry client speaking JSON over HTTP.
//!
//! # Wire format
//! ```text
//! POST   {base}/records              body: ServiceRecord   → {"registration": "<id>"}
//! DELETE {base}/records/{id}                               → 2xx (404 = already gone)
//! GET    {base}/records?name=<name>                        → [ServiceRecord, ...]
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::discovery::error::DiscoveryError;
use crate::discovery::record::{RegistrationId, ServiceRecord};
use crate::discovery::registry::Registry;

/// Body returned by a successful publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub registration: String,
}

/// A remote registry reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    base_url: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRegistry {
    /// Create a client for the registry at `base_url`.
    ///
    /// `timeout` bounds each HTTP exchange.
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        // Url::join drops the last path segment unless it ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, DiscoveryError> {
        self.base_url
            .join(path)
            .map_err(|e| DiscoveryError::Rejected(format!("invalid registry path {:?}: {}", path, e)))
    }

    /// `{base}/records/{id}` with the id as a single percent-encoded segment.
    fn record_url(&self, registration: &RegistrationId) -> Result<Url, DiscoveryError> {
        let id = registration.as_str();
        // Url drops dot segments instead of encoding them.
        if matches!(id, "." | "..") {
            return Err(DiscoveryError::Rejected(format!(
                "registration id {:?} cannot be addressed",
                id
            )));
        }

        let mut url = self.url("records")?;
        url.path_segments_mut()
            .map_err(|()| DiscoveryError::Rejected(format!("registry URL {} cannot carry a path", self.base_url)))?
            .push(id);
        Ok(url)
    }

    fn map_send_error(&self, e: reqwest::Error) -> DiscoveryError {
        if e.is_timeout() {
            DiscoveryError::Timeout(self.timeout)
        } else {
            DiscoveryError::Unreachable(e.to_string())
        }
    }

    async fn rejected(response: reqwest::Response) -> DiscoveryError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        DiscoveryError::Rejected(format!("status {}: {}", status, body.trim()))
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn publish(&self, record: &ServiceRecord) -> Result<RegistrationId, DiscoveryError> {
        let url = self.url("records")?;
        tracing::debug!(url = %url, service = %record.name, "Publishing record");

        let response = self
            .client
            .post(url)
            .json(record)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: PublishResponse = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Rejected(format!("undecodable publish response: {}", e)))?;

        RegistrationId::new(body.registration)
            .ok_or_else(|| DiscoveryError::Rejected("registry returned an empty registration id".into()))
    }

    async fn unpublish(&self, registration: &RegistrationId) -> Result<(), DiscoveryError> {
        let url = self.record_url(registration)?;
        tracing::debug!(url = %url, "Unpublishing record");

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                tracing::debug!(registration = %registration, "Registration already gone");
                Ok(())
            }
            _ => Err(Self::rejected(response).await),
        }
    }

    async fn lookup(&self, name: &str) -> Result<Vec<ServiceRecord>, DiscoveryError> {
        let url = self.url("records")?;

        let response = self
            .client
            .get(url)
            .query(&[("name", name)])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| DiscoveryError::Rejected(format!("undecodable lookup response: {}", e)))
    }
}
