//! IS-04 Registration API client

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

const REGISTRATION_BASE: &str = "x-nmos/registration/v1.3/";

/// Whether a resource registration created the resource or updated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created,
    Updated,
}

pub struct RegistrationClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistrationClient {
    /// A client for the registry at the given base URL (e.g.
    /// `http://registry.example.com:8235/`).
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}{}", base_url, REGISTRATION_BASE),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register (or update) one resource.
    pub async fn register(&self, kind: &str, data: &Value) -> Result<RegistrationOutcome> {
        let body = json!({ "type": kind, "data": data });
        let response = self
            .http
            .post(format!("{}resource", self.base_url))
            .json(&body)
            .send()
            .await?;
        match response.status() {
            StatusCode::CREATED => Ok(RegistrationOutcome::Created),
            StatusCode::OK => Ok(RegistrationOutcome::Updated),
            status => Err(Error::Rejected(status.as_u16())),
        }
    }

    /// Remove one resource from the registry.
    pub async fn delete(&self, kind: &str, id: &Uuid) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}resource/{}s/{}", self.base_url, kind, id))
            .send()
            .await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            // already gone is fine
            StatusCode::NOT_FOUND => Ok(()),
            status => Err(Error::Rejected(status.as_u16())),
        }
    }

    /// Send the node heartbeat. A 404 means the registry has garbage
    /// collected this node and everything must be re-registered.
    pub async fn heartbeat(&self, node_id: &Uuid) -> Result<()> {
        let response = self
            .http
            .post(format!("{}health/nodes/{}", self.base_url, node_id))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => {
                debug!(node_id = %node_id, "heartbeat acknowledged");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(Error::NotRegistered),
            status => Err(Error::Rejected(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_includes_registration_api() {
        let client = RegistrationClient::new("http://registry.example.com:8235/").unwrap();
        assert_eq!(
            client.base_url(),
            "http://registry.example.com:8235/x-nmos/registration/v1.3/"
        );
    }
}
