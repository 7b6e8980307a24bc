//! Mailbox host capabilities
//!
//! The host is whatever environment the mailbox is reached through. It
//! answers capability probes, hands out access tokens, and carries SOAP
//! envelopes to the server. Transports depend on it and nothing else.

use std::time::Duration;
use tracing::{debug, warn};

use crate::config::HostConfig;
use crate::error::{RecoveryError, Result};

/// Environment a mailbox is accessed through
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MailboxHost: Send + Sync {
    /// Whether the host supports `set` at `min_version` or later
    fn is_set_supported(&self, set: &str, min_version: &str) -> bool;

    /// REST endpoint property, if the host exposes one
    fn rest_url(&self) -> Option<String>;

    /// Acquire an access token for the current mailbox
    async fn callback_token(&self) -> Result<String>;

    /// Send a SOAP envelope and return the response body
    async fn make_ews_request(&self, envelope: String) -> Result<String>;
}

/// Compare dotted version strings component by component
pub fn version_at_least(version: &str, minimum: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.trim()
            .split('.')
            .map(|part| part.parse::<u64>().unwrap_or(0))
            .collect()
    };

    let version = parse(version);
    let minimum = parse(minimum);
    let len = version.len().max(minimum.len());

    for i in 0..len {
        let have = version.get(i).copied().unwrap_or(0);
        let need = minimum.get(i).copied().unwrap_or(0);
        if have != need {
            return have > need;
        }
    }

    true
}

/// Host that talks to the server directly over HTTP
pub struct HttpMailboxHost {
    config: HostConfig,
    client: reqwest::Client,
}

impl HttpMailboxHost {
    pub fn new(config: HostConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl MailboxHost for HttpMailboxHost {
    fn is_set_supported(&self, set: &str, min_version: &str) -> bool {
        set == "Mailbox" && version_at_least(&self.config.api_version, min_version)
    }

    fn rest_url(&self) -> Option<String> {
        self.config.rest_url.clone()
    }

    async fn callback_token(&self) -> Result<String> {
        self.config
            .access_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RecoveryError::Host("No access token configured".to_string()))
    }

    async fn make_ews_request(&self, envelope: String) -> Result<String> {
        let token = self.callback_token().await?;

        debug!("Sending EWS request to {}", self.config.ews_url);

        let response = self
            .client
            .post(&self.config.ews_url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(envelope)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("EWS request failed with status {}: {}", status, error_text);
            return Err(RecoveryError::Host(format!(
                "EWS request failed: {} - {}",
                status, error_text
            )));
        }

        Ok(response.text().await?)
    }
}
