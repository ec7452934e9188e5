//! HTTP client for the loopback bridge.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use hostbridge_config::Config;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Slack added to the bridge's own handoff timeout so a 504 from the bridge
/// arrives before the client gives up.
const TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Tool advertised by `GET /tools`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTool {
    /// Dotted tool name as registered on the bridge.
    pub name: String,
    /// Description reported by the bridge, if any.
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolListing {
    #[serde(default)]
    tools: Vec<RemoteTool>,
}

/// Failures talking to the bridge.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Build {
        /// Builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// Connection refused, reset, or timed out. Expected while the host is
    /// still starting.
    #[error("bridge unreachable at {url}: {source}")]
    Unreachable {
        /// Endpoint that was requested.
        url: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The bridge answered with a non-success HTTP status.
    #[error("Bridge returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body as received.
        body: String,
    },
    /// The response body was not the expected JSON.
    #[error("invalid bridge response: {source}")]
    Decode {
        /// Decoding failure.
        #[source]
        source: reqwest::Error,
    },
}

/// Operations the adapter needs from the bridge.
#[cfg_attr(test, mockall::automock)]
pub trait BridgeClient {
    /// `GET /tools`.
    fn list_tools(&self) -> Result<Vec<RemoteTool>, ClientError>;
    /// `POST /tool`, returning the decoded response envelope.
    fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ClientError>;
    /// `GET /status`.
    fn status(&self) -> Result<Value, ClientError>;
}

/// [`BridgeClient`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpBridgeClient {
    client: Client,
    base_url: String,
}

impl HttpBridgeClient {
    /// Builds a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Build { source })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Builds a client for the bridge described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Self::new(
            config.bridge_url(),
            config.request_timeout().saturating_add(TIMEOUT_SLACK),
        )
    }

    /// Base URL every request path is appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn send(
        &self,
        url: String,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<Response, ClientError> {
        debug!(target: CLIENT_TARGET, %url, "calling bridge");
        let response = request
            .send()
            .map_err(|source| ClientError::Unreachable { url, source })?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().unwrap_or_default();
            Err(ClientError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        response
            .json()
            .map_err(|source| ClientError::Decode { source })
    }
}

impl BridgeClient for HttpBridgeClient {
    fn list_tools(&self) -> Result<Vec<RemoteTool>, ClientError> {
        let url = self.url("/tools");
        let response = self.send(url.clone(), self.client.get(&url))?;
        let listing: ToolListing = Self::decode(response)?;
        Ok(listing.tools)
    }

    fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ClientError> {
        let url = self.url("/tool");
        let body = json!({ "tool": name, "arguments": arguments });
        let response = self.send(url.clone(), self.client.post(&url).json(&body))?;
        Self::decode(response)
    }

    fn status(&self) -> Result<Value, ClientError> {
        let url = self.url("/status");
        let response = self.send(url.clone(), self.client.get(&url))?;
        Self::decode(response)
    }
}

#[cfg(test)]
mod tests;
