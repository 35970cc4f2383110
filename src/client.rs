//! HTTP plumbing: the transport seam and the NocoDB API client.
//!
//! The raw transport is an external collaborator, so it lives behind the
//! `ApiTransport` trait. Production code uses the bundled blocking reqwest
//! implementation; tests script their own.

use serde_json::Value;

use crate::config::ConnectorConfig;
use crate::error::ConnectorError;

/// The request capability this connector is built on:
/// `(method, url, headers, query, body) -> JSON`, failing with a transport
/// error.
pub trait ApiTransport {
    fn request(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, ConnectorError>;
}

/// Blocking reqwest transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiTransport for HttpTransport {
    fn request(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, ConnectorError> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|e| ConnectorError::Transport(format!("invalid method {method}: {e}")))?;

        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ConnectorError::Transport(format!(
                "{} {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("error"),
                text
            )));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ConnectorError::Transport(format!("invalid JSON response: {e}")))
    }
}

/// NocoDB API client: assembles the URL, auth headers and query string for
/// one endpoint call and delegates the round-trip to the transport.
pub struct NocoDbClient<T: ApiTransport = HttpTransport> {
    config: ConnectorConfig,
    transport: T,
}

impl NocoDbClient<HttpTransport> {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            transport: HttpTransport::new(),
        }
    }
}

impl<T: ApiTransport> NocoDbClient<T> {
    pub fn with_transport(config: ConnectorConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue one API request against an endpoint path like
    /// `/api/v3/data/{base}/{table}/records`. Missing credentials surface as
    /// a configuration error before anything is sent.
    pub fn api_request(
        &self,
        method: &str,
        endpoint: &str,
        body: Option<&Value>,
        query: &[(String, String)],
    ) -> Result<Value, ConnectorError> {
        let headers = self.config.auth_headers()?;
        let url = format!("{}{}", self.config.base_url(), endpoint);
        self.transport.request(method, &url, &headers, query, body)
    }
}
