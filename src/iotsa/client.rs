//! Client for iotsa devices, which expose each module as a JSON resource
//! under `/api/<module>`.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::net::lookup_host;

/// Default HTTP port of iotsa devices.
pub const DEFAULT_PORT: u16 = 80;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// iotsa client errors.
#[derive(Error, Debug)]
pub enum IotsaError {
    #[error("{host}: cannot resolve hostname: {reason}")]
    Resolve { host: String, reason: String },
    #[error("{host}: device not accessible: {reason}")]
    Unreachable { host: String, reason: String },
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("HTTP status {0}: {1}")]
    Status(u16, String),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl IotsaError {
    /// Whether the device could not be opened at all (DNS or connection).
    pub fn is_open_failure(&self) -> bool {
        matches!(self, IotsaError::Resolve { .. } | IotsaError::Unreachable { .. })
    }
}

/// Transport protocol used to reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// Connection settings for an iotsa device.
#[derive(Debug, Clone)]
pub struct IotsaConfig {
    pub protocol: Protocol,
    pub port: u16,
    /// Bearer token for devices that require authentication.
    pub bearer_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for IotsaConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            port: DEFAULT_PORT,
            bearer_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl IotsaConfig {
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// A resolved, reachable iotsa device.
pub struct IotsaDevice {
    hostname: String,
    address: IpAddr,
    config: IotsaConfig,
    client: Client,
}

impl IotsaDevice {
    /// Resolve a hostname to an IP address, preferring IPv4.
    pub async fn resolve(hostname: &str, port: u16) -> Result<IpAddr, IotsaError> {
        if let Ok(address) = hostname.parse::<IpAddr>() {
            return Ok(address);
        }

        let addresses: Vec<SocketAddr> = lookup_host((hostname, port))
            .await
            .map_err(|e| IotsaError::Resolve {
                host: hostname.to_string(),
                reason: e.to_string(),
            })?
            .collect();

        addresses
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addresses.first())
            .map(|a| a.ip())
            .ok_or_else(|| IotsaError::Resolve {
                host: hostname.to_string(),
                reason: "no addresses found".to_string(),
            })
    }

    /// Resolve `hostname` and check that the device answers on `/api/config`.
    pub async fn connect(hostname: &str, config: IotsaConfig) -> Result<Self, IotsaError> {
        let address = Self::resolve(hostname, config.port).await?;
        tracing::debug!("{} resolved to {}", hostname, address);

        // Devices live on the local network, never behind a proxy
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .no_proxy()
            .build()?;

        let device = Self {
            hostname: hostname.to_string(),
            address,
            config,
            client,
        };

        device
            .get_all("config")
            .await
            .map_err(|e| IotsaError::Unreachable {
                host: hostname.to_string(),
                reason: e.to_string(),
            })?;

        Ok(device)
    }

    /// The hostname this device was opened with.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The resolved address.
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// REST endpoint for a module.
    pub fn url(&self, module: &str) -> String {
        format!(
            "{}://{}/api/{}",
            self.config.protocol.as_str(),
            SocketAddr::new(self.address, self.config.port),
            module
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Fetch all properties of a module.
    pub async fn get_all(&self, module: &str) -> Result<Map<String, Value>, IotsaError> {
        match self.get::<Value>(module).await? {
            Value::Object(map) => Ok(map),
            other => Err(IotsaError::ParseError(format!(
                "expected a JSON object from /api/{}, got {}",
                module, other
            ))),
        }
    }

    /// Fetch a module and deserialize it into `T`.
    pub async fn get<T: DeserializeOwned>(&self, module: &str) -> Result<T, IotsaError> {
        let url = self.url(module);
        let response = self.authorize(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(IotsaError::Status(status, error_text));
        }

        let text = response.text().await?;
        tracing::debug!("GET {} -> {}", url, text);
        serde_json::from_str(&text).map_err(|e| IotsaError::ParseError(e.to_string()))
    }

    /// Set a single property of a module.
    pub async fn set(
        &self,
        module: &str,
        key: &str,
        value: impl Serialize,
    ) -> Result<(), IotsaError> {
        let value =
            serde_json::to_value(value).map_err(|e| IotsaError::ParseError(e.to_string()))?;
        let mut body = Map::new();
        body.insert(key.to_string(), value);
        self.set_many(module, &Value::Object(body)).await
    }

    /// Set several properties of a module in one request.
    pub async fn set_many(&self, module: &str, body: &Value) -> Result<(), IotsaError> {
        let url = self.url(module);
        tracing::debug!("PUT {} <- {}", url, body);

        let response = self
            .authorize(self.client.put(&url))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(IotsaError::Status(status, error_text));
        }

        Ok(())
    }
}
