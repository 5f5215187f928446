// # HTTP Transport
//
// This crate provides the reqwest-based `HttpTransport` for the control
// panel core.
//
// ## Responsibilities
//
// - Join endpoint paths onto the configured API base
// - Send JSON bodies and no-cache headers
// - Report every reply as-is, whatever its status
//
// Retry and status interpretation stay in `RequestGateway`.

use ddns_panel_core::config::PanelConfig;
use ddns_panel_core::traits::{HttpRequest, HttpResponse, HttpTransport, Method};
use ddns_panel_core::{Error, Result, TransportError};

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use std::time::Duration;
use tracing::debug;

/// HTTP transport over a shared reqwest client
pub struct ReqwestTransport {
    /// API base, without a trailing slash
    base: String,

    /// HTTP client
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport for `api_base`
    ///
    /// # Parameters
    ///
    /// - `api_base`: Base URL every endpoint path is joined onto
    /// - `timeout`: Per-request timeout; an expired request is a transport failure
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base: api_base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Create a transport from the panel configuration
    pub fn from_config(config: &PanelConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.api_base.clone(), config.gateway.request_timeout())
    }

    /// The API base
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let url = self.url(&request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        if request.no_cache {
            builder = builder
                .header(CACHE_CONTROL, "no-cache, no-store")
                .header(PRAGMA, "no-cache");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::new(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();

        // A body cut off mid-read is no reply either
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::new(format!("Failed to read reply from {}: {}", url, e)))?;

        debug!("{:?} {} -> {} ({} bytes)", request.method, url, status, body.len());

        Ok(HttpResponse::new(status, body))
    }

    fn transport_name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let transport = ReqwestTransport::new("http://127.0.0.1:8080/api/", Duration::from_secs(5)).unwrap();

        assert_eq!(transport.base(), "http://127.0.0.1:8080/api");
        assert_eq!(transport.url("/configs"), "http://127.0.0.1:8080/api/configs");
        assert_eq!(transport.url("ip/v4"), "http://127.0.0.1:8080/api/ip/v4");
    }

    #[test]
    fn test_from_config_rejects_invalid_base() {
        let config = PanelConfig::new("ftp://example.com");
        assert!(matches!(ReqwestTransport::from_config(&config), Err(Error::Config(_))));
    }
}
