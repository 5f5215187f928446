// # HTTP Transport Trait
//
// Defines the interface for sending a single request to the remote API.
//
// ## Implementations
//
// - reqwest-based: `ddns-panel-http` crate
// - Scripted doubles in the contract tests
//
// ## Usage
//
// ```rust,ignore
// use ddns_panel_core::traits::{HttpRequest, HttpTransport};
//
// let transport = /* HttpTransport implementation */;
// let response = transport.send(&HttpRequest::get("/health")).await?;
// assert!(response.is_success());
// ```

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// HTTP method used by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A request relative to the API base
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Endpoint path, e.g. `/configs`
    pub path: String,
    /// JSON body, if any
    pub body: Option<Value>,
    /// Ask intermediaries not to serve a cached reply
    pub no_cache: bool,
}

impl HttpRequest {
    /// A GET request with no body
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            no_cache: false,
        }
    }

    /// A POST request with an optional JSON body
    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
            no_cache: false,
        }
    }
}

/// A reply from the remote, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw body text
    pub body: String,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP transport implementations
///
/// A transport performs exactly one request per call. It reports every
/// reply the remote produced as `Ok`, including non-2xx ones, and returns
/// `Err` only when there was no reply at all.
///
/// ## Forbidden Capabilities
/// - ❌ Retry (owned by `RequestGateway`)
/// - ❌ Interpret status codes or bodies (owned by `RequestGateway`)
/// - ❌ Cache replies
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request
    ///
    /// # Returns
    ///
    /// - `Ok(HttpResponse)`: The remote replied (any status)
    /// - `Err(TransportError)`: No reply (refused, timed out, host offline)
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Short name for logs
    fn transport_name(&self) -> &'static str;
}
