//! Request gateway
//!
//! The RequestGateway is responsible for:
//! - Executing calls against the remote API through an [`HttpTransport`]
//! - Retrying transport failures a bounded number of times
//! - Surfacing non-2xx replies as [`Error::Api`] without retrying
//! - Probing liveness and owning the process-wide [`ConnectionStatus`]
//!
//! ## Retry Policy
//!
//! ```text
//! attempt 1 ──no reply──► sleep(retry_delay) ──► attempt 2 ──no reply──► ... attempt N ──► Err(Transport)
//!     │                                              │
//!     └──reply (any status)──► return                └──reply──► return
//! ```
//!
//! A reply with a non-2xx status ends the loop immediately: the remote
//! rejected the request and sending it again cannot change that.

mod responses;

pub use responses::{UpdateOutcome, ZoneRecordSummary, ZoneSummary};

use responses::{AckEnvelope, ConfigsEnvelope, ValidateEnvelope, ZoneRecordsEnvelope, ZonesEnvelope};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::record::{IpType, RawConfig};
use crate::traits::{HttpRequest, HttpResponse, HttpTransport, Method};

/// Liveness endpoint
pub const HEALTH_ENDPOINT: &str = "/health";
/// Config listing and full-set save endpoint
pub const CONFIGS_ENDPOINT: &str = "/configs";
/// Config validation endpoint
pub const VALIDATE_ENDPOINT: &str = "/configs/validate";
/// "Update now" endpoint
pub const UPDATE_ENDPOINT: &str = "/update";
/// Service status endpoint
pub const STATUS_ENDPOINT: &str = "/status";
/// Wizard zone discovery endpoint
pub const VALIDATE_TOKEN_ENDPOINT: &str = "/wizard/validate-token";
/// Wizard record discovery endpoint
pub const ZONE_RECORDS_ENDPOINT: &str = "/wizard/get-records";

/// Reachability of the remote API as last observed by a health probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No probe has completed yet
    #[default]
    Unknown,
    /// The last probe got a 2xx reply
    Online,
    /// The last probe failed
    Offline,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Unknown => "unknown",
            ConnectionStatus::Online => "online",
            ConnectionStatus::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Options for [`RequestGateway::call`]
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    /// HTTP method
    pub method: Method,
    /// JSON body
    pub body: Option<Value>,
    /// Bypass intermediary caches
    pub no_cache: bool,
}

impl CallOptions {
    /// GET with no body
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            body: None,
            no_cache: false,
        }
    }

    /// POST with a JSON body
    pub fn post(body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            no_cache: false,
        }
    }

    /// POST with no body
    pub fn post_empty() -> Self {
        Self {
            method: Method::Post,
            body: None,
            no_cache: false,
        }
    }

    /// Mark the request as not cacheable
    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::get()
    }
}

/// Gateway to the remote API
///
/// ## Shared State
///
/// The gateway owns the connection status. Only [`RequestGateway::probe_health`]
/// and [`RequestGateway::reset_connection_status`] write it; everybody else
/// reads a snapshot or subscribes to changes.
pub struct RequestGateway {
    /// Transport used for every request
    transport: Arc<dyn HttpTransport>,

    /// Total attempts for a transport failure
    max_attempts: usize,

    /// Fixed delay between attempts
    retry_delay: Duration,

    /// Connection status, readable through receivers
    status_tx: watch::Sender<ConnectionStatus>,
}

impl RequestGateway {
    /// Create a new gateway
    ///
    /// # Parameters
    ///
    /// - `transport`: HTTP transport implementation
    /// - `config`: Retry policy
    pub fn new(transport: Arc<dyn HttpTransport>, config: &GatewayConfig) -> Result<Self> {
        config.validate()?;

        let (status_tx, _) = watch::channel(ConnectionStatus::Unknown);

        Ok(Self {
            transport,
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay(),
            status_tx,
        })
    }

    /// Current connection status snapshot
    pub fn connection_status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// Receiver that observes every status change
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Return the connection status to `Unknown`
    pub fn reset_connection_status(&self) {
        self.status_tx.send_replace(ConnectionStatus::Unknown);
    }

    /// Execute a call and decode the JSON body
    ///
    /// # Returns
    ///
    /// - `Ok(Value)`: 2xx reply body (`Null` for an empty body)
    /// - `Err(Error::Api)`: The remote replied with a non-2xx status
    /// - `Err(Error::Transport)`: Every attempt failed without a reply
    /// - `Err(Error::Json)`: 2xx reply that is not JSON
    pub async fn call(&self, endpoint: &str, options: CallOptions) -> Result<Value> {
        let response = self.execute(endpoint, options).await?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Probe the liveness endpoint once
    ///
    /// Never retried and never fails: any non-2xx or transport failure
    /// reports `false`. The outcome is written to the connection status.
    pub async fn probe_health(&self) -> bool {
        let mut request = HttpRequest::get(HEALTH_ENDPOINT);
        request.no_cache = true;

        let reachable = match self.transport.send(&request).await {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                debug!("Health probe rejected with status {}", response.status);
                false
            }
            Err(e) => {
                debug!("Health probe got no reply: {}", e);
                false
            }
        };

        let status = if reachable {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        };
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            info!("Connection status {} -> {}", previous, status);
        }

        reachable
    }

    /// Fetch the full config set
    pub async fn fetch_configs(&self) -> Result<Vec<RawConfig>> {
        let (status, envelope): (u16, ConfigsEnvelope) =
            self.envelope(CONFIGS_ENDPOINT, CallOptions::get()).await?;
        ensure_success(status, envelope.success, envelope.message, "fetching configs")?;
        Ok(envelope.configs.unwrap_or_default())
    }

    /// Replace the remote's full config set
    pub async fn save_configs(&self, configs: &[RawConfig]) -> Result<()> {
        let body = json!({ "configs": configs });
        let (status, envelope): (u16, AckEnvelope) = self
            .envelope(CONFIGS_ENDPOINT, CallOptions::post(body))
            .await?;
        ensure_success(status, envelope.success, envelope.message, "saving configs")
    }

    /// Ask the remote to validate a config
    ///
    /// `is_valid: false` is a terminal [`Error::Validation`].
    pub async fn validate_config(&self, config: &RawConfig) -> Result<()> {
        let body = json!({ "config": config });
        let (status, envelope): (u16, ValidateEnvelope) = self
            .envelope(VALIDATE_ENDPOINT, CallOptions::post(body))
            .await?;

        if !envelope.is_valid {
            return Err(Error::validation(
                envelope
                    .message
                    .unwrap_or_else(|| "configuration rejected by the remote".to_string()),
            ));
        }
        ensure_success(status, envelope.success, envelope.message, "validating config")
    }

    /// Trigger a remote "update now"
    pub async fn trigger_update(&self) -> Result<UpdateOutcome> {
        let response = self.execute(UPDATE_ENDPOINT, CallOptions::post_empty()).await?;
        let value: Value = serde_json::from_str(&response.body)?;
        let success = value.get("success").and_then(Value::as_bool).unwrap_or(false);
        let outcome: UpdateOutcome = serde_json::from_value(value)?;
        ensure_success(response.status, success, outcome.message.clone(), "triggering update")?;
        Ok(outcome)
    }

    /// Raw service status document
    pub async fn fetch_status(&self) -> Result<Value> {
        self.call(STATUS_ENDPOINT, CallOptions::get().no_cache()).await
    }

    /// Address the remote currently detects for a family
    pub async fn current_ip(&self, ip_type: IpType) -> Result<String> {
        let response = self
            .execute(ip_type.ip_endpoint(), CallOptions::get().no_cache())
            .await?;
        let value: Value = serde_json::from_str(&response.body)?;

        if value.get("success").and_then(Value::as_bool) == Some(false) {
            let message = value.get("message").and_then(Value::as_str).map(str::to_string);
            ensure_success(response.status, false, message, "detecting address")?;
        }

        // A well-formed reply without an address field is a protocol mismatch
        extract_address(&value).ok_or_else(|| {
            Error::api(
                response.status,
                format!("no address in reply from {}: {}", ip_type.ip_endpoint(), response.body),
            )
        })
    }

    /// List the zones an API token can access
    pub async fn validate_token(&self, token: &str) -> Result<Vec<ZoneSummary>> {
        let body = json!({ "token": token });
        let (status, envelope): (u16, ZonesEnvelope) = self
            .envelope(VALIDATE_TOKEN_ENDPOINT, CallOptions::post(body))
            .await?;
        ensure_success(status, envelope.success, envelope.message, "validating token")?;
        Ok(envelope.zones.unwrap_or_default())
    }

    /// List the A/AAAA records of a zone
    pub async fn list_zone_records(&self, token: &str, zone_id: &str) -> Result<Vec<ZoneRecordSummary>> {
        let body = json!({ "token": token, "zone_id": zone_id });
        let (status, envelope): (u16, ZoneRecordsEnvelope) = self
            .envelope(ZONE_RECORDS_ENDPOINT, CallOptions::post(body))
            .await?;
        ensure_success(status, envelope.success, envelope.message, "listing zone records")?;
        Ok(envelope.records.unwrap_or_default())
    }

    /// Send with retry and reject non-2xx replies
    async fn execute(&self, endpoint: &str, options: CallOptions) -> Result<HttpResponse> {
        let request = HttpRequest {
            method: options.method,
            path: endpoint.to_string(),
            body: options.body,
            no_cache: options.no_cache,
        };

        let response = self.send_with_retry(&request).await?;

        if !response.is_success() {
            warn!(
                "{:?} {} rejected with status {}",
                request.method, request.path, response.status
            );
            return Err(Error::api(response.status, response.body));
        }

        debug!("{:?} {} -> {}", request.method, request.path, response.status);
        Ok(response)
    }

    /// Execute and decode a typed envelope, keeping the status for error mapping
    async fn envelope<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: CallOptions,
    ) -> Result<(u16, T)> {
        let response = self.execute(endpoint, options).await?;
        let parsed = serde_json::from_str(&response.body)?;
        Ok((response.status, parsed))
    }

    /// Bounded retry over transport failures
    ///
    /// The loop runs at most `max_attempts` times; any reply ends it.
    async fn send_with_retry(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.transport.send(request).await {
                Ok(response) => {
                    if attempt > 1 {
                        info!(
                            "{:?} {} got a reply on attempt {}",
                            request.method, request.path, attempt
                        );
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!(
                        "{:?} {} attempt {}/{} via {} failed: {}",
                        request.method,
                        request.path,
                        attempt,
                        self.max_attempts,
                        self.transport.transport_name(),
                        e
                    );
                    last_error = Some(e);

                    // Wait before retry (unless this was the last attempt)
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error
            .map(Error::from)
            .unwrap_or_else(|| Error::transport("no attempt was made")))
    }
}

/// Map a `success: false` envelope to an API rejection
fn ensure_success(status: u16, success: bool, message: Option<String>, action: &str) -> Result<()> {
    if success {
        return Ok(());
    }
    Err(Error::api(
        status,
        message.unwrap_or_else(|| format!("remote reported failure {}", action)),
    ))
}

/// Pull an address out of the shapes the ip endpoints use
fn extract_address(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => ["ip", "ip_address", "address"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}
