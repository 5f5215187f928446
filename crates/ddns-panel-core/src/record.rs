//! DNS record configuration model
//!
//! [`RawConfig`] is the wire form exchanged with the remote API.
//! [`DnsRecordConfig`] is the validated form held by the record store; its
//! fields are private so the invariants (required fields, minimum update
//! interval, immutable zone) cannot be bypassed.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Lowest accepted update interval (in seconds)
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 60;

/// Interval assumed when the remote omits one (in seconds)
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;

/// Display sentinel for an address that was never observed
pub const UNKNOWN_IP: &str = "unknown";

/// Timestamp layout used by the remote's config listing
const REMOTE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Address family a record is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IpType {
    /// IPv4, published as an `A` record
    #[default]
    #[serde(rename = "ipv4", alias = "IPv4", alias = "v4")]
    Ipv4,
    /// IPv6, published as an `AAAA` record
    #[serde(rename = "ipv6", alias = "IPv6", alias = "v6")]
    Ipv6,
}

impl IpType {
    /// DNS record type derived from the address family
    ///
    /// This is the only place the mapping lives.
    pub fn record_type(self) -> &'static str {
        match self {
            IpType::Ipv4 => "A",
            IpType::Ipv6 => "AAAA",
        }
    }

    /// Inverse of [`IpType::record_type`]
    pub fn from_record_type(record_type: &str) -> Option<Self> {
        match record_type.to_ascii_uppercase().as_str() {
            "A" => Some(IpType::Ipv4),
            "AAAA" => Some(IpType::Ipv6),
            _ => None,
        }
    }

    /// Remote endpoint reporting the currently detected address of this family
    pub fn ip_endpoint(self) -> &'static str {
        match self {
            IpType::Ipv4 => "/ip/v4",
            IpType::Ipv6 => "/ip/v6",
        }
    }

    /// Wire name (`ipv4` / `ipv6`)
    pub fn as_str(self) -> &'static str {
        match self {
            IpType::Ipv4 => "ipv4",
            IpType::Ipv6 => "ipv6",
        }
    }
}

impl fmt::Display for IpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IpType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ipv4" | "v4" | "4" | "a" => Ok(IpType::Ipv4),
            "ipv6" | "v6" | "6" | "aaaa" => Ok(IpType::Ipv6),
            other => Err(Error::validation(format!(
                "unknown ip type '{}', expected ipv4 or ipv6",
                other
            ))),
        }
    }
}

/// Local-only status of a record, derived from the latest operation on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Last operation succeeded
    Active,
    /// A remote update is in progress
    Updating,
    /// The remote reported a failure for this record
    Error,
    /// No information
    #[default]
    Unknown,
}

impl RecordStatus {
    /// Map the per-record status attached by the remote's listing
    pub fn from_remote(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_ascii_lowercase()) {
            None => RecordStatus::Active,
            Some(s) => match s.as_str() {
                "ok" | "active" => RecordStatus::Active,
                "updating" => RecordStatus::Updating,
                "error" | "failed" => RecordStatus::Error,
                _ => RecordStatus::Unknown,
            },
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::Active => "active",
            RecordStatus::Updating => "updating",
            RecordStatus::Error => "error",
            RecordStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Key of a record in the store's cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// A record carrying a provider-issued id
    Persisted(String),
    /// A record saved without an id, keyed by a local token
    Pending(Uuid),
}

impl RecordKey {
    /// Fresh pending key
    pub fn pending() -> Self {
        RecordKey::Pending(Uuid::new_v4())
    }

    /// Key for a config: its record id, or a fresh pending token
    pub fn for_config(config: &DnsRecordConfig) -> Self {
        match config.record_id() {
            Some(id) => RecordKey::Persisted(id.to_string()),
            None => RecordKey::pending(),
        }
    }

    /// The record id, if this key is persisted
    pub fn record_id(&self) -> Option<&str> {
        match self {
            RecordKey::Persisted(id) => Some(id),
            RecordKey::Pending(_) => None,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Persisted(id) => f.write_str(id),
            RecordKey::Pending(token) => write!(f, "pending:{}", token),
        }
    }
}

/// Wire form of a record configuration
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default)]
    pub zone_id: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub record_name: String,
    #[serde(default)]
    pub ip_type: IpType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_ip: Option<String>,
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
    /// Read-only status attached by the remote's listing
    #[serde(default, skip_serializing)]
    pub status: Option<String>,
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfig")
            .field("record_id", &self.record_id)
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<REDACTED>")
            .field("record_name", &self.record_name)
            .field("ip_type", &self.ip_type)
            .field("current_ip", &self.current_ip)
            .field("update_interval", &self.update_interval)
            .field("last_update_time", &self.last_update_time)
            .field("status", &self.status)
            .finish()
    }
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

/// A validated DNS record configuration
#[derive(Clone, PartialEq, Eq)]
pub struct DnsRecordConfig {
    record_id: Option<String>,
    zone_id: String,
    /// ⚠️ NEVER log this value
    api_token: String,
    record_name: String,
    ip_type: IpType,
    current_ip: Option<String>,
    update_interval_secs: u64,
    last_update_time: Option<DateTime<Utc>>,
    status: RecordStatus,
}

impl DnsRecordConfig {
    /// Create a pending configuration (no record id yet)
    ///
    /// Rejects blank required fields and intervals below
    /// [`MIN_UPDATE_INTERVAL_SECS`].
    pub fn new(
        zone_id: impl Into<String>,
        api_token: impl Into<String>,
        record_name: impl Into<String>,
        ip_type: IpType,
        update_interval_secs: u64,
    ) -> Result<Self> {
        let config = Self {
            record_id: None,
            zone_id: zone_id.into().trim().to_string(),
            api_token: api_token.into().trim().to_string(),
            record_name: record_name.into().trim().to_string(),
            ip_type,
            current_ip: None,
            update_interval_secs,
            last_update_time: None,
            status: RecordStatus::Unknown,
        };
        config.check()?;
        Ok(config)
    }

    /// Attach a provider-issued record id; a blank id leaves the config pending
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = non_blank(record_id.into());
        self
    }

    /// Build from the wire form
    ///
    /// Lenient on purpose: the remote is authoritative, so its records are
    /// accepted as listed. Only the interval floor is enforced, by raising.
    pub fn from_raw(raw: RawConfig) -> Self {
        let update_interval_secs = if raw.update_interval < MIN_UPDATE_INTERVAL_SECS {
            warn!(
                "record {} has update interval {}s, raising to {}s",
                raw.record_name, raw.update_interval, MIN_UPDATE_INTERVAL_SECS
            );
            MIN_UPDATE_INTERVAL_SECS
        } else {
            raw.update_interval
        };

        Self {
            record_id: raw.record_id.and_then(non_blank),
            zone_id: raw.zone_id,
            api_token: raw.api_token,
            record_name: raw.record_name,
            ip_type: raw.ip_type,
            current_ip: raw
                .current_ip
                .and_then(non_blank)
                .filter(|ip| !ip.eq_ignore_ascii_case(UNKNOWN_IP)),
            update_interval_secs,
            last_update_time: raw.last_update_time.as_deref().and_then(parse_timestamp),
            status: RecordStatus::from_remote(raw.status.as_deref()),
        }
    }

    /// Wire form for a save: writable fields only
    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            record_id: self.record_id.clone(),
            zone_id: self.zone_id.clone(),
            api_token: self.api_token.clone(),
            record_name: self.record_name.clone(),
            ip_type: self.ip_type,
            current_ip: None,
            update_interval: self.update_interval_secs,
            last_update_time: None,
            status: None,
        }
    }

    /// Check the local rules: required fields present, interval floor
    pub fn check(&self) -> Result<()> {
        if self.zone_id.is_empty() {
            return Err(Error::validation("zone_id is required"));
        }
        if self.api_token.is_empty() {
            return Err(Error::validation("api_token is required"));
        }
        if self.record_name.is_empty() {
            return Err(Error::validation("record_name is required"));
        }
        check_interval(self.update_interval_secs)
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    pub fn ip_type(&self) -> IpType {
        self.ip_type
    }

    /// `A` or `AAAA`, derived from [`DnsRecordConfig::ip_type`]
    pub fn record_type(&self) -> &'static str {
        self.ip_type.record_type()
    }

    /// Last known bound address, `None` if never observed
    pub fn current_ip(&self) -> Option<&str> {
        self.current_ip.as_deref()
    }

    /// Last known bound address or the `unknown` sentinel
    pub fn current_ip_display(&self) -> &str {
        self.current_ip.as_deref().unwrap_or(UNKNOWN_IP)
    }

    pub fn update_interval_secs(&self) -> u64 {
        self.update_interval_secs
    }

    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_update_time
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn set_record_name(&mut self, record_name: impl Into<String>) -> Result<()> {
        let record_name = record_name.into().trim().to_string();
        if record_name.is_empty() {
            return Err(Error::validation("record_name is required"));
        }
        self.record_name = record_name;
        Ok(())
    }

    pub fn set_api_token(&mut self, api_token: impl Into<String>) -> Result<()> {
        let api_token = api_token.into().trim().to_string();
        if api_token.is_empty() {
            return Err(Error::validation("api_token is required"));
        }
        self.api_token = api_token;
        Ok(())
    }

    pub fn set_ip_type(&mut self, ip_type: IpType) {
        self.ip_type = ip_type;
    }

    pub fn set_update_interval(&mut self, secs: u64) -> Result<()> {
        check_interval(secs)?;
        self.update_interval_secs = secs;
        Ok(())
    }

    pub(crate) fn set_status(&mut self, status: RecordStatus) {
        self.status = status;
    }
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for DnsRecordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsRecordConfig")
            .field("record_id", &self.record_id)
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<REDACTED>")
            .field("record_name", &self.record_name)
            .field("ip_type", &self.ip_type)
            .field("current_ip", &self.current_ip)
            .field("update_interval_secs", &self.update_interval_secs)
            .field("last_update_time", &self.last_update_time)
            .field("status", &self.status)
            .finish()
    }
}

/// Reject intervals below the floor
pub fn check_interval(secs: u64) -> Result<()> {
    if secs < MIN_UPDATE_INTERVAL_SECS {
        return Err(Error::validation(format!(
            "update interval must be at least {}s, got {}s",
            MIN_UPDATE_INTERVAL_SECS, secs
        )));
    }
    Ok(())
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, REMOTE_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(record_id: &str) -> RawConfig {
        RawConfig {
            record_id: Some(record_id.to_string()),
            zone_id: "z1".to_string(),
            api_token: "t1".to_string(),
            record_name: "a.example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_record_type_follows_ip_type() {
        let mut config = DnsRecordConfig::new("z1", "t1", "a.example.com", IpType::Ipv4, 300).unwrap();
        assert_eq!(config.record_type(), "A");
        config.set_ip_type(IpType::Ipv6);
        assert_eq!(config.record_type(), "AAAA");
        assert_eq!(IpType::from_record_type("aaaa"), Some(IpType::Ipv6));
    }

    #[test]
    fn test_new_rejects_short_interval() {
        let err = DnsRecordConfig::new("z1", "t1", "a.example.com", IpType::Ipv4, 59).unwrap_err();
        assert!(err.is_validation());
        assert!(DnsRecordConfig::new("z1", "t1", "a.example.com", IpType::Ipv4, 60).is_ok());
    }

    #[test]
    fn test_new_rejects_blank_fields() {
        assert!(DnsRecordConfig::new(" ", "t1", "a.example.com", IpType::Ipv4, 300).is_err());
        assert!(DnsRecordConfig::new("z1", "", "a.example.com", IpType::Ipv4, 300).is_err());
        assert!(DnsRecordConfig::new("z1", "t1", "", IpType::Ipv4, 300).is_err());
    }

    #[test]
    fn test_from_raw_defaults_and_sentinels() {
        let mut wire = raw("");
        wire.current_ip = Some("unknown".to_string());
        let config = DnsRecordConfig::from_raw(wire);

        assert_eq!(config.record_id(), None);
        assert_eq!(config.current_ip(), None);
        assert_eq!(config.current_ip_display(), UNKNOWN_IP);
        assert_eq!(config.update_interval_secs(), DEFAULT_UPDATE_INTERVAL_SECS);
        assert_eq!(config.status(), RecordStatus::Active);
    }

    #[test]
    fn test_from_raw_raises_interval_floor() {
        let mut wire = raw("r1");
        wire.update_interval = 10;
        assert_eq!(DnsRecordConfig::from_raw(wire).update_interval_secs(), MIN_UPDATE_INTERVAL_SECS);
    }

    #[test]
    fn test_from_raw_parses_remote_timestamp() {
        let mut wire = raw("r1");
        wire.last_update_time = Some("2024-03-01 12:30:00 UTC".to_string());
        let parsed = DnsRecordConfig::from_raw(wire).last_update_time().unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn test_wire_defaults_when_fields_missing() {
        let wire: RawConfig =
            serde_json::from_str(r#"{"record_id":"r1","zone_id":"z1","record_name":"a.example.com"}"#)
                .unwrap();
        assert_eq!(wire.ip_type, IpType::Ipv4);
        assert_eq!(wire.update_interval, DEFAULT_UPDATE_INTERVAL_SECS);
    }

    #[test]
    fn test_save_form_omits_read_only_fields() {
        let mut wire = raw("r1");
        wire.current_ip = Some("1.2.3.4".to_string());
        wire.status = Some("ok".to_string());
        let json = serde_json::to_value(DnsRecordConfig::from_raw(wire).to_raw()).unwrap();

        assert_eq!(json["record_id"], "r1");
        assert_eq!(json["ip_type"], "ipv4");
        assert!(json.get("current_ip").is_none());
        assert!(json.get("status").is_none());
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let config = DnsRecordConfig::new("z1", "secret-token", "a.example.com", IpType::Ipv4, 300).unwrap();
        let debug = format!("{:?} {:?}", config, config.to_raw());
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn test_remote_status_mapping() {
        assert_eq!(RecordStatus::from_remote(Some("ok")), RecordStatus::Active);
        assert_eq!(RecordStatus::from_remote(Some("error")), RecordStatus::Error);
        assert_eq!(RecordStatus::from_remote(Some("weird")), RecordStatus::Unknown);
        assert_eq!(RecordStatus::from_remote(None), RecordStatus::Active);
    }
}
