//! Reply envelopes of the remote API
//!
//! Every reply carries a `success` flag; a `false` flag on a 2xx reply is
//! still a rejection and is mapped to [`crate::Error::Api`] by the gateway.

use serde::{Deserialize, Serialize};

use crate::record::RawConfig;

/// `GET /configs`
#[derive(Debug, Deserialize)]
pub(crate) struct ConfigsEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub configs: Option<Vec<RawConfig>>,
}

/// `POST /configs`
#[derive(Debug, Deserialize)]
pub(crate) struct AckEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /configs/validate`
#[derive(Debug, Deserialize)]
pub(crate) struct ValidateEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /wizard/validate-token`
#[derive(Debug, Deserialize)]
pub(crate) struct ZonesEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub zones: Option<Vec<ZoneSummary>>,
}

/// `POST /wizard/get-records`
#[derive(Debug, Deserialize)]
pub(crate) struct ZoneRecordsEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub records: Option<Vec<ZoneRecordSummary>>,
}

/// Result of a remote "update now"
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Human-readable summary from the remote
    #[serde(default)]
    pub message: Option<String>,
    /// Address the remote bound, when it reports one
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Domain the update targeted, when it reports one
    #[serde(default)]
    pub domain: Option<String>,
    /// Whether any record actually changed
    #[serde(default)]
    pub updated: bool,
}

/// A zone visible to an API token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub id: String,
    pub name: String,
}

/// An existing A/AAAA record inside a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecordSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
}
