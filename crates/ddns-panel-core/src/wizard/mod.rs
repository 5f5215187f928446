//! First-run setup wizard
//!
//! ## State Machine
//!
//! ```text
//!              submit_token            submit_zone_record            finish
//! CollectToken ───────────► CollectZoneRecord ───────────► CollectPolicy ─────► Finalizing ──ok──► Done
//!      ▲                        │       ▲                       │                  │
//!      └──────── back ──────────┘       └──────── back ─────────┘ ◄────── err ─────┘
//!
//! any non-terminal step ──abort──► Aborted
//! ```
//!
//! Step methods called from the wrong step are rejected with
//! [`Error::State`] and leave the step unchanged.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gateway::{ZoneRecordSummary, ZoneSummary};
use crate::record::{self, DnsRecordConfig, IpType, DEFAULT_UPDATE_INTERVAL_SECS};
use crate::store::RecordStore;

/// Wizard steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    CollectToken,
    CollectZoneRecord,
    CollectPolicy,
    Finalizing,
    Done,
    Aborted,
}

impl WizardStep {
    /// Whether the wizard has ended
    pub fn is_terminal(self) -> bool {
        matches!(self, WizardStep::Done | WizardStep::Aborted)
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WizardStep::CollectToken => "collect_token",
            WizardStep::CollectZoneRecord => "collect_zone_record",
            WizardStep::CollectPolicy => "collect_policy",
            WizardStep::Finalizing => "finalizing",
            WizardStep::Done => "done",
            WizardStep::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Values collected so far
#[derive(Clone, PartialEq, Eq)]
pub struct WizardState {
    pub api_token: String,
    pub zone_id: String,
    pub record_name: String,
    pub record_id: String,
    pub ip_type: IpType,
    pub update_interval_secs: u64,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            zone_id: String::new(),
            record_name: String::new(),
            record_id: String::new(),
            ip_type: IpType::default(),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
        }
    }
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardState")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("record_id", &self.record_id)
            .field("ip_type", &self.ip_type)
            .field("update_interval_secs", &self.update_interval_secs)
            .finish()
    }
}

/// Guided creation of the first record
pub struct SetupWizard {
    store: Arc<RecordStore>,
    step: WizardStep,
    state: WizardState,
}

impl SetupWizard {
    /// Start a wizard at [`WizardStep::CollectToken`]
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            step: WizardStep::CollectToken,
            state: WizardState::default(),
        }
    }

    /// First-run rule: show the wizard when a load found nothing
    pub fn should_auto_show(store: &RecordStore) -> bool {
        store.needs_setup()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Accept the API token
    pub fn submit_token(&mut self, token: &str) -> Result<()> {
        self.expect_step(WizardStep::CollectToken, "submit_token")?;

        let token = required(token, "API token")?;
        self.state.api_token = token;
        self.advance(WizardStep::CollectZoneRecord);
        Ok(())
    }

    /// Accept the zone and record identity
    pub fn submit_zone_record(&mut self, zone_id: &str, record_name: &str, record_id: &str) -> Result<()> {
        self.expect_step(WizardStep::CollectZoneRecord, "submit_zone_record")?;

        let zone_id = required(zone_id, "zone id")?;
        let record_name = required(record_name, "record name")?;
        let record_id = required(record_id, "record id")?;

        self.state.zone_id = zone_id;
        self.state.record_name = record_name;
        self.state.record_id = record_id;
        self.advance(WizardStep::CollectPolicy);
        Ok(())
    }

    /// Accept the policy and create the record
    ///
    /// Validates against the remote, then upserts through the store. On
    /// success the wizard is `Done` and its state is discarded; on failure
    /// it returns to `CollectPolicy` with every field kept.
    pub async fn finish(&mut self, ip_type: IpType, update_interval_secs: u64) -> Result<DnsRecordConfig> {
        self.expect_step(WizardStep::CollectPolicy, "finish")?;
        record::check_interval(update_interval_secs)?;

        self.state.ip_type = ip_type;
        self.state.update_interval_secs = update_interval_secs;
        self.advance(WizardStep::Finalizing);

        let created = {
            // Also restores the step when this future is dropped mid-request
            let rollback = RollbackToPolicy { step: &mut self.step, armed: true };
            let created = create_record(&self.store, &self.state).await;
            if created.is_ok() {
                rollback.disarm();
            }
            created
        };

        match created {
            Ok(config) => {
                info!("Setup finished for {}", config.record_name());
                self.state = WizardState::default();
                self.advance(WizardStep::Done);

                if let Err(e) = self.store.load().await {
                    warn!("Reload after setup failed: {}", e);
                }

                Ok(config)
            }
            Err(e) => {
                warn!("Setup could not be finalized: {}", e);
                Err(e)
            }
        }
    }

    /// Step back, keeping collected values
    pub fn back(&mut self) -> Result<()> {
        let previous = match self.step {
            WizardStep::CollectZoneRecord => WizardStep::CollectToken,
            WizardStep::CollectPolicy => WizardStep::CollectZoneRecord,
            other => return Err(Error::state(format!("cannot go back from {}", other))),
        };
        self.advance(previous);
        Ok(())
    }

    /// Abandon the wizard and discard its state
    pub fn abort(&mut self) -> Result<()> {
        if self.step.is_terminal() || self.step == WizardStep::Finalizing {
            return Err(Error::state(format!("cannot abort from {}", self.step)));
        }
        self.state = WizardState::default();
        self.advance(WizardStep::Aborted);
        Ok(())
    }

    /// Zones the collected token can access
    pub async fn discover_zones(&self) -> Result<Vec<ZoneSummary>> {
        if self.state.api_token.is_empty() || self.step == WizardStep::CollectToken {
            return Err(Error::state("zones can be listed once a token was submitted"));
        }
        self.store.gateway().validate_token(&self.state.api_token).await
    }

    /// A/AAAA records of a zone reachable with the collected token
    pub async fn discover_records(&self, zone_id: &str) -> Result<Vec<ZoneRecordSummary>> {
        if self.state.api_token.is_empty() || self.step == WizardStep::CollectToken {
            return Err(Error::state("records can be listed once a token was submitted"));
        }
        let zone_id = required(zone_id, "zone id")?;
        self.store
            .gateway()
            .list_zone_records(&self.state.api_token, &zone_id)
            .await
    }

    fn expect_step(&self, expected: WizardStep, action: &str) -> Result<()> {
        if self.step != expected {
            return Err(Error::state(format!(
                "{} requires step {}, wizard is at {}",
                action, expected, self.step
            )));
        }
        Ok(())
    }

    fn advance(&mut self, next: WizardStep) {
        debug!("Wizard {} -> {}", self.step, next);
        self.step = next;
    }
}

/// Puts a finalizing wizard back to `CollectPolicy` unless disarmed
struct RollbackToPolicy<'a> {
    step: &'a mut WizardStep,
    armed: bool,
}

impl RollbackToPolicy<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RollbackToPolicy<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("Wizard {} -> {}", self.step, WizardStep::CollectPolicy);
            *self.step = WizardStep::CollectPolicy;
        }
    }
}

async fn create_record(store: &RecordStore, state: &WizardState) -> Result<DnsRecordConfig> {
    let config = DnsRecordConfig::new(
        state.zone_id.clone(),
        state.api_token.clone(),
        state.record_name.clone(),
        state.ip_type,
        state.update_interval_secs,
    )?
    .with_record_id(state.record_id.clone());

    store.validate(&config).await?;
    store.upsert(config).await
}

fn required(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{} is required", what)));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  t1 ", "token").unwrap(), "t1");
        assert!(required("   ", "token").unwrap_err().is_validation());
    }

    #[test]
    fn test_terminal_steps() {
        assert!(WizardStep::Done.is_terminal());
        assert!(WizardStep::Aborted.is_terminal());
        assert!(!WizardStep::Finalizing.is_terminal());
    }

    #[test]
    fn test_rollback_restores_policy_unless_disarmed() {
        let mut step = WizardStep::Finalizing;
        drop(RollbackToPolicy { step: &mut step, armed: true });
        assert_eq!(step, WizardStep::CollectPolicy);

        let mut step = WizardStep::Finalizing;
        RollbackToPolicy { step: &mut step, armed: true }.disarm();
        assert_eq!(step, WizardStep::Finalizing);
    }

    #[test]
    fn test_state_debug_redacts_token() {
        let state = WizardState {
            api_token: "secret-token".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", state);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<REDACTED>"));
    }
}
