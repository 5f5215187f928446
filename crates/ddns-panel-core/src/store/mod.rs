//! Record store
//!
//! In-memory, insertion-ordered cache of the remote's record configurations.
//!
//! ## Consistency Model
//!
//! The remote persists the whole set at once, so every mutation is a
//! full-set replacement:
//!
//! ```text
//! lock ──► snapshot cache ──► apply change ──► POST /configs (full set)
//!                                                   │
//!                                ┌──────success─────┴─────failure──────┐
//!                                ▼                                     ▼
//!                         commit to cache                       cache untouched
//! ```
//!
//! The operation lock is held across the whole sequence, so the next
//! snapshot is taken only after the previous save settled.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gateway::{RequestGateway, UpdateOutcome};
use crate::record::{DnsRecordConfig, RawConfig, RecordKey, RecordStatus};
use crate::traits::CacheRefresh;

/// A cached record and its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub key: RecordKey,
    pub config: DnsRecordConfig,
}

impl RecordEntry {
    fn new(config: DnsRecordConfig) -> Self {
        Self {
            key: RecordKey::for_config(&config),
            config,
        }
    }
}

/// Client-side cache of record configurations
pub struct RecordStore {
    /// Gateway to the remote
    gateway: Arc<RequestGateway>,

    /// Committed cache; receivers see every commit
    cache_tx: watch::Sender<Vec<RecordEntry>>,

    /// Serializes snapshot → save → commit sequences
    op_lock: Mutex<()>,

    /// Whether a load has completed
    loaded: AtomicBool,
}

impl RecordStore {
    /// Create an empty store
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        let (cache_tx, _) = watch::channel(Vec::new());
        Self {
            gateway,
            cache_tx,
            op_lock: Mutex::new(()),
            loaded: AtomicBool::new(false),
        }
    }

    /// The gateway this store talks through
    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }

    /// Fetch the full set and replace the cache
    ///
    /// On failure the cache keeps its previous contents.
    pub async fn load(&self) -> Result<Vec<DnsRecordConfig>> {
        let _guard = self.op_lock.lock().await;

        let raw = self.gateway.fetch_configs().await.inspect_err(|e| {
            warn!("Loading records failed, keeping cached set: {}", e);
        })?;

        let entries = dedup_by_record_id(raw);
        let configs: Vec<DnsRecordConfig> = entries.iter().map(|e| e.config.clone()).collect();

        self.cache_tx.send_replace(entries);
        self.loaded.store(true, Ordering::SeqCst);
        info!("Loaded {} record(s)", configs.len());

        Ok(configs)
    }

    /// Replace the remote's set with `all` and commit it
    ///
    /// Every config must pass its local check and record ids must be unique
    /// within the set; otherwise nothing is sent.
    pub async fn save(&self, all: Vec<DnsRecordConfig>) -> Result<()> {
        {
            let mut seen = HashSet::new();
            for config in &all {
                config.check()?;
                if let Some(id) = config.record_id() {
                    if !seen.insert(id) {
                        return Err(Error::validation(format!("record {} appears more than once", id)));
                    }
                }
            }
        }

        let _guard = self.op_lock.lock().await;

        let previous = self.entries();
        let entries = all
            .into_iter()
            .map(|config| {
                let existing = config
                    .record_id()
                    .and_then(|id| previous.iter().find(|e| e.config.record_id() == Some(id)));
                match existing {
                    Some(entry) => RecordEntry {
                        key: entry.key.clone(),
                        config,
                    },
                    None => RecordEntry::new(config),
                }
            })
            .collect();

        self.persist(entries).await
    }

    /// Insert or replace a record
    ///
    /// A config with a record id already in the cache replaces that entry in
    /// place; anything else is appended. Its zone cannot change through an
    /// upsert.
    pub async fn upsert(&self, config: DnsRecordConfig) -> Result<DnsRecordConfig> {
        config.check()?;

        let _guard = self.op_lock.lock().await;

        let mut entries = self.entries();
        let mut committed = config;
        committed.set_status(RecordStatus::Active);

        let existing = committed
            .record_id()
            .and_then(|id| entries.iter().position(|e| e.config.record_id() == Some(id)));

        match existing {
            Some(index) => {
                if entries[index].config.zone_id() != committed.zone_id() {
                    return Err(Error::validation(format!(
                        "record {} belongs to zone {}, not {}",
                        entries[index].key,
                        entries[index].config.zone_id(),
                        committed.zone_id()
                    )));
                }
                entries[index].config = committed.clone();
            }
            None => entries.push(RecordEntry::new(committed.clone())),
        }

        self.persist(entries).await?;
        Ok(committed)
    }

    /// Remove a record by id
    ///
    /// An id that is not cached is a [`Error::State`] and sends nothing.
    pub async fn remove(&self, record_id: &str) -> Result<()> {
        self.remove_key(&RecordKey::Persisted(record_id.to_string()))
            .await
    }

    /// Remove a record by key, including pending records
    pub async fn remove_key(&self, key: &RecordKey) -> Result<()> {
        let _guard = self.op_lock.lock().await;

        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|e| &e.key != key);

        if entries.len() == before {
            return Err(Error::state(format!("no cached record {}", key)));
        }

        self.persist(entries).await
    }

    /// Ask the remote to reconcile every record now
    ///
    /// Does not touch the cache.
    pub async fn trigger_remote_update(&self) -> Result<UpdateOutcome> {
        let outcome = self.gateway.trigger_update().await?;
        info!(
            "Remote update finished (updated: {}){}",
            outcome.updated,
            outcome
                .message
                .as_deref()
                .map(|m| format!(": {}", m))
                .unwrap_or_default()
        );
        Ok(outcome)
    }

    /// Trigger a remote update, then reload the cache
    pub async fn trigger_and_reload(&self) -> Result<(UpdateOutcome, Vec<DnsRecordConfig>)> {
        let outcome = self.trigger_remote_update().await?;
        let records = self.load().await?;
        Ok((outcome, records))
    }

    /// Validate a config locally, then against the remote
    ///
    /// Never saves.
    pub async fn validate(&self, config: &DnsRecordConfig) -> Result<()> {
        config.check()?;
        self.gateway.validate_config(&config.to_raw()).await
    }

    /// Committed configurations in order
    pub fn records(&self) -> Vec<DnsRecordConfig> {
        self.cache_tx
            .borrow()
            .iter()
            .map(|e| e.config.clone())
            .collect()
    }

    /// Committed entries in order
    pub fn entries(&self) -> Vec<RecordEntry> {
        self.cache_tx.borrow().clone()
    }

    /// Look up a committed record by id
    pub fn get(&self, record_id: &str) -> Option<DnsRecordConfig> {
        self.cache_tx
            .borrow()
            .iter()
            .find(|e| e.config.record_id() == Some(record_id))
            .map(|e| e.config.clone())
    }

    pub fn len(&self) -> usize {
        self.cache_tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache_tx.borrow().is_empty()
    }

    /// Whether a load has completed
    pub fn has_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// First-run rule: loaded and nothing configured
    pub fn needs_setup(&self) -> bool {
        self.has_loaded() && self.is_empty()
    }

    /// Receiver that observes every commit
    pub fn subscribe(&self) -> watch::Receiver<Vec<RecordEntry>> {
        self.cache_tx.subscribe()
    }

    /// Save a full set and commit it on success
    ///
    /// Callers hold the operation lock.
    async fn persist(&self, entries: Vec<RecordEntry>) -> Result<()> {
        let payload: Vec<RawConfig> = entries.iter().map(|e| e.config.to_raw()).collect();
        debug!("Saving full set of {} record(s)", payload.len());

        self.gateway.save_configs(&payload).await.inspect_err(|e| {
            warn!("Save rejected, keeping cached set: {}", e);
        })?;

        info!("Committed {} record(s)", entries.len());
        self.cache_tx.send_replace(entries);
        Ok(())
    }
}

#[async_trait]
impl CacheRefresh for RecordStore {
    async fn refresh(&self) -> Result<usize> {
        Ok(self.load().await?.len())
    }
}

/// Build entries from the remote listing, keeping the first of each record id
fn dedup_by_record_id(raw: Vec<RawConfig>) -> Vec<RecordEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw.len());

    for config in raw.into_iter().map(DnsRecordConfig::from_raw) {
        if let Some(id) = config.record_id() {
            if !seen.insert(id.to_string()) {
                warn!("Remote listed record {} more than once, keeping the first", id);
                continue;
            }
        }
        entries.push(RecordEntry::new(config));
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::error::TransportError;
    use crate::record::IpType;
    use crate::traits::{HttpRequest, HttpResponse, HttpTransport};
    use std::sync::atomic::AtomicUsize;

    /// Answers every request with the same reply
    struct Fixed {
        status: u16,
        body: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for Fixed {
        async fn send(&self, _request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(self.status, self.body))
        }

        fn transport_name(&self) -> &'static str {
            "fixed"
        }
    }

    fn store(status: u16, body: &'static str) -> (RecordStore, Arc<Fixed>) {
        let transport = Arc::new(Fixed {
            status,
            body,
            calls: AtomicUsize::new(0),
        });
        let gateway = RequestGateway::new(transport.clone(), &GatewayConfig::default()).unwrap();
        (RecordStore::new(Arc::new(gateway)), transport)
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let raw = vec![
            RawConfig {
                record_id: Some("r1".to_string()),
                record_name: "first.example.com".to_string(),
                ..Default::default()
            },
            RawConfig {
                record_id: Some("r1".to_string()),
                record_name: "second.example.com".to_string(),
                ..Default::default()
            },
            RawConfig {
                record_name: "pending.example.com".to_string(),
                ..Default::default()
            },
        ];

        let entries = dedup_by_record_id(raw);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].config.record_name(), "first.example.com");
        assert!(matches!(entries[1].key, RecordKey::Pending(_)));
    }

    #[tokio::test]
    async fn test_new_store_is_not_loaded() {
        let (store, _) = store(200, r#"{"success":true,"configs":[]}"#);
        assert!(!store.has_loaded());
        assert!(!store.needs_setup());

        store.load().await.unwrap();
        assert!(store.has_loaded());
        assert!(store.needs_setup());
    }

    #[tokio::test]
    async fn test_remove_unknown_id_sends_nothing() {
        let (store, transport) = store(200, r#"{"success":true}"#);

        let err = store.remove("missing").await.unwrap_err();

        assert!(matches!(err, Error::State(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_config_before_saving() {
        let (store, transport) = store(200, r#"{"success":true}"#);
        let raw = RawConfig {
            zone_id: "z1".to_string(),
            api_token: "t1".to_string(),
            record_name: String::new(),
            ip_type: IpType::Ipv4,
            update_interval: 300,
            ..Default::default()
        };

        let err = store.upsert(DnsRecordConfig::from_raw(raw)).await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
