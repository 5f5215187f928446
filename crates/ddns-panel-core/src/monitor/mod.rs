//! Connection monitor
//!
//! The ConnectionMonitor is responsible for:
//! - Probing the remote on start and every poll interval
//! - Confirming host link signals with a probe before believing them
//! - Notifying subscribers once per observed transition
//! - Re-syncing the record cache after a reconnect
//!
//! ## Event Flow
//!
//! ```text
//! tick ────────────────────────────┐
//! LinkEvent::Offline ──────────────┤
//! LinkEvent::Online ──► settle ────┴──► probe_health() ──► observed state changed?
//!                                                             │
//!                                              no ◄───────────┴──────────► yes
//!                                                                          │
//!                                                         StatusChanged ◄──┤
//!                                                                          │
//!                                                       offline → online? ─┴──► refresh cache
//! ```

mod link;

pub use link::HostLinkSignal;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::gateway::{ConnectionStatus, RequestGateway};
use crate::traits::{CacheRefresh, LinkEvent, LinkSignal};

/// Events emitted by the ConnectionMonitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// The observed connection state changed
    StatusChanged {
        previous: ConnectionStatus,
        current: ConnectionStatus,
    },

    /// The cache was re-synced after a reconnect
    CacheRefreshed { records: usize },

    /// Re-sync after a reconnect failed; the cache kept its previous contents
    CacheRefreshFailed { error: String },
}

/// Which trigger led to a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeTrigger {
    Tick,
    LinkOffline,
    Settled,
}

/// Periodic and signal-driven reachability watcher
pub struct ConnectionMonitor {
    /// Gateway whose health probe decides the state
    gateway: Arc<RequestGateway>,

    /// Host connectivity hints
    link: Arc<dyn LinkSignal>,

    /// Re-synced after `offline → online`
    refresh_target: Option<Arc<dyn CacheRefresh>>,

    poll_interval: Duration,
    settle_delay: Duration,

    /// Event sender for subscribers
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl ConnectionMonitor {
    /// Create a new monitor
    ///
    /// # Parameters
    ///
    /// - `gateway`: Gateway used for probes
    /// - `link`: Host connectivity signal source
    /// - `config`: Poll interval, settle delay and event channel capacity
    pub fn new(
        gateway: Arc<RequestGateway>,
        link: Arc<dyn LinkSignal>,
        config: &MonitorConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);

        Ok(Self {
            gateway,
            link,
            refresh_target: None,
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
            event_tx,
        })
    }

    /// Re-sync `target` whenever the remote comes back
    pub fn with_refresh_target(mut self, target: Arc<dyn CacheRefresh>) -> Self {
        self.refresh_target = Some(target);
        self
    }

    /// Subscribe to monitor events
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    /// Spawn the monitor loop
    ///
    /// The loop runs until [`MonitorHandle::stop`] or until the handle is dropped.
    pub fn start(self) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let event_tx = self.event_tx.clone();

        let task = tokio::spawn(async move {
            self.run_with_shutdown(shutdown_rx).await;
        });

        MonitorHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
            event_tx,
        }
    }

    /// Run the monitor loop until `shutdown_rx` fires or its sender is dropped
    ///
    /// Probes and refreshes are raced against shutdown, so nothing is emitted
    /// once shutdown was observed.
    pub async fn run_with_shutdown(&self, mut shutdown_rx: oneshot::Receiver<()>) {
        info!(
            "Connection monitor started (poll every {:?}, settle {:?})",
            self.poll_interval, self.settle_delay
        );

        let mut observed = ConnectionStatus::Unknown;

        // First tick completes immediately: the probe on start
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut link_events = self.link.watch();
        let mut link_open = true;

        let settle = tokio::time::sleep(self.settle_delay);
        tokio::pin!(settle);
        let mut settling = false;

        loop {
            let trigger = tokio::select! {
                _ = &mut shutdown_rx => break,

                _ = ticker.tick() => Some(ProbeTrigger::Tick),

                event = link_events.next(), if link_open => match event {
                    Some(LinkEvent::Online) => {
                        // A new online signal restarts the settle window
                        debug!("Link online, settling for {:?}", self.settle_delay);
                        settle.as_mut().reset(Instant::now() + self.settle_delay);
                        settling = true;
                        None
                    }
                    Some(LinkEvent::Offline) => {
                        debug!("Link offline");
                        settling = false;
                        Some(ProbeTrigger::LinkOffline)
                    }
                    None => {
                        debug!("Link signal closed, polling only");
                        link_open = false;
                        None
                    }
                },

                _ = &mut settle, if settling => {
                    settling = false;
                    Some(ProbeTrigger::Settled)
                }
            };

            let Some(trigger) = trigger else {
                continue;
            };

            observed = tokio::select! {
                _ = &mut shutdown_rx => break,
                next = self.observe(observed, trigger) => next,
            };
        }

        info!("Connection monitor stopped");
    }

    /// Probe once and act on a change of the observed state
    async fn observe(&self, previous: ConnectionStatus, trigger: ProbeTrigger) -> ConnectionStatus {
        let current = if self.gateway.probe_health().await {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        };

        if current == previous {
            debug!("Probe after {:?}: still {}", trigger, current);
            return current;
        }

        info!("Connection {} -> {} (after {:?})", previous, current, trigger);
        self.emit(MonitorEvent::StatusChanged { previous, current });

        if previous == ConnectionStatus::Offline && current == ConnectionStatus::Online {
            self.refresh_cache().await;
        }

        current
    }

    async fn refresh_cache(&self) {
        let Some(target) = &self.refresh_target else {
            return;
        };

        match target.refresh().await {
            Ok(records) => {
                info!("Re-synced {} record(s) after reconnect", records);
                self.emit(MonitorEvent::CacheRefreshed { records });
            }
            Err(e) => {
                warn!("Re-sync after reconnect failed: {}", e);
                self.emit(MonitorEvent::CacheRefreshFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: MonitorEvent) {
        // No subscribers is not an error
        if self.event_tx.send(event).is_err() {
            debug!("No monitor subscribers, event dropped");
        }
    }
}

/// Handle to a running monitor
///
/// Dropping the handle stops the monitor as well.
pub struct MonitorHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl MonitorHandle {
    /// Subscribe to monitor events
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the monitor loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the monitor and wait for its loop to exit
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // The loop may already be gone
            let _ = tx.send(());
        }

        if let Err(e) = self.task.await {
            warn!("Connection monitor task ended abnormally: {}", e);
        }
    }
}
