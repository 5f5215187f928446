// # ddns-panel-core
//
// Client-side synchronization core for the DDNS control panel.
//
// ## Architecture Overview
//
// The remote DDNS service is the source of truth for record configurations.
// This library sits between a front end and that service:
// - **RequestGateway**: HTTP calls with bounded retry, plus the health probe
//   that owns the connection status
// - **ConnectionMonitor**: periodic and signal-driven probing, emits
//   transitions and re-syncs the cache after a reconnect
// - **RecordStore**: insertion-ordered record cache, full-set saves,
//   last-known-good reconciliation
// - **SetupWizard**: first-run state machine that ends in a record upsert
//
// ## Design Principles
//
// 1. **Remote is authoritative**: the cache changes only after the remote
//    accepted the full set
// 2. **Bounded retry**: only transport failures are retried, a fixed number of
//    times, in one place (the gateway)
// 3. **Single owner per shared state**: connection status belongs to the
//    gateway, the record cache to the store
// 4. **Library-first**: the CLI is a thin layer over these types

pub mod traits;
pub mod gateway;
pub mod monitor;
pub mod store;
pub mod wizard;
pub mod config;
pub mod error;
pub mod record;

// Re-export core types for convenience
pub use traits::{CacheRefresh, HttpTransport, LinkSignal};
pub use gateway::{CallOptions, ConnectionStatus, RequestGateway};
pub use monitor::{ConnectionMonitor, HostLinkSignal, MonitorEvent, MonitorHandle};
pub use store::{RecordEntry, RecordStore};
pub use wizard::{SetupWizard, WizardState, WizardStep};
pub use config::{GatewayConfig, MonitorConfig, PanelConfig};
pub use error::{Error, Result, TransportError};
pub use record::{DnsRecordConfig, IpType, RawConfig, RecordKey, RecordStatus};
