// # Link Signal Trait
//
// Defines the interface for the host environment's connectivity
// notifications (a browser's online/offline events, a network manager's
// link state, ...).
//
// A signal is a hint, not a verdict: the connection monitor always confirms
// it with a health probe before changing state.

use std::pin::Pin;
use tokio_stream::Stream;

/// Connectivity change reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEvent {
    /// The local network link came up
    Online,
    /// The local network link went away
    Offline,
}

/// Trait for host connectivity signal sources
///
/// # Behavior
///
/// - The stream yields an event per host notification, duplicates allowed
/// - The stream ending means the host stopped reporting; the monitor keeps
///   polling without it
/// - Must be cancellation-safe (dropping the stream releases resources)
pub trait LinkSignal: Send + Sync {
    /// Watch for connectivity changes
    ///
    /// Called once per monitor run.
    fn watch(&self) -> Pin<Box<dyn Stream<Item = LinkEvent> + Send + 'static>>;
}
