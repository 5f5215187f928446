// # Host Link Signal
//
// Channel-backed `LinkSignal` for hosts that push connectivity changes
// (a UI shell forwarding browser online/offline events, a network manager
// hook, a test).

use std::pin::Pin;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::traits::{LinkEvent, LinkSignal};

/// Link signal fed by the host
///
/// The stream can be taken once; later calls to `watch` yield an empty
/// stream and the monitor falls back to polling.
pub struct HostLinkSignal {
    tx: mpsc::UnboundedSender<LinkEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<LinkEvent>>>,
}

impl HostLinkSignal {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Report that the host link came up
    pub fn notify_online(&self) {
        self.notify(LinkEvent::Online);
    }

    /// Report that the host link went away
    pub fn notify_offline(&self) {
        self.notify(LinkEvent::Offline);
    }

    /// Report a link event
    pub fn notify(&self, event: LinkEvent) {
        if self.tx.send(event).is_err() {
            debug!("Link signal has no watcher, {:?} dropped", event);
        }
    }

    /// A sender for hosts that report from another task
    pub fn sender(&self) -> mpsc::UnboundedSender<LinkEvent> {
        self.tx.clone()
    }
}

impl Default for HostLinkSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkSignal for HostLinkSignal {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = LinkEvent> + Send + 'static>> {
        let rx = match self.rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match rx {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => {
                warn!("Link signal already watched, new watcher gets no events");
                Box::pin(tokio_stream::empty())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_events_reach_the_watcher_in_order() {
        let signal = HostLinkSignal::new();
        let mut stream = signal.watch();

        signal.notify_offline();
        signal.sender().send(LinkEvent::Online).unwrap();

        assert_eq!(stream.next().await, Some(LinkEvent::Offline));
        assert_eq!(stream.next().await, Some(LinkEvent::Online));
    }

    #[tokio::test]
    async fn test_second_watch_is_empty() {
        let signal = HostLinkSignal::new();
        let _first = signal.watch();
        let mut second = signal.watch();

        assert_eq!(second.next().await, None);
    }
}
