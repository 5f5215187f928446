//! Core traits for the control panel
//!
//! This module defines the seams between the core and its environment.
//!
//! - [`HttpTransport`]: send one request to the remote API
//! - [`LinkSignal`]: connectivity notifications from the host
//! - [`CacheRefresh`]: re-sync target for the connection monitor

pub mod transport;
pub mod link_signal;
pub mod cache_refresh;

pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method};
pub use link_signal::{LinkEvent, LinkSignal};
pub use cache_refresh::CacheRefresh;
