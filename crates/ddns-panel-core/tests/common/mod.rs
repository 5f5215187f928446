//! Test doubles and common utilities for contract tests
//!
//! The scripted transport answers by `(method, path)`. Each route holds a
//! queue of replies; the last reply of a queue repeats forever.

#![allow(dead_code)]

use async_trait::async_trait;
use ddns_panel_core::error::TransportError;
use ddns_panel_core::traits::{HttpRequest, HttpResponse, HttpTransport, Method};
use ddns_panel_core::{
    CacheRefresh, GatewayConfig, IpType, MonitorConfig, RawConfig, RecordStore, RequestGateway,
};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted outcome
#[derive(Debug, Clone)]
pub enum Reply {
    /// The remote answers with a status and body
    Status(u16, String),
    /// No reply at all
    NoReply,
    /// The request never completes
    Stall,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Reply::Status(200, body.to_string())
    }

    pub fn status(status: u16, body: &str) -> Self {
        Reply::Status(status, body.to_string())
    }
}

/// Transport that replays scripted replies and records every request
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
    offline: AtomicBool,
    interleave: AtomicBool,
    call_count: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
            interleave: AtomicBool::new(false),
            call_count: AtomicUsize::new(0),
        })
    }

    /// Queue a reply for a route
    pub fn on(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Drop queued replies for a route and install a new one
    pub fn replace(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), VecDeque::from([reply]));
        self
    }

    /// While offline every request gets no reply
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Yield to the scheduler once per request before replying, so
    /// concurrently polled callers are all in flight together
    pub fn set_interleave(&self, interleave: bool) {
        self.interleave.store(interleave, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    /// Bodies of every `POST /configs`, as lists of record ids
    pub fn saved_sets(&self) -> Vec<Vec<Option<String>>> {
        self.requests_to(Method::Post, "/configs")
            .into_iter()
            .map(|r| {
                r.body
                    .unwrap_or(Value::Null)["configs"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .map(|c| c["record_id"].as_str().map(str::to_string))
                    .collect()
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::new("host offline"));
        }

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&(request.method, request.path.clone())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        if self.interleave.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        match reply {
            Some(Reply::Status(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::NoReply) => Err(TransportError::new("connection refused")),
            Some(Reply::Stall) => std::future::pending().await,
            None => Ok(HttpResponse::new(404, "no route")),
        }
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

/// Counts refresh calls
pub struct CountingRefresh {
    pub calls: AtomicUsize,
}

impl CountingRefresh {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheRefresh for CountingRefresh {
    async fn refresh(&self) -> ddns_panel_core::Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

/// Wire form of a stored record
pub fn raw(record_id: &str, record_name: &str) -> RawConfig {
    RawConfig {
        record_id: Some(record_id.to_string()),
        zone_id: "z1".to_string(),
        api_token: "t1".to_string(),
        record_name: record_name.to_string(),
        ip_type: IpType::Ipv4,
        current_ip: None,
        update_interval: 300,
        last_update_time: None,
        status: None,
    }
}

/// `GET /configs` reply listing `configs`
pub fn configs_reply(configs: &[RawConfig]) -> Reply {
    Reply::ok(json!({ "success": true, "configs": configs }))
}

pub fn ack() -> Reply {
    Reply::ok(json!({ "success": true, "message": "saved" }))
}

pub fn rejected(message: &str) -> Reply {
    Reply::ok(json!({ "success": false, "message": message }))
}

pub fn valid() -> Reply {
    Reply::ok(json!({ "success": true, "is_valid": true }))
}

pub fn invalid(message: &str) -> Reply {
    Reply::ok(json!({ "success": false, "is_valid": false, "message": message }))
}

/// Gateway over `transport` with the default retry policy
pub fn gateway(transport: &Arc<ScriptedTransport>) -> Arc<RequestGateway> {
    Arc::new(RequestGateway::new(transport.clone(), &GatewayConfig::default()).unwrap())
}

/// Gateway and store over `transport`
pub fn harness(transport: &Arc<ScriptedTransport>) -> (Arc<RequestGateway>, Arc<RecordStore>) {
    let gateway = gateway(transport);
    let store = Arc::new(RecordStore::new(gateway.clone()));
    (gateway, store)
}

pub fn monitor_config() -> MonitorConfig {
    MonitorConfig::default()
}

/// Record ids of the store's cache, in order
pub fn cached_ids(store: &RecordStore) -> Vec<Option<String>> {
    store
        .records()
        .iter()
        .map(|r| r.record_id().map(str::to_string))
        .collect()
}

/// `Some("a"), Some("b")` shorthand
pub fn ids(list: &[&str]) -> Vec<Option<String>> {
    list.iter().map(|s| Some(s.to_string())).collect()
}
