#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use proxyctl_core::Result;
use proxyctl_core::http::{ApiRequest, ApiResponse, Connection, Method, TokenSource, Transport};

pub const LEGACY_BASE: &str = "https://api.enterprise.apigee.com/v1/organizations/acme";
pub const MODERN_BASE: &str = "https://apigee.googleapis.com/v1/organizations/acme";

type Handler = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

/// Transport that answers from a handler and records every request in order.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer with `responses` in order; 500 once they run out.
    pub fn scripted(responses: Vec<ApiResponse>) -> Arc<Self> {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ApiResponse::new(500, "no scripted response left"))
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// `METHOD /path?query` below the organization base, for compact assertions.
    pub fn calls(&self) -> Vec<String> {
        self.requests().iter().map(describe).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let response = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}

pub fn describe(request: &ApiRequest) -> String {
    let path = request.url.path();
    let path = path
        .strip_prefix("/v1/organizations/acme")
        .unwrap_or(path);
    match request.url.query() {
        Some(query) => format!("{} {}?{}", request.method, path, query),
        None => format!("{} {}", request.method, path),
    }
}

pub fn is(request: &ApiRequest, method: Method, path_suffix: &str) -> bool {
    request.method == method && request.url.path().ends_with(path_suffix)
}

pub fn json(status: u16, value: Value) -> ApiResponse {
    ApiResponse::json_body(status, &value)
}

/// Token source that hands out `stale` until a forced refresh, then `fresh`.
#[derive(Default)]
pub struct RefreshingTokens {
    refreshes: AtomicUsize,
}

impl RefreshingTokens {
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for RefreshingTokens {
    async fn token(&self, force_refresh: bool) -> Result<String> {
        if force_refresh {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
        if self.refreshes() > 0 {
            Ok("fresh".to_string())
        } else {
            Ok("stale".to_string())
        }
    }
}

pub fn connection(base: &str, transport: Arc<MockTransport>) -> Connection {
    Connection::new(
        base,
        "acme",
        Arc::new(proxyctl_core::http::StaticToken::new("token")),
        transport,
    )
}

/// Write a minimal bundle tree under `src/<root>`.
pub fn write_bundle(src: &Path, root: &str, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = src.join(root).join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

pub fn entry_set(archive: &Path) -> Vec<String> {
    let mut names = proxyctl_core::bundle::entry_names(archive).unwrap();
    names.sort();
    names
}
