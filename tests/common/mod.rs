//! Shared helpers: a local accelerator stand-in that records purge requests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    Router,
};

/// A request as seen by the accelerator.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    pub path: String,
    pub ban_pattern: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockAccelerator {
    received: Arc<Mutex<Vec<Received>>>,
    status: Arc<AtomicU16>,
}

impl MockAccelerator {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn respond_with(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }
}

async fn record(
    State(mock): State<MockAccelerator>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> StatusCode {
    mock.received.lock().unwrap().push(Received {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        ban_pattern: headers
            .get("x-ban-pattern")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
    StatusCode::from_u16(mock.status.load(Ordering::SeqCst)).unwrap()
}

/// Starts the mock on an ephemeral port and returns it with its base URL.
pub async fn spawn_accelerator() -> (MockAccelerator, String) {
    let mock = MockAccelerator::default();
    mock.respond_with(200);

    let app = Router::new().fallback(record).with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (mock, format!("http://{}", addr))
}
