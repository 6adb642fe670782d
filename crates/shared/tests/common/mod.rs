#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use axum::Router;
use serde_json::Value;

/// One request as seen by a mock server.
#[derive(Debug, Clone)]
pub struct Captured {
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Requests recorded by the handlers of one mock server, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Captured>>>);

impl Recorder {
    pub fn push(&self, path: impl Into<String>, headers: HeaderMap, body: String) -> usize {
        let mut requests = self.0.lock().unwrap();
        requests.push(Captured {
            path: path.into(),
            headers,
            body,
        });
        requests.len()
    }

    pub fn all(&self) -> Vec<Captured> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Serve `app` on an ephemeral loopback port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
