//! Shared helpers: an actix-web mock of the remote server and a
//! recording event observer.
#![allow(dead_code)]

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use bucketry_rs::{Alert, Client, ClientConfig, ClientEvents};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::{Mutex, Once};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Mock remote listening on an ephemeral port of 127.0.0.1
pub struct MockServer {
    pub addr: SocketAddr,
    handle: ServerHandle,
}

impl MockServer {
    pub async fn start<F>(configure: F) -> Self
    where
        F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
    {
        init_tracing();

        let server = HttpServer::new(move || App::new().configure(configure.clone()))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .expect("bind mock server");
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self { addr, handle }
    }

    pub fn remote(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.remote())
    }

    pub fn client(&self) -> Client {
        Client::new(self.config()).expect("client")
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

/// Answer with what was received: method, path, query, headers and body
pub async fn echo(req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let headers: Map<String, Value> = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_lowercase(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();

    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).to_string()))
    };

    HttpResponse::Ok().json(json!({
        "method": req.method().as_str(),
        "path": req.path(),
        "query": req.query_string(),
        "headers": headers,
        "body": body,
    }))
}

/// Observer keeping every notification it receives
#[derive(Default)]
pub struct RecordingEvents {
    pub backoffs: Mutex<Vec<Option<DateTime<Utc>>>>,
    pub alerts: Mutex<Vec<Alert>>,
    pub retries: Mutex<Vec<DateTime<Utc>>>,
}

impl ClientEvents for RecordingEvents {
    fn on_backoff(&self, release_at: Option<DateTime<Utc>>) {
        self.backoffs.lock().unwrap().push(release_at);
    }

    fn on_deprecated(&self, alert: &Alert) {
        self.alerts.lock().unwrap().push(alert.clone());
    }

    fn on_retry_after(&self, retry_at: DateTime<Utc>) {
        self.retries.lock().unwrap().push(retry_at);
    }
}
