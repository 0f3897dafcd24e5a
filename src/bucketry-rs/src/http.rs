use bucketry_core::error::server_error_message;
use bucketry_core::{Alert, HttpMethod, RequestDescriptor};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::events::ClientEvents;
use crate::{ClientError, Result};

const DEFAULT_HEADERS: [(&str, &str); 2] = [
    ("Accept", "application/json"),
    ("Content-Type", "application/json"),
];

/// Fully parsed outcome of one successful round trip
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed body, `Null` for an empty body
    pub json: Value,
    pub headers: HeaderMap,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        header_str(&self.headers, name)
    }
}

/// JSON-over-HTTP transport.
///
/// Applies default headers, enforces the request timeout, reports
/// `Backoff`/`Alert`/`Retry-After` signals to the observer and honors
/// `Retry-After` within the caller's retry budget.
pub struct HttpTransport {
    client: HttpClient,
    timeout: Option<Duration>,
    events: Arc<dyn ClientEvents>,
    backoff_release: RwLock<Option<DateTime<Utc>>>,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>, events: Arc<dyn ClientEvents>) -> Result<Self> {
        let client = HttpClient::builder().build()?;
        Ok(Self {
            client,
            timeout,
            events,
            backoff_release: RwLock::new(None),
        })
    }

    /// Remaining time before the server expects clients to resume, zero if none
    pub async fn backoff(&self) -> Duration {
        match *self.backoff_release.read().await {
            Some(release) => (release - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            None => Duration::ZERO,
        }
    }

    /// Send `descriptor` to the absolute `url`.
    ///
    /// `retry` is the number of resubmissions allowed when the server
    /// answers with a `Retry-After` header.
    pub async fn request(
        &self,
        url: &str,
        descriptor: &RequestDescriptor,
        retry: u32,
    ) -> Result<HttpResponse> {
        let mut remaining = retry;

        loop {
            debug!(
                method = descriptor.method.as_str(),
                url,
                retry = remaining,
                "Sending request"
            );

            let (status, headers, text) = self.round_trip(url, descriptor).await?;

            self.check_for_deprecation_header(&headers);
            self.check_for_backoff_header(&headers).await;

            if let Some(delay) = self.check_for_retry_after_header(&headers) {
                if remaining > 0 {
                    warn!(
                        url,
                        delay_ms = delay.as_millis() as u64,
                        remaining,
                        "Server asked to retry later, waiting"
                    );
                    tokio::time::sleep(delay).await;
                    remaining -= 1;
                    continue;
                }
            }

            return parse_response(status, headers, &text);
        }
    }

    /// One send + full body read, bounded by the timeout.
    ///
    /// When the timeout fires the in-flight exchange is dropped, so a late
    /// response can never settle the call a second time.
    async fn round_trip(
        &self,
        url: &str,
        descriptor: &RequestDescriptor,
    ) -> Result<(StatusCode, HeaderMap, String)> {
        let exchange = async {
            let response = self.build_request(url, descriptor)?.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let text = response.text().await?;
            Ok::<_, ClientError>((status, headers, text))
        };

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| ClientError::Timeout {
                    url: url.to_string(),
                    timeout,
                })?,
            None => exchange.await,
        }
    }

    fn build_request(
        &self,
        url: &str,
        descriptor: &RequestDescriptor,
    ) -> Result<reqwest::RequestBuilder> {
        let mut builder = self.client.request(method(descriptor.method), url);

        for (name, value) in request_headers(descriptor) {
            builder = builder.header(name, value);
        }

        if let Some(attachment) = &descriptor.attachment {
            let part = Part::bytes(attachment.bytes.clone())
                .file_name(attachment.file_name.clone())
                .mime_str(&attachment.content_type)?;
            builder = builder.multipart(Form::new().part("attachment", part));
        } else if let Some(body) = &descriptor.body {
            builder = builder.json(body);
        }

        Ok(builder)
    }

    fn check_for_deprecation_header(&self, headers: &HeaderMap) {
        if let Some(raw) = header_str(headers, "Alert") {
            match serde_json::from_str::<Alert>(raw) {
                Ok(alert) => {
                    warn!(
                        message = %alert.message,
                        url = ?alert.url,
                        "Server sent a deprecation notice"
                    );
                    self.events.on_deprecated(&alert);
                }
                Err(e) => warn!("Unable to parse Alert header {:?}: {}", raw, e),
            }
        }
    }

    async fn check_for_backoff_header(&self, headers: &HeaderMap) {
        let seconds = match header_str(headers, "Backoff").and_then(|v| v.trim().parse::<u64>().ok())
        {
            Some(seconds) => seconds,
            None => return,
        };

        let release_at = if seconds > 0 {
            warn!(seconds, "Server asked clients to back off");
            Some(instant_after(Duration::from_secs(seconds)))
        } else {
            None
        };

        *self.backoff_release.write().await = release_at;
        self.events.on_backoff(release_at);
    }

    fn check_for_retry_after_header(&self, headers: &HeaderMap) -> Option<Duration> {
        let seconds = header_str(headers, "Retry-After")?
            .trim()
            .parse::<u64>()
            .ok()?;
        let delay = Duration::from_secs(seconds);
        self.events.on_retry_after(instant_after(delay));
        Some(delay)
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn instant_after(delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Default JSON headers overridden (case-insensitively) by the descriptor.
///
/// Multipart bodies get no Content-Type at all so the client can set the
/// boundary itself.
fn request_headers(descriptor: &RequestDescriptor) -> Vec<(String, String)> {
    let multipart = descriptor.is_multipart();
    let is_content_type = |name: &str| name.eq_ignore_ascii_case("content-type");

    let mut headers: Vec<(String, String)> = DEFAULT_HEADERS
        .iter()
        .filter(|(name, _)| !(multipart && is_content_type(name)))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    for (name, value) in &descriptor.headers {
        if multipart && is_content_type(name) {
            continue;
        }
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        headers.push((name.clone(), value.clone()));
    }

    headers
}

fn parse_response(status: StatusCode, headers: HeaderMap, text: &str) -> Result<HttpResponse> {
    let code = status.as_u16();

    let json = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(text).map_err(|source| ClientError::Unparseable {
            status: code,
            source,
            body: text.to_string(),
        })?
    };

    if code >= 400 {
        let message = server_error_message(code, status.canonical_reason(), &json);
        debug!(status = code, "{}", message);
        return Err(ClientError::Server {
            status: code,
            message,
            body: json,
        });
    }

    Ok(HttpResponse {
        status: code,
        json,
        headers,
    })
}
