use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Header map used by descriptors and sub-responses
pub type Headers = BTreeMap<String, String>;

/// Insert a header, replacing any existing one whose name differs only by case
pub fn set_header(headers: &mut Headers, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
    headers.insert(name, value.into());
}

/// Layer `overrides` over `base`; names are compared case-insensitively
/// and the override wins on collision.
pub fn merge_headers(base: &Headers, overrides: &Headers) -> Headers {
    let mut merged = base.clone();
    for (name, value) in overrides {
        set_header(&mut merged, name.clone(), value.clone());
    }
    merged
}

/// Permission name (`read`, `write`, ...) to list of principals
pub type Permissions = BTreeMap<String, Vec<String>>;

/// HTTP methods understood by the remote server
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    #[default]
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// File payload for attachment uploads, sent as multipart form data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Declarative representation of one HTTP operation before it is sent.
///
/// `path` is always relative to the remote; the transport prepends the
/// base URL right before sending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RequestDescriptor {
    #[serde(default)]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Multipart payload; never part of a composite batch body
    #[serde(skip)]
    pub attachment: Option<Attachment>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_multipart(&self) -> bool {
        self.attachment.is_some()
    }
}

/// `{data, permissions}` envelope sent for resource writes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResourceBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

/// One element of a composite batch response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubResponse {
    pub status: u16,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub headers: Headers,
}

/// Shared defaults of a composite batch request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BatchDefaults {
    #[serde(default)]
    pub headers: Headers,
}

/// Body of `POST /batch`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BatchRequest {
    pub defaults: BatchDefaults,
    pub requests: Vec<RequestDescriptor>,
}

/// Body returned by `POST /batch`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BatchResponse {
    pub responses: Vec<SubResponse>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictType {
    Outgoing,
}

/// A write rejected by a failed precondition (HTTP 412)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub local: Value,
    pub remote: Value,
}

/// A sub-request that failed for any reason other than 404/412
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchError {
    pub path: String,
    pub sent: RequestDescriptor,
    pub error: Value,
}

/// Categorized outcome of a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AggregateResult {
    pub published: Vec<Value>,
    pub conflicts: Vec<Conflict>,
    pub skipped: Vec<Value>,
    pub errors: Vec<BatchError>,
}

/// `settings` section of the server root document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServerSettings {
    /// Maximum sub-requests per batch; absent or non-positive means unlimited
    #[serde(default)]
    pub batch_max_requests: Option<i64>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ServerSettings {
    /// Chunk size to use for batching, `None` when unlimited
    pub fn max_batch_size(&self) -> Option<usize> {
        match self.batch_max_requests {
            Some(max) if max > 0 => Some(max as usize),
            _ => None,
        }
    }
}

/// Server root document (`GET /`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServerInfo {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_version: Option<String>,
    #[serde(default)]
    pub http_api_version: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub settings: ServerSettings,
    #[serde(default)]
    pub capabilities: serde_json::Map<String, Value>,
    #[serde(default)]
    pub user: Option<Value>,
}

/// Deprecation notice carried by the `Alert` response header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// JSON-Patch operation applied to permissions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionOp {
    Add,
    Remove,
}

impl PermissionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionOp::Add => "add",
            PermissionOp::Remove => "remove",
        }
    }
}
