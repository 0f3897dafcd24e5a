//! Pure builders turning a logical write into a [`RequestDescriptor`].
//!
//! Builders receive already-resolved options (client defaults merged with
//! per-call overrides) and never touch the network.

use serde_json::{json, Value};

use crate::error::ValidationError;
use crate::models::{
    merge_headers, set_header, Attachment, Headers, HttpMethod, PermissionOp, Permissions,
    RequestDescriptor, ResourceBody,
};
use crate::options::RequestOptions;

pub const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// Conditional header enforcing optimistic concurrency.
///
/// - not safe: nothing
/// - safe with a known version: `If-Match: "<last_modified>"`
/// - safe without version: `If-None-Match: *` (only if absent)
pub fn safe_header(safe: bool, last_modified: Option<u64>) -> Headers {
    let mut headers = Headers::new();
    if !safe {
        return headers;
    }
    match last_modified {
        Some(version) => {
            headers.insert("If-Match".to_string(), format!("\"{}\"", version));
        }
        None => {
            headers.insert("If-None-Match".to_string(), "*".to_string());
        }
    }
    headers
}

fn resource_body(data: Option<Value>, permissions: Option<Permissions>) -> Option<Value> {
    let body = ResourceBody { data, permissions };
    // ResourceBody only holds JSON values and string maps
    serde_json::to_value(body).ok()
}

/// Read the `id` member of a data object, when it is a non-empty string
pub fn data_id(data: Option<&Value>) -> Option<&str> {
    data.and_then(|d| d.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Resolve a resource id from an explicit argument or the payload's `id`
pub fn require_id<'a>(
    kind: &'static str,
    explicit: Option<&'a str>,
    data: Option<&'a Value>,
) -> Result<&'a str, ValidationError> {
    explicit
        .filter(|id| !id.is_empty())
        .or_else(|| data_id(data))
        .ok_or(ValidationError::MissingId { kind })
}

/// Create a resource: PUT when the data carries an id, POST otherwise
pub fn create_request(
    path: &str,
    data: Option<Value>,
    permissions: Option<Permissions>,
    options: &RequestOptions,
) -> RequestDescriptor {
    let method = if data_id(data.as_ref()).is_some() {
        HttpMethod::Put
    } else {
        HttpMethod::Post
    };
    let headers = merge_headers(
        &options.headers,
        &safe_header(options.is_safe(), options.last_modified),
    );

    RequestDescriptor {
        method,
        path: path.to_string(),
        headers,
        body: resource_body(data, permissions),
        attachment: None,
    }
}

/// Update a resource: PUT for a full replacement, PATCH when `patch` is set.
///
/// The version used for the conditional header is taken from the options,
/// falling back to `data.last_modified`. Data carrying nothing but
/// `id`/`last_modified` is dropped so permission-only updates stay partial.
pub fn update_request(
    path: &str,
    data: Option<Value>,
    permissions: Option<Permissions>,
    options: &RequestOptions,
) -> RequestDescriptor {
    let last_modified = options.last_modified.or_else(|| {
        data.as_ref()
            .and_then(|d| d.get("last_modified"))
            .and_then(Value::as_u64)
    });

    let data = data.filter(|d| match d.as_object() {
        Some(fields) => fields
            .keys()
            .any(|k| k != "id" && k != "last_modified"),
        None => true,
    });

    let method = if options.is_patch() {
        HttpMethod::Patch
    } else {
        HttpMethod::Put
    };
    let headers = merge_headers(
        &options.headers,
        &safe_header(options.is_safe(), last_modified),
    );

    RequestDescriptor {
        method,
        path: path.to_string(),
        headers,
        body: resource_body(data, permissions),
        attachment: None,
    }
}

/// Delete a resource; a safe delete needs a known `last_modified`
pub fn delete_request(
    path: &str,
    options: &RequestOptions,
) -> Result<RequestDescriptor, ValidationError> {
    if options.is_safe() && options.last_modified.is_none() {
        return Err(ValidationError::MissingLastModified);
    }
    let headers = merge_headers(
        &options.headers,
        &safe_header(options.is_safe(), options.last_modified),
    );

    Ok(RequestDescriptor {
        method: HttpMethod::Delete,
        path: path.to_string(),
        headers,
        body: None,
        attachment: None,
    })
}

/// Add or remove principals with a JSON-Patch document
pub fn json_patch_permissions_request(
    path: &str,
    permissions: &Permissions,
    op: PermissionOp,
    options: &RequestOptions,
) -> RequestDescriptor {
    let mut headers = merge_headers(
        &options.headers,
        &safe_header(options.is_safe(), options.last_modified),
    );
    set_header(&mut headers, "Content-Type", JSON_PATCH_CONTENT_TYPE);

    let ops: Vec<Value> = permissions
        .iter()
        .flat_map(|(perm, principals)| {
            principals.iter().map(move |principal| {
                json!({
                    "op": op.as_str(),
                    "path": format!("/permissions/{}/{}", perm, principal),
                })
            })
        })
        .collect();

    RequestDescriptor {
        method: HttpMethod::Patch,
        path: path.to_string(),
        headers,
        body: Some(Value::Array(ops)),
        attachment: None,
    }
}

/// Upload a file as multipart form data
pub fn add_attachment_request(
    path: &str,
    attachment: Attachment,
    options: &RequestOptions,
) -> RequestDescriptor {
    let headers = merge_headers(
        &options.headers,
        &safe_header(options.is_safe(), options.last_modified),
    );

    RequestDescriptor {
        method: HttpMethod::Post,
        path: path.to_string(),
        headers,
        body: None,
        attachment: Some(attachment),
    }
}
