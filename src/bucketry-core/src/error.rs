use serde_json::Value;

/// Malformed caller input, detected before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("A {kind} id is required.")]
    MissingId { kind: &'static str },

    #[error("Safe concurrency check requires a last_modified value.")]
    MissingLastModified,

    #[error("Invalid value for since ({0}), should be ETag value.")]
    InvalidSince(String),

    #[error("Responses length should match requests one ({responses} responses for {requests} requests).")]
    LengthMismatch { responses: usize, requests: usize },

    #[error("Nested batch calls are not supported.")]
    NestedBatch,

    #[error("Attachments cannot be sent as part of a batch.")]
    AttachmentInBatch,

    #[error("Invalid remote URL {url}: {reason}")]
    InvalidRemote { url: String, reason: String },
}

/// Known server error numbers (`errno` in error bodies)
pub fn error_code_message(code: u64) -> Option<&'static str> {
    let message = match code {
        104 => "Missing Authorization Token",
        105 => "Invalid Authorization Token",
        106 => "Request body was not valid JSON",
        107 => "Invalid request parameter",
        108 => "Missing request parameter",
        109 => "Invalid posted data",
        110 => "Invalid Token / id",
        111 => "Missing Token / id",
        112 => "Content-Length header was not provided",
        113 => "Request body too large",
        114 => "Resource was created, updated or deleted meanwhile",
        115 => "Method not allowed on this end point (hint: server may be readonly)",
        116 => "Requested version not available on this server",
        117 => "Client has sent too many requests",
        121 => "Resource access is forbidden for this user",
        122 => "Another resource violates constraint",
        201 => "Service Temporary unavailable due to high load",
        202 => "Service deprecated",
        999 => "Internal Server Error",
        _ => return None,
    };
    Some(message)
}

/// Build the message of a failed (>= 400) response.
///
/// Starts from the status line, then adds the text of a recognized
/// `errno` and the server-provided `message`, when present.
pub fn server_error_message(status: u16, reason: Option<&str>, body: &Value) -> String {
    let mut message = match reason {
        Some(reason) => format!("HTTP {} {}", status, reason),
        None => format!("HTTP {}", status),
    };

    if let Some(known) = body
        .get("errno")
        .and_then(Value::as_u64)
        .and_then(error_code_message)
    {
        message.push_str(": ");
        message.push_str(known);
    }

    if let Some(detail) = body.get("message").and_then(Value::as_str) {
        message.push_str(" (");
        message.push_str(detail);
        message.push(')');
    }

    message
}
