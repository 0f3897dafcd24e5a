//! Bucketry Client Library
//!
//! HTTP client for remote bucket/collection/record storage servers, with
//! chunked batch transactions, optimistic concurrency headers,
//! `Retry-After` handling and paginated listing.

mod batch;
mod client;
mod events;
mod http;
mod pagination;

use std::time::Duration;

pub use batch::{Batch, BatchOperations, BatchResult};
pub use bucketry_core::{
    AggregateResult, Alert, Attachment, ClientConfig, HttpMethod, PermissionOp, Permissions,
    RequestDescriptor, RequestOptions, ServerInfo, ServerSettings, SubResponse, ValidationError,
};
pub use client::Client;
pub use events::{ClientEvents, NoopEvents};
pub use http::{HttpResponse, HttpTransport};
pub use pagination::{ListParams, PageResult, Pages};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("HTTP {status}; {source}")]
    Unparseable {
        status: u16,
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        body: serde_json::Value,
    },

    #[error("Pagination exhausted.")]
    PaginationExhausted,
}

impl ClientError {
    /// HTTP status attached to the error, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unparseable { status, .. } | ClientError::Server { status, .. } => {
                Some(*status)
            }
            ClientError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
