//! Bucketry Core Library
//!
//! Network-free building blocks of the Bucketry client:
//! - Request descriptors and conditional (safe) headers
//! - Option merging
//! - Resource paths and operations
//! - Batch response aggregation
//! - Client configuration

pub mod aggregate;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod operations;
pub mod options;
pub mod requests;

// Re-export commonly used types
pub use aggregate::aggregate;
pub use config::ClientConfig;
pub use error::ValidationError;
pub use models::*;
pub use options::RequestOptions;
