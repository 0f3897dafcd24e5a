use serde::{Deserialize, Serialize};

use crate::models::{merge_headers, set_header, Headers};

/// Per-call request options.
///
/// Every field is optional so that a set of overrides can be layered on
/// top of client defaults with [`RequestOptions::merge`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestOptions {
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// Headers are merged key-wise, names compared case-insensitively, with
    /// the override winning on collision;
    /// scalar options are replaced only when the override sets them.
    pub fn merge(&self, overrides: &RequestOptions) -> RequestOptions {
        RequestOptions {
            headers: merge_headers(&self.headers, &overrides.headers),
            safe: overrides.safe.or(self.safe),
            retry: overrides.retry.or(self.retry),
            last_modified: overrides.last_modified.or(self.last_modified),
            patch: overrides.patch.or(self.patch),
            bucket: overrides.bucket.clone().or_else(|| self.bucket.clone()),
            collection: overrides
                .collection
                .clone()
                .or_else(|| self.collection.clone()),
            aggregate: overrides.aggregate.or(self.aggregate),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    pub fn with_safe(mut self, safe: bool) -> Self {
        self.safe = Some(safe);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_last_modified(mut self, last_modified: u64) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    pub fn with_patch(mut self, patch: bool) -> Self {
        self.patch = Some(patch);
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_aggregate(mut self, aggregate: bool) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn is_safe(&self) -> bool {
        self.safe.unwrap_or(false)
    }

    pub fn is_patch(&self) -> bool {
        self.patch.unwrap_or(false)
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate.unwrap_or(false)
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_headers_override_wins() {
        let defaults = RequestOptions::new()
            .with_header("Authorization", "Basic abc")
            .with_header("X-Trace", "default");
        let overrides = RequestOptions::new()
            .with_header("X-Trace", "call")
            .with_header("X-Extra", "1");

        let merged = defaults.merge(&overrides);

        assert_eq!(merged.headers.len(), 3);
        assert_eq!(merged.headers["Authorization"], "Basic abc");
        assert_eq!(merged.headers["X-Trace"], "call");
        assert_eq!(merged.headers["X-Extra"], "1");
    }

    #[test]
    fn test_merge_header_override_ignores_case() {
        let defaults = RequestOptions::new().with_header("authorization", "default");
        let merged = defaults.merge(&RequestOptions::new().with_header("Authorization", "per-call"));

        assert_eq!(merged.headers.len(), 1);
        assert_eq!(merged.headers["Authorization"], "per-call");
    }

    #[test]
    fn test_merge_keeps_defaults_when_unset() {
        let defaults = RequestOptions::new()
            .with_safe(true)
            .with_retry(2)
            .with_bucket("main");
        let merged = defaults.merge(&RequestOptions::new().with_collection("tasks"));

        assert!(merged.is_safe());
        assert_eq!(merged.retry_budget(), 2);
        assert_eq!(merged.bucket.as_deref(), Some("main"));
        assert_eq!(merged.collection.as_deref(), Some("tasks"));
        assert!(!merged.is_patch());
        assert!(!merged.is_aggregate());
    }

    #[test]
    fn test_merge_explicit_false_overrides_true() {
        let defaults = RequestOptions::new().with_safe(true);
        let merged = defaults.merge(&RequestOptions::new().with_safe(false));
        assert!(!merged.is_safe());
    }
}
