use bucketry_core::Alert;
use chrono::{DateTime, Utc};

/// Observer for advisory signals sent by the server.
///
/// Notifications never change the outcome of the request that carried
/// them. The observer is scoped to one client instance.
pub trait ClientEvents: Send + Sync {
    /// `Backoff` header seen; `None` when the server lifted the backoff
    fn on_backoff(&self, _release_at: Option<DateTime<Utc>>) {}

    /// `Alert` header seen
    fn on_deprecated(&self, _alert: &Alert) {}

    /// `Retry-After` header seen
    fn on_retry_after(&self, _retry_at: DateTime<Utc>) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl ClientEvents for NoopEvents {}
