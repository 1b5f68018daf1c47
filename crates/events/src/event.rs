use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **cheap to clone** (every subscriber receives its own copy)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name, also used as the realtime channel event name
    /// (e.g. "products").
    fn event_type(&self) -> &'static str;

    /// When the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}
