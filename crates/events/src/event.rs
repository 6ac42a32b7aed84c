use chrono::{DateTime, Utc};

/// A domain event: an immutable fact about a warehouse aggregate.
///
/// Events are versioned so that consumers (the stock journal, external
/// subscribers) can evolve with the schema.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "inventory.lot.reserved").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
