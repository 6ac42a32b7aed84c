//! Read-side projections fed by published envelopes.

pub mod stock_journal;

pub use stock_journal::{
    JournalEntry, JournalEntryKind, JournalProjectionError, StockJournalProjection,
};
