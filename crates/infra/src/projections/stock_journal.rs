use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockyard_core::AggregateId;
use stockyard_events::EventEnvelope;
use stockyard_inventory::{ImportLotId, LotEvent};
use stockyard_products::{ProductEvent, ProductId, StockMovementReason};

use crate::store::StoredAggregate;

/// What a journal line records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalEntryKind {
    LotReceived,
    LotReserved,
    LotReturned,
    StockAdjusted(StockMovementReason),
}

/// One line of a product's stock history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub occurred_at: DateTime<Utc>,
    pub kind: JournalEntryKind,
    /// Lot concerned, for lot entries.
    pub lot_id: Option<ImportLotId>,
    /// Signed quantity change (lot remaining or product on-hand).
    pub delta: i64,
    /// Lot remaining or product on-hand after the change.
    pub balance_after: i64,
    /// Order or check that caused the change.
    pub reference: Option<AggregateId>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JournalProjectionError {
    #[error("failed to deserialize {aggregate_type} event: {message}")]
    Deserialize {
        aggregate_type: String,
        message: String,
    },

    #[error("event does not belong to stream {0}")]
    StreamMismatch(AggregateId),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("journal lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
struct JournalState {
    cursors: HashMap<AggregateId, u64>,
    entries: HashMap<ProductId, Vec<JournalEntry>>,
}

/// Auditable per-product stock history.
///
/// Consumes published envelopes (lot and product streams; others are ignored)
/// and is idempotent for at-least-once delivery. Disposable: it can be rebuilt
/// from the store's event log at any time.
#[derive(Debug, Default)]
pub struct StockJournalProjection {
    state: RwLock<JournalState>,
}

impl StockJournalProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// History of one product in delivery order.
    pub fn entries(&self, product_id: ProductId) -> Vec<JournalEntry> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.entries.get(&product_id).cloned())
            .unwrap_or_default()
    }

    /// Apply a published envelope.
    ///
    /// - Replays at or below the stream cursor are ignored
    /// - After the first event of a stream, sequence numbers must be contiguous
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), JournalProjectionError> {
        let aggregate_type = envelope.aggregate_type();
        if aggregate_type != stockyard_inventory::ImportLot::AGGREGATE_TYPE
            && aggregate_type != stockyard_products::Product::AGGREGATE_TYPE
        {
            return Ok(());
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| JournalProjectionError::Poisoned)?;

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = state.cursors.get(&aggregate_id).copied().unwrap_or(0);

        if seq == 0 {
            return Err(JournalProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(JournalProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let deserialize_error = |e: serde_json::Error| JournalProjectionError::Deserialize {
            aggregate_type: aggregate_type.to_string(),
            message: e.to_string(),
        };

        let line = if aggregate_type == stockyard_inventory::ImportLot::AGGREGATE_TYPE {
            let event: LotEvent =
                serde_json::from_value(envelope.payload().clone()).map_err(deserialize_error)?;
            lot_entry(&event, aggregate_id)?
        } else {
            let event: ProductEvent =
                serde_json::from_value(envelope.payload().clone()).map_err(deserialize_error)?;
            product_entry(&event, aggregate_id)?
        };

        if let Some((product_id, entry)) = line {
            state.entries.entry(product_id).or_default().push(entry);
        }
        state.cursors.insert(aggregate_id, seq);
        Ok(())
    }

    /// Rebuild from scratch by replaying envelopes (e.g. the store's event log).
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), JournalProjectionError> {
        {
            let mut state = self
                .state
                .write()
                .map_err(|_| JournalProjectionError::Poisoned)?;
            *state = JournalState::default();
        }

        for envelope in envelopes {
            self.apply_envelope(&envelope)?;
        }
        Ok(())
    }
}

fn lot_entry(
    event: &LotEvent,
    stream: AggregateId,
) -> Result<Option<(ProductId, JournalEntry)>, JournalProjectionError> {
    let (lot_id, product_id, entry) = match event {
        LotEvent::LotReceived(e) => (
            e.lot_id,
            e.product_id,
            JournalEntry {
                occurred_at: e.occurred_at,
                kind: JournalEntryKind::LotReceived,
                lot_id: Some(e.lot_id),
                delta: e.quantity,
                balance_after: e.quantity,
                reference: e.source_order,
            },
        ),
        LotEvent::LotReserved(e) => (
            e.lot_id,
            e.product_id,
            JournalEntry {
                occurred_at: e.occurred_at,
                kind: JournalEntryKind::LotReserved,
                lot_id: Some(e.lot_id),
                delta: -e.quantity,
                balance_after: e.remaining_after,
                reference: e.reference,
            },
        ),
        LotEvent::LotReturned(e) => (
            e.lot_id,
            e.product_id,
            JournalEntry {
                occurred_at: e.occurred_at,
                kind: JournalEntryKind::LotReturned,
                lot_id: Some(e.lot_id),
                delta: e.quantity,
                balance_after: e.remaining_after,
                reference: e.reference,
            },
        ),
    };

    if lot_id.0 != stream {
        return Err(JournalProjectionError::StreamMismatch(stream));
    }
    Ok(Some((product_id, entry)))
}

fn product_entry(
    event: &ProductEvent,
    stream: AggregateId,
) -> Result<Option<(ProductId, JournalEntry)>, JournalProjectionError> {
    let ProductEvent::StockAdjusted(e) = event else {
        return Ok(None);
    };
    if e.product_id.0 != stream {
        return Err(JournalProjectionError::StreamMismatch(stream));
    }

    Ok(Some((
        e.product_id,
        JournalEntry {
            occurred_at: e.occurred_at,
            kind: JournalEntryKind::StockAdjusted(e.reason),
            lot_id: None,
            delta: e.delta,
            balance_after: e.quantity_after,
            reference: Some(e.reference),
        },
    )))
}
