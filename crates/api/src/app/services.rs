use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value as JsonValue;

use stockyard_events::{EventBus, EventEnvelope, Subscription};
use stockyard_infra::{
    CodePrefixes, EnvelopeBus, InMemoryStore, Stockyard,
    projections::{JournalEntry, StockJournalProjection},
    store::UnitOfWork,
};
use stockyard_products::ProductId;

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub stockyard: Stockyard<InMemoryStore, EnvelopeBus>,
    journal: StockJournalProjection,
    journal_feed: Mutex<Subscription<EventEnvelope<JsonValue>>>,
}

pub fn build_services(prefixes: CodePrefixes) -> AppServices {
    let stockyard = Stockyard::in_memory(prefixes);
    let journal_feed = Mutex::new(stockyard.bus().subscribe());

    AppServices {
        stockyard,
        journal: StockJournalProjection::new(),
        journal_feed,
    }
}

impl AppServices {
    /// Stock history of one product.
    ///
    /// Pending envelopes are applied first. If the feed is out of order the
    /// journal is rebuilt from the store's event log.
    pub fn journal_entries(&self, product_id: ProductId) -> Vec<JournalEntry> {
        self.sync_journal();
        self.journal.entries(product_id)
    }

    /// Apply every envelope waiting on the journal feed; returns how many were taken.
    pub fn sync_journal(&self) -> usize {
        let pending = match self.journal_feed.lock() {
            Ok(feed) => feed.drain(),
            Err(_) => Vec::new(),
        };

        for envelope in &pending {
            if let Err(e) = self.journal.apply_envelope(envelope) {
                tracing::warn!(error = %e, "journal feed rejected envelope; rebuilding");
                self.rebuild_journal();
                break;
            }
        }
        pending.len()
    }

    fn rebuild_journal(&self) {
        let result = self
            .stockyard
            .store()
            .event_log()
            .map_err(|e| e.to_string())
            .and_then(|log| {
                self.journal
                    .rebuild_from_scratch(log)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            tracing::error!(error = %e, "journal rebuild failed");
        }
    }
}

/// Keep the journal feed drained while the services are alive.
///
/// The feed is an unbounded channel; without a reader it grows with every
/// committed change. The task stops once the last `Arc` is dropped.
pub fn spawn_journal_sync(
    services: &Arc<AppServices>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    let services = Arc::downgrade(services);
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticks.tick().await;
            let Some(services) = services.upgrade() else {
                tracing::debug!("journal sync stopped");
                break;
            };
            let applied = services.sync_journal();
            if applied > 0 {
                tracing::debug!(applied, "journal synced");
            }
        }
    })
}
