//! Application services: load, decide, commit, publish.
//!
//! Every operation runs against a [`WorkingSet`]: aggregates are loaded once,
//! commands are executed in memory (possibly several per aggregate), and the
//! whole set of touched aggregates plus their events is committed in one unit
//! of work. Events are published only after the commit succeeded.

pub mod catalog;
pub mod lot_ledger;
pub mod movements;
pub mod stocktake;

use std::sync::Arc;

use serde_json::Value as JsonValue;

use stockyard_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion};
use stockyard_events::{EventBus, EventEnvelope};
use stockyard_inventory::ImportLot;
use stockyard_movements::MovementOrder;
use stockyard_products::Product;
use stockyard_stocktake::InventoryCheck;

use crate::codes::CodeGenerator;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{Changeset, Repository, Store, StoredAggregate};

pub use catalog::{Catalog, RegisterProduct};
pub use lot_ledger::{LotLedger, ReceiveLotRequest};
pub use movements::{CreateMovementRequest, MovementFilter, MovementService};
pub use stocktake::{CreateCheckRequest, InventoryCheckReconciler};

/// Shared handles every service works with.
pub struct ServiceContext<S, B> {
    store: Arc<S>,
    bus: Arc<B>,
    codes: Arc<CodeGenerator>,
}

impl<S, B> Clone for ServiceContext<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            bus: Arc::clone(&self.bus),
            codes: Arc::clone(&self.codes),
        }
    }
}

impl<S, B> ServiceContext<S, B> {
    pub fn new(store: Arc<S>, bus: Arc<B>, codes: Arc<CodeGenerator>) -> Self {
        Self { store, bus, codes }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    pub fn codes(&self) -> &CodeGenerator {
        &self.codes
    }
}

impl<S, B> ServiceContext<S, B>
where
    S: Store,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub(crate) fn begin(&self) -> WorkingSet<'_, S> {
        WorkingSet::new(&self.store)
    }

    /// Commit the working set, then publish its events.
    pub(crate) fn finish(&self, ws: WorkingSet<'_, S>) -> ServiceResult<()> {
        let envelopes = ws.commit()?;

        for envelope in envelopes {
            self.bus
                .publish(envelope)
                .map_err(|e| ServiceError::Publish(format!("{e:?}")))?;
        }
        Ok(())
    }

    /// Load one aggregate outside a working set.
    pub(crate) fn fetch<A>(&self, id: A::Id) -> ServiceResult<A>
    where
        A: StoredAggregate,
        S: Repository<A>,
    {
        Repository::<A>::get(&*self.store, &id)?
            .filter(|a| a.exists())
            .ok_or_else(|| not_found::<A>(id).into())
    }

    pub(crate) fn fetch_all<A>(&self, filter: &dyn Fn(&A) -> bool) -> ServiceResult<Vec<A>>
    where
        A: StoredAggregate,
        S: Repository<A>,
    {
        Ok(Repository::<A>::list_by(&*self.store, filter)?)
    }
}

pub(crate) fn not_found<A: StoredAggregate>(id: A::Id) -> DomainError {
    DomainError::not_found(format!("{} {id}", A::AGGREGATE_TYPE))
}

struct Entry<A> {
    aggregate: A,
    expected: ExpectedVersion,
    loaded_version: u64,
}

pub(crate) struct Tracked<A> {
    entries: Vec<Entry<A>>,
}

impl<A> Default for Tracked<A> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<A: StoredAggregate> Tracked<A> {
    fn position(&self, id: &A::Id) -> Option<usize> {
        self.entries.iter().position(|e| e.aggregate.id() == id)
    }

    /// Whether another writer committed any of these aggregates since they were loaded.
    fn moved_since_load<S: Repository<A>>(&self, store: &S) -> ServiceResult<bool> {
        for entry in &self.entries {
            let current = Repository::<A>::get(store, entry.aggregate.id())?.map(|a| a.version());
            if !entry.expected.matches(current) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn stage_dirty(self, changeset: &mut Changeset) {
        for entry in self.entries {
            if entry.aggregate.version() != entry.loaded_version {
                changeset.stage(entry.aggregate, entry.expected);
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct Entries {
    products: Tracked<Product>,
    lots: Tracked<ImportLot>,
    orders: Tracked<MovementOrder>,
    checks: Tracked<InventoryCheck>,
}

/// Selects the tracked table of an aggregate type.
pub(crate) trait Tracking: StoredAggregate {
    fn tracked(entries: &mut Entries) -> &mut Tracked<Self>;
}

impl Tracking for Product {
    fn tracked(entries: &mut Entries) -> &mut Tracked<Self> {
        &mut entries.products
    }
}

impl Tracking for ImportLot {
    fn tracked(entries: &mut Entries) -> &mut Tracked<Self> {
        &mut entries.lots
    }
}

impl Tracking for MovementOrder {
    fn tracked(entries: &mut Entries) -> &mut Tracked<Self> {
        &mut entries.orders
    }
}

impl Tracking for InventoryCheck {
    fn tracked(entries: &mut Entries) -> &mut Tracked<Self> {
        &mut entries.checks
    }
}

/// In-memory scratch state of one service operation.
pub(crate) struct WorkingSet<'s, S> {
    store: &'s S,
    entries: Entries,
    envelopes: Vec<EventEnvelope<JsonValue>>,
}

impl<'s, S: Store> WorkingSet<'s, S> {
    fn new(store: &'s S) -> Self {
        Self {
            store,
            entries: Entries::default(),
            envelopes: Vec::new(),
        }
    }

    fn slot<A>(&mut self, id: A::Id) -> ServiceResult<usize>
    where
        A: Tracking,
        S: Repository<A>,
    {
        if let Some(i) = A::tracked(&mut self.entries).position(&id) {
            return Ok(i);
        }

        let entry = match Repository::<A>::get(self.store, &id)? {
            Some(aggregate) => {
                let version = aggregate.version();
                Entry {
                    aggregate,
                    expected: ExpectedVersion::Exact(version),
                    loaded_version: version,
                }
            }
            None => Entry {
                aggregate: A::empty_for(id),
                expected: ExpectedVersion::New,
                loaded_version: 0,
            },
        };

        let tracked = A::tracked(&mut self.entries);
        tracked.entries.push(entry);
        Ok(tracked.entries.len() - 1)
    }

    /// Current in-memory state of an existing aggregate.
    pub(crate) fn existing<A>(&mut self, id: A::Id) -> ServiceResult<&A>
    where
        A: Tracking,
        S: Repository<A>,
    {
        let i = self.slot::<A>(id)?;
        let aggregate = &A::tracked(&mut self.entries).entries[i].aggregate;
        if !aggregate.exists() {
            return Err(not_found::<A>(id).into());
        }
        Ok(aggregate)
    }

    /// Execute a command against the tracked aggregate and record its events.
    pub(crate) fn execute<A>(
        &mut self,
        id: A::Id,
        command: &A::Command,
    ) -> ServiceResult<Vec<A::Event>>
    where
        A: Tracking,
        S: Repository<A>,
    {
        let i = self.slot::<A>(id)?;
        let aggregate = &mut A::tracked(&mut self.entries).entries[i].aggregate;

        let base = aggregate.version();
        let events = aggregate.execute(command)?;
        for (n, event) in events.iter().enumerate() {
            self.envelopes.push(EventEnvelope::from_typed(
                A::aggregate_id(id),
                A::AGGREGATE_TYPE,
                base + n as u64 + 1,
                event,
            )?);
        }
        Ok(events)
    }

    /// A decision taken on a stale snapshot reflects a lost race rather than
    /// the current state of the store.
    pub(crate) fn is_stale(&self) -> ServiceResult<bool> {
        Ok(self.entries.products.moved_since_load(self.store)?
            || self.entries.lots.moved_since_load(self.store)?
            || self.entries.orders.moved_since_load(self.store)?
            || self.entries.checks.moved_since_load(self.store)?)
    }

    /// Commit every aggregate whose version moved, returning the events to publish.
    fn commit(self) -> ServiceResult<Vec<EventEnvelope<JsonValue>>> {
        let mut changeset = Changeset::new();
        self.entries.products.stage_dirty(&mut changeset);
        self.entries.lots.stage_dirty(&mut changeset);
        self.entries.orders.stage_dirty(&mut changeset);
        self.entries.checks.stage_dirty(&mut changeset);

        if changeset.is_empty() {
            return Ok(Vec::new());
        }
        for envelope in &self.envelopes {
            changeset.record(envelope.clone());
        }

        self.store.commit(changeset)?;
        Ok(self.envelopes)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use stockyard_core::Money;
    use stockyard_events::InMemoryEventBus;
    use stockyard_inventory::{LotCommand, ReserveFromLot};

    use super::*;
    use crate::{CodePrefixes, EnvelopeBus, InMemoryStore};

    type Context = ServiceContext<InMemoryStore, EnvelopeBus>;

    fn context() -> Context {
        ServiceContext::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryEventBus::new()),
            Arc::new(CodeGenerator::new(CodePrefixes::default())),
        )
    }

    fn receive(ctx: &Context) -> ImportLot {
        let product = Catalog::new(ctx.clone())
            .register_product(RegisterProduct {
                code: "SP-001".to_string(),
                name: "Product".to_string(),
                unit_price: Money::ZERO,
                min_stock: None,
                max_stock: None,
                category_id: None,
                supplier_id: None,
            })
            .unwrap();
        LotLedger::new(ctx.clone())
            .receive_lot(ReceiveLotRequest {
                product_id: product.id_typed(),
                quantity: 10,
                unit_price: Money::ZERO,
                import_code: "PN-1".to_string(),
                imports_date: Utc::now(),
            })
            .unwrap()
    }

    #[test]
    fn working_set_notices_commits_made_after_loading() {
        let ctx = context();
        let lot = receive(&ctx);

        let mut ws = ctx.begin();
        ws.existing::<ImportLot>(lot.id_typed()).unwrap();
        assert!(!ws.is_stale().unwrap());

        LotLedger::new(ctx.clone())
            .reserve_from_lot(lot.id_typed(), 3, None)
            .unwrap();
        assert!(ws.is_stale().unwrap());
    }

    #[test]
    fn own_uncommitted_changes_do_not_make_the_set_stale() {
        let ctx = context();
        let lot = receive(&ctx);

        let mut ws = ctx.begin();
        ws.execute::<ImportLot>(
            lot.id_typed(),
            &LotCommand::ReserveFromLot(ReserveFromLot {
                lot_id: lot.id_typed(),
                quantity: 4,
                reference: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert!(!ws.is_stale().unwrap());
    }
}
