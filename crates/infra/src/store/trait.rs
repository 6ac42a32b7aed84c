use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockyard_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion};
use stockyard_events::{Event as DomainEvent, EventEnvelope};
use stockyard_inventory::{ImportLot, ImportLotId};
use stockyard_movements::{MovementOrder, MovementOrderId};
use stockyard_products::{Product, ProductId};
use stockyard_stocktake::{InventoryCheck, InventoryCheckId};

use std::sync::Arc;

/// An aggregate the store knows how to persist.
///
/// Stored aggregates are snapshots: the store keeps the latest state and its
/// version, while the events that produced it are appended to the event log in
/// the same commit.
pub trait StoredAggregate:
    AggregateRoot<Id: Copy + Ord + core::fmt::Display>
    + Aggregate<Error = DomainError, Event: DomainEvent + Serialize>
    + Clone
    + Send
    + Sync
    + 'static
{
    /// Stream name used in envelopes (e.g. `inventory.lot`).
    const AGGREGATE_TYPE: &'static str;

    fn empty_for(id: Self::Id) -> Self;

    fn aggregate_id(id: Self::Id) -> AggregateId;

    /// Whether the aggregate has been created (as opposed to an `empty` shell).
    fn exists(&self) -> bool;

    fn stage(self, expected: ExpectedVersion) -> Staged;
}

impl StoredAggregate for Product {
    const AGGREGATE_TYPE: &'static str = "products.product";

    fn empty_for(id: ProductId) -> Self {
        Product::empty(id)
    }

    fn aggregate_id(id: ProductId) -> AggregateId {
        id.0
    }

    fn exists(&self) -> bool {
        self.is_created()
    }

    fn stage(self, expected: ExpectedVersion) -> Staged {
        Staged::Product(self, expected)
    }
}

impl StoredAggregate for ImportLot {
    const AGGREGATE_TYPE: &'static str = "inventory.lot";

    fn empty_for(id: ImportLotId) -> Self {
        ImportLot::empty(id)
    }

    fn aggregate_id(id: ImportLotId) -> AggregateId {
        id.0
    }

    fn exists(&self) -> bool {
        self.is_created()
    }

    fn stage(self, expected: ExpectedVersion) -> Staged {
        Staged::Lot(self, expected)
    }
}

impl StoredAggregate for MovementOrder {
    const AGGREGATE_TYPE: &'static str = "movements.order";

    fn empty_for(id: MovementOrderId) -> Self {
        MovementOrder::empty(id)
    }

    fn aggregate_id(id: MovementOrderId) -> AggregateId {
        id.0
    }

    fn exists(&self) -> bool {
        self.is_created()
    }

    fn stage(self, expected: ExpectedVersion) -> Staged {
        Staged::Order(self, expected)
    }
}

impl StoredAggregate for InventoryCheck {
    const AGGREGATE_TYPE: &'static str = "stocktake.check";

    fn empty_for(id: InventoryCheckId) -> Self {
        InventoryCheck::empty(id)
    }

    fn aggregate_id(id: InventoryCheckId) -> AggregateId {
        id.0
    }

    fn exists(&self) -> bool {
        self.is_created()
    }

    fn stage(self, expected: ExpectedVersion) -> Staged {
        Staged::Check(self, expected)
    }
}

/// One aggregate write inside a [`Changeset`].
#[derive(Debug, Clone)]
pub enum Staged {
    Product(Product, ExpectedVersion),
    Lot(ImportLot, ExpectedVersion),
    Order(MovementOrder, ExpectedVersion),
    Check(InventoryCheck, ExpectedVersion),
}

/// Everything one business operation writes.
///
/// A changeset is committed as a unit: every staged aggregate passes its
/// version check and is written, and its events are appended to the log, or
/// nothing is.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    staged: Vec<Staged>,
    events: Vec<EventEnvelope<JsonValue>>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<A: StoredAggregate>(&mut self, aggregate: A, expected: ExpectedVersion) {
        self.staged.push(aggregate.stage(expected));
    }

    pub fn record(&mut self, envelope: EventEnvelope<JsonValue>) {
        self.events.push(envelope);
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn staged(&self) -> &[Staged] {
        &self.staged
    }

    pub fn events(&self) -> &[EventEnvelope<JsonValue>] {
        &self.events
    }

    pub fn into_parts(self) -> (Vec<Staged>, Vec<EventEnvelope<JsonValue>>) {
        (self.staged, self.events)
    }
}

/// Store operation error.
///
/// Infrastructure failures (concurrency, uniqueness, poisoned state) as opposed
/// to domain errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error(
        "stale {aggregate_type} {aggregate_id}: expected {expected:?}, found {actual:?}"
    )]
    Concurrency {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
        expected: ExpectedVersion,
        actual: Option<u64>,
    },

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Per-aggregate repository capability set.
pub trait Repository<A: StoredAggregate>: Send + Sync {
    fn get(&self, id: &A::Id) -> Result<Option<A>, StoreError>;

    /// All stored aggregates accepted by `filter`, ordered by id (creation order).
    fn list_by(&self, filter: &dyn Fn(&A) -> bool) -> Result<Vec<A>, StoreError>;

    /// Save a single aggregate. Equivalent to committing a one-item changeset
    /// without events.
    fn save(&self, aggregate: A, expected: ExpectedVersion) -> Result<(), StoreError>;
}

/// Atomic multi-aggregate commit plus the append-only event log it feeds.
pub trait UnitOfWork: Send + Sync {
    fn commit(&self, changeset: Changeset) -> Result<(), StoreError>;

    /// Every committed event, in commit order.
    fn event_log(&self) -> Result<Vec<EventEnvelope<JsonValue>>, StoreError>;
}

/// Everything the services need from persistence.
pub trait Store:
    UnitOfWork
    + Repository<Product>
    + Repository<ImportLot>
    + Repository<MovementOrder>
    + Repository<InventoryCheck>
{
}

impl<S> Store for S where
    S: UnitOfWork
        + Repository<Product>
        + Repository<ImportLot>
        + Repository<MovementOrder>
        + Repository<InventoryCheck>
{
}

impl<A, S> Repository<A> for Arc<S>
where
    A: StoredAggregate,
    S: Repository<A> + ?Sized,
{
    fn get(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        (**self).get(id)
    }

    fn list_by(&self, filter: &dyn Fn(&A) -> bool) -> Result<Vec<A>, StoreError> {
        (**self).list_by(filter)
    }

    fn save(&self, aggregate: A, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(aggregate, expected)
    }
}

impl<S> UnitOfWork for Arc<S>
where
    S: UnitOfWork + ?Sized,
{
    fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        (**self).commit(changeset)
    }

    fn event_log(&self) -> Result<Vec<EventEnvelope<JsonValue>>, StoreError> {
        (**self).event_log()
    }
}
