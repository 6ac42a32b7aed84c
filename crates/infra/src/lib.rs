//! Infrastructure layer: persistence, services, configuration, projections.

pub mod codes;
pub mod config;
pub mod error;
pub mod projections;
pub mod services;
pub mod store;


use std::sync::Arc;

use serde_json::Value as JsonValue;

use stockyard_events::{EventBus, EventEnvelope, InMemoryEventBus};

pub use codes::{CodeGenerator, CodeKind};
pub use config::{AppConfig, CodePrefixes, ConfigError};
pub use error::{ServiceError, ServiceResult};
pub use services::{
    Catalog, CreateCheckRequest, CreateMovementRequest, InventoryCheckReconciler, LotLedger,
    MovementFilter, MovementService, ReceiveLotRequest, RegisterProduct, ServiceContext,
};
pub use store::{InMemoryStore, Store, StoreError};

/// The JSON envelope bus every service publishes to.
pub type EnvelopeBus = InMemoryEventBus<EventEnvelope<JsonValue>>;

/// All services over one shared store, bus and code generator.
pub struct Stockyard<S, B> {
    pub catalog: Catalog<S, B>,
    pub lots: LotLedger<S, B>,
    pub movements: MovementService<S, B>,
    pub checks: InventoryCheckReconciler<S, B>,
    ctx: ServiceContext<S, B>,
}

impl<S, B> Stockyard<S, B>
where
    S: Store,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self {
            catalog: Catalog::new(ctx.clone()),
            lots: LotLedger::new(ctx.clone()),
            movements: MovementService::new(ctx.clone()),
            checks: InventoryCheckReconciler::new(ctx.clone()),
            ctx,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        self.ctx.store()
    }

    pub fn bus(&self) -> &Arc<B> {
        self.ctx.bus()
    }
}

impl Stockyard<InMemoryStore, EnvelopeBus> {
    /// Fresh in-memory instance (tests, dev, single-process server).
    pub fn in_memory(prefixes: CodePrefixes) -> Self {
        Self::new(ServiceContext::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryEventBus::new()),
            Arc::new(CodeGenerator::new(prefixes)),
        ))
    }
}
