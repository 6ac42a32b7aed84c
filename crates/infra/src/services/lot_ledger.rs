//! Lot ledger: receipt, depletion and correction of import lots.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use stockyard_core::{AggregateId, Money};
use stockyard_events::{EventBus, EventEnvelope};
use stockyard_inventory::{
    ImportLot, ImportLotId, LotCommand, ReceiveLot, ReserveFromLot, ReturnToLot,
    available_in_fifo_order,
};
use stockyard_products::{Product, ProductId};

use super::ServiceContext;
use crate::error::ServiceResult;
use crate::store::Store;

/// Input of [`LotLedger::receive_lot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveLotRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub import_code: String,
    pub imports_date: DateTime<Utc>,
}

/// Lot-level stock operations.
///
/// These primitives touch lots only. Product on-hand quantity is moved by the
/// movement service, which drives the same lot commands inside its own unit of
/// work.
pub struct LotLedger<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> LotLedger<S, B>
where
    S: Store,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }

    /// Lots of `product_id` with stock left, oldest first.
    ///
    /// This is the candidate list shown to the operator; nothing is allocated
    /// automatically.
    pub fn list_available_lots(&self, product_id: ProductId) -> ServiceResult<Vec<ImportLot>> {
        let lots = self.list_lots(product_id)?;
        Ok(available_in_fifo_order(lots))
    }

    /// Every lot of `product_id`, depleted ones included, in creation order.
    pub fn list_lots(&self, product_id: ProductId) -> ServiceResult<Vec<ImportLot>> {
        self.ctx
            .fetch_all::<ImportLot>(&|l: &ImportLot| l.product_id() == Some(product_id))
    }

    pub fn get_lot(&self, lot_id: ImportLotId) -> ServiceResult<ImportLot> {
        self.ctx.fetch::<ImportLot>(lot_id)
    }

    #[tracing::instrument(
        skip(self),
        fields(product_id = %input.product_id, quantity = input.quantity)
    )]
    pub fn receive_lot(&self, input: ReceiveLotRequest) -> ServiceResult<ImportLot> {
        let lot_id = ImportLotId::generate();
        let mut ws = self.ctx.begin();
        ws.existing::<Product>(input.product_id)?;
        ws.execute::<ImportLot>(
            lot_id,
            &LotCommand::ReceiveLot(ReceiveLot {
                lot_id,
                product_id: input.product_id,
                import_code: input.import_code,
                imports_date: input.imports_date,
                quantity: input.quantity,
                unit_price: input.unit_price,
                source_order: None,
                occurred_at: Utc::now(),
            }),
        )?;
        let lot = ws.existing::<ImportLot>(lot_id)?.clone();
        self.ctx.finish(ws)?;

        info!(lot_id = %lot_id, "lot received");
        Ok(lot)
    }

    /// Take `quantity` out of a lot (compare-and-set against the loaded version).
    #[tracing::instrument(skip(self))]
    pub fn reserve_from_lot(
        &self,
        lot_id: ImportLotId,
        quantity: i64,
        reference: Option<AggregateId>,
    ) -> ServiceResult<ImportLot> {
        let command = LotCommand::ReserveFromLot(ReserveFromLot {
            lot_id,
            quantity,
            reference,
            occurred_at: Utc::now(),
        });
        let lot = self.run(lot_id, &command).inspect_err(|e| {
            warn!(error = %e, "lot reservation rejected");
        })?;

        info!(remaining = lot.remaining_quantity(), "lot reserved");
        Ok(lot)
    }

    /// Put `quantity` back into a lot; never above the received quantity.
    #[tracing::instrument(skip(self))]
    pub fn return_to_lot(
        &self,
        lot_id: ImportLotId,
        quantity: i64,
        reference: Option<AggregateId>,
    ) -> ServiceResult<ImportLot> {
        let command = LotCommand::ReturnToLot(ReturnToLot {
            lot_id,
            quantity,
            reference,
            occurred_at: Utc::now(),
        });
        let lot = self.run(lot_id, &command).inspect_err(|e| {
            warn!(error = %e, "lot return rejected");
        })?;

        info!(remaining = lot.remaining_quantity(), "lot returned");
        Ok(lot)
    }

    fn run(&self, lot_id: ImportLotId, command: &LotCommand) -> ServiceResult<ImportLot> {
        let mut ws = self.ctx.begin();
        ws.existing::<ImportLot>(lot_id)?;
        ws.execute::<ImportLot>(lot_id, command)?;
        let lot = ws.existing::<ImportLot>(lot_id)?.clone();
        self.ctx.finish(ws)?;
        Ok(lot)
    }
}
