//! Inventory check reconciliation.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use stockyard_core::{DomainError, WarehouseId};
use stockyard_events::{EventBus, EventEnvelope};
use stockyard_inventory::{
    ImportLot, ImportLotId, LotCommand, ReceiveLot, ReserveFromLot, available_in_fifo_order,
};
use stockyard_products::{AdjustStock, Product, ProductCommand, ProductId, StockMovementReason};
use stockyard_stocktake::{
    ApproveCheck, CheckAdjustment, CreateCheck, InventoryCheck, InventoryCheckCommand,
    InventoryCheckEvent, InventoryCheckId, RecordActual, RejectCheck, SystemSnapshot,
};

use super::{ServiceContext, WorkingSet};
use crate::codes::CodeKind;
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

/// Input of [`InventoryCheckReconciler::create_check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckRequest {
    pub warehouse_id: WarehouseId,
    pub reason: String,
    pub product_ids: Vec<ProductId>,
}

/// Physical counts reconciled against catalog quantities.
pub struct InventoryCheckReconciler<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> InventoryCheckReconciler<S, B>
where
    S: Store,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }

    /// Open a check, snapshotting the current quantity of every listed product.
    #[tracing::instrument(skip(self, input), fields(products = input.product_ids.len()))]
    pub fn create_check(&self, input: CreateCheckRequest) -> ServiceResult<InventoryCheck> {
        let now = Utc::now();
        let check_id = InventoryCheckId::generate();
        let code = self.ctx.codes().next(CodeKind::InventoryCheck, now.date_naive());

        let mut ws = self.ctx.begin();
        let mut snapshot = Vec::with_capacity(input.product_ids.len());
        for product_id in &input.product_ids {
            let product = ws.existing::<Product>(*product_id)?;
            snapshot.push(SystemSnapshot {
                product_id: *product_id,
                system_qty: product.quantity(),
            });
        }

        ws.execute::<InventoryCheck>(
            check_id,
            &InventoryCheckCommand::CreateCheck(CreateCheck {
                check_id,
                code,
                reason: input.reason,
                warehouse_id: input.warehouse_id,
                snapshot,
                occurred_at: now,
            }),
        )?;
        let check = ws.existing::<InventoryCheck>(check_id)?.clone();
        self.ctx.finish(ws)?;

        info!(check_id = %check_id, code = check.code(), "inventory check opened");
        Ok(check)
    }

    #[tracing::instrument(skip(self))]
    pub fn record_actual(
        &self,
        check_id: InventoryCheckId,
        product_id: ProductId,
        actual_qty: i64,
        note: Option<String>,
    ) -> ServiceResult<InventoryCheck> {
        self.run(
            check_id,
            InventoryCheckCommand::RecordActual(RecordActual {
                check_id,
                product_id,
                actual_qty,
                note,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Approve a fully counted check and apply every difference to product stock.
    ///
    /// Lots follow the count too: a shortfall is drawn from the product's lots
    /// oldest first and a surplus opens a correction lot, so on-hand stock keeps
    /// matching the sum of remaining lot quantities.
    #[tracing::instrument(skip(self))]
    pub fn approve(&self, check_id: InventoryCheckId) -> ServiceResult<InventoryCheck> {
        let now = Utc::now();
        let mut ws = self.ctx.begin();
        let events = ws.execute::<InventoryCheck>(
            check_id,
            &InventoryCheckCommand::ApproveCheck(ApproveCheck {
                check_id,
                occurred_at: now,
            }),
        )?;
        let check = ws.existing::<InventoryCheck>(check_id)?.clone();

        let mut adjusted = 0usize;
        for event in &events {
            let InventoryCheckEvent::CheckApproved(approved) = event else {
                continue;
            };
            for adjustment in &approved.adjustments {
                match self.reconcile(&mut ws, &check, adjustment) {
                    Ok(applied) => adjusted += applied,
                    Err(e) if ws.is_stale()? => {
                        warn!(error = %e, "check approval computed from a stale snapshot");
                        return Err(ServiceError::Concurrency(e.to_string()));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        self.ctx.finish(ws)?;

        info!(adjusted, "inventory check approved");
        Ok(check)
    }

    /// Apply one counted difference to the product and its lots; returns the
    /// number of stock adjustments recorded.
    fn reconcile(
        &self,
        ws: &mut WorkingSet<'_, S>,
        check: &InventoryCheck,
        adjustment: &CheckAdjustment,
    ) -> ServiceResult<usize> {
        let now = Utc::now();
        let product_id = adjustment.product_id;
        let reference = check.id_typed().0;

        if adjustment.difference < 0 {
            let lots = self
                .ctx
                .fetch_all::<ImportLot>(&|l: &ImportLot| l.product_id() == Some(product_id))?;
            let mut shortfall = -adjustment.difference;
            for lot in available_in_fifo_order(lots) {
                if shortfall == 0 {
                    break;
                }
                let lot_id = lot.id_typed();
                let taken = ws.existing::<ImportLot>(lot_id)?.remaining_quantity().min(shortfall);
                if taken == 0 {
                    continue;
                }
                ws.execute::<ImportLot>(
                    lot_id,
                    &LotCommand::ReserveFromLot(ReserveFromLot {
                        lot_id,
                        quantity: taken,
                        reference: Some(reference),
                        occurred_at: now,
                    }),
                )?;
                shortfall -= taken;
            }
            if shortfall > 0 {
                return Err(DomainError::invariant(format!(
                    "check {}: lots of product {product_id} are {shortfall} short of the count",
                    check.code()
                ))
                .into());
            }
        } else if adjustment.difference > 0 {
            let unit_price = ws.existing::<Product>(product_id)?.unit_price();
            let lot_id = ImportLotId::generate();
            ws.execute::<ImportLot>(
                lot_id,
                &LotCommand::ReceiveLot(ReceiveLot {
                    lot_id,
                    product_id,
                    import_code: check.code().to_string(),
                    imports_date: now,
                    quantity: adjustment.difference,
                    unit_price,
                    source_order: Some(reference),
                    occurred_at: now,
                }),
            )?;
        }

        let applied = ws.execute::<Product>(
            product_id,
            &ProductCommand::AdjustStock(AdjustStock {
                product_id,
                delta: adjustment.difference,
                reason: StockMovementReason::Count,
                reference,
                occurred_at: now,
            }),
        )?;
        Ok(applied.len())
    }

    #[tracing::instrument(skip(self))]
    pub fn reject(
        &self,
        check_id: InventoryCheckId,
        reason: Option<String>,
    ) -> ServiceResult<InventoryCheck> {
        self.run(
            check_id,
            InventoryCheckCommand::RejectCheck(RejectCheck {
                check_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn get(&self, check_id: InventoryCheckId) -> ServiceResult<InventoryCheck> {
        self.ctx.fetch::<InventoryCheck>(check_id)
    }

    pub fn list(&self) -> ServiceResult<Vec<InventoryCheck>> {
        self.ctx.fetch_all::<InventoryCheck>(&|_: &InventoryCheck| true)
    }

    fn run(
        &self,
        check_id: InventoryCheckId,
        command: InventoryCheckCommand,
    ) -> ServiceResult<InventoryCheck> {
        let mut ws = self.ctx.begin();
        ws.execute::<InventoryCheck>(check_id, &command)?;
        let check = ws.existing::<InventoryCheck>(check_id)?.clone();
        self.ctx.finish(ws)?;

        info!(status = check.status().as_str(), "inventory check updated");
        Ok(check)
    }
}
