//! Movement order service: the status workflow plus its lot and stock effects.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use stockyard_core::{DomainError, PartyId};
use stockyard_events::{EventBus, EventEnvelope};
use stockyard_inventory::{
    ImportLot, ImportLotId, LotCommand, ReceiveLot, ReserveFromLot, ReturnToLot,
};
use stockyard_movements::{
    ApproveOrder, CancelOrder, ConfirmOrder, CreateMovementOrder, Direction, MarkReturned,
    MovementKind, MovementLine, MovementOrder, MovementOrderCommand, MovementOrderId,
    MovementStatus, NewMovementLine, RejectOrder,
};
use stockyard_products::{AdjustStock, Product, ProductCommand, ProductStatus, StockMovementReason};

use super::{ServiceContext, WorkingSet};
use crate::codes::CodeKind;
use crate::error::{ServiceError, ServiceResult};
use crate::store::Store;

/// Input of [`MovementService::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMovementRequest {
    pub kind: MovementKind,
    pub counterparty_id: PartyId,
    pub note: Option<String>,
    pub lines: Vec<NewMovementLine>,
}

/// Filter of [`MovementService::list`]; `None` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub kind: Option<MovementKind>,
    pub status: Option<MovementStatus>,
}

impl MovementFilter {
    pub fn matches(&self, order: &MovementOrder) -> bool {
        self.kind.is_none_or(|k| k == order.kind())
            && self.status.is_none_or(|s| s == order.status())
    }
}

/// Drives movement orders through their lifecycle.
///
/// Confirming and returning an order touch the order, its lots and its
/// products; all of them are committed together or not at all.
pub struct MovementService<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> MovementService<S, B>
where
    S: Store,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }

    #[tracing::instrument(
        skip(self, input),
        fields(kind = input.kind.as_str(), lines = input.lines.len())
    )]
    pub fn create(&self, input: CreateMovementRequest) -> ServiceResult<MovementOrder> {
        let now = Utc::now();
        let order_id = MovementOrderId::generate();
        let code = self
            .ctx
            .codes()
            .next(CodeKind::Movement(input.kind), now.date_naive());

        let mut ws = self.ctx.begin();
        ws.execute::<MovementOrder>(
            order_id,
            &MovementOrderCommand::CreateMovementOrder(CreateMovementOrder {
                order_id,
                code,
                kind: input.kind,
                counterparty_id: input.counterparty_id,
                note: input.note,
                lines: input.lines.clone(),
                occurred_at: now,
            }),
        )?;

        for (line_index, line) in input.lines.iter().enumerate() {
            let product = ws.existing::<Product>(line.product_id)?;
            if product.status() == ProductStatus::Inactive {
                return Err(DomainError::validation(format!(
                    "line {line_index}: product {} is inactive",
                    product.code()
                ))
                .into());
            }

            if let Some(lot_id) = line.selected_lot_id {
                let lot = ws.existing::<ImportLot>(lot_id)?;
                if lot.product_id() != Some(line.product_id) {
                    return Err(DomainError::validation(format!(
                        "line {line_index}: lot {lot_id} does not hold product {}",
                        line.product_id
                    ))
                    .into());
                }
            }
        }

        let order = ws.existing::<MovementOrder>(order_id)?.clone();
        self.ctx.finish(ws)?;

        info!(
            order_id = %order_id,
            code = order.code(),
            total = %order.total_value(),
            "movement order created"
        );
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub fn approve(&self, order_id: MovementOrderId) -> ServiceResult<MovementOrder> {
        self.transition(
            order_id,
            MovementOrderCommand::ApproveOrder(ApproveOrder {
                order_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    #[tracing::instrument(skip(self))]
    pub fn cancel(&self, order_id: MovementOrderId) -> ServiceResult<MovementOrder> {
        self.transition(
            order_id,
            MovementOrderCommand::CancelOrder(CancelOrder {
                order_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    #[tracing::instrument(skip(self))]
    pub fn reject(
        &self,
        order_id: MovementOrderId,
        reason: Option<String>,
    ) -> ServiceResult<MovementOrder> {
        self.transition(
            order_id,
            MovementOrderCommand::RejectOrder(RejectOrder {
                order_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Fulfil the order.
    ///
    /// Inbound orders open one lot per line and raise product stock; outbound
    /// orders deplete each line's selected lot and lower product stock. Lines
    /// are processed in order and the first shortfall aborts the whole
    /// confirmation with [`DomainError::StockConflict`].
    #[tracing::instrument(skip(self))]
    pub fn confirm(&self, order_id: MovementOrderId) -> ServiceResult<MovementOrder> {
        let now = Utc::now();
        let mut ws = self.ctx.begin();
        let order = ws.existing::<MovementOrder>(order_id)?.clone();

        let received_lots = match order.direction() {
            Direction::Inbound => order.lines().iter().map(|_| ImportLotId::generate()).collect(),
            Direction::Outbound => Vec::new(),
        };
        ws.execute::<MovementOrder>(
            order_id,
            &MovementOrderCommand::ConfirmOrder(ConfirmOrder {
                order_id,
                received_lots,
                occurred_at: now,
            }),
        )?;
        let fulfilled = ws.existing::<MovementOrder>(order_id)?.clone();

        if let Err(e) = fulfil_lines(&mut ws, &fulfilled) {
            return Err(self.settle(&ws, &fulfilled, e));
        }
        self.commit(ws, &fulfilled)?;

        info!(status = fulfilled.status().as_str(), "movement order fulfilled");
        Ok(fulfilled)
    }

    /// Reverse a fulfilled order.
    ///
    /// Exported goods go back into the lots they were issued from. Imported
    /// goods go back to the supplier, so the lots the order opened are drawn
    /// down again; if that stock has already been issued the return fails with
    /// [`DomainError::StockConflict`].
    #[tracing::instrument(skip(self))]
    pub fn mark_returned(&self, order_id: MovementOrderId) -> ServiceResult<MovementOrder> {
        let mut ws = self.ctx.begin();
        ws.execute::<MovementOrder>(
            order_id,
            &MovementOrderCommand::MarkReturned(MarkReturned {
                order_id,
                occurred_at: Utc::now(),
            }),
        )?;
        let order = ws.existing::<MovementOrder>(order_id)?.clone();

        if let Err(e) = reverse_lines(&mut ws, &order) {
            return Err(self.settle(&ws, &order, e));
        }
        self.commit(ws, &order)?;

        info!("movement order returned");
        Ok(order)
    }

    pub fn get(&self, order_id: MovementOrderId) -> ServiceResult<MovementOrder> {
        self.ctx.fetch::<MovementOrder>(order_id)
    }

    pub fn list(&self, filter: MovementFilter) -> ServiceResult<Vec<MovementOrder>> {
        self.ctx
            .fetch_all::<MovementOrder>(&|o: &MovementOrder| filter.matches(o))
    }

    fn transition(
        &self,
        order_id: MovementOrderId,
        command: MovementOrderCommand,
    ) -> ServiceResult<MovementOrder> {
        let mut ws = self.ctx.begin();
        ws.execute::<MovementOrder>(order_id, &command)?;
        let order = ws.existing::<MovementOrder>(order_id)?.clone();
        self.ctx.finish(ws)?;

        info!(status = order.status().as_str(), "movement order status changed");
        Ok(order)
    }

    fn commit(&self, ws: WorkingSet<'_, S>, order: &MovementOrder) -> ServiceResult<()> {
        match self.ctx.finish(ws) {
            Err(ServiceError::Concurrency(msg)) => {
                warn!(%msg, "order effects lost a concurrent update");
                Err(self.lost_race(order, msg))
            }
            other => other,
        }
    }

    /// A line failure computed from aggregates another writer has since
    /// changed is reported against the current lots instead.
    fn settle(
        &self,
        ws: &WorkingSet<'_, S>,
        order: &MovementOrder,
        err: ServiceError,
    ) -> ServiceError {
        match ws.is_stale() {
            Ok(true) => {
                warn!(error = %err, "order effects computed from a stale snapshot");
                self.lost_race(order, err.to_string())
            }
            Ok(false) => err,
            Err(store_err) => store_err,
        }
    }

    /// Report the first line the current lots can no longer cover, or a plain
    /// concurrency failure when they all still fit and a retry may succeed.
    fn lost_race(&self, order: &MovementOrder, msg: String) -> ServiceError {
        self.explain_conflict(order)
            .unwrap_or(ServiceError::Concurrency(msg))
    }

    fn explain_conflict(&self, order: &MovementOrder) -> Option<ServiceError> {
        if !draws_from_lots(order) {
            return None;
        }

        let mut pending = std::collections::HashMap::<ImportLotId, i64>::new();
        for (line_index, line) in order.lines().iter().enumerate() {
            let lot_id = line.lot_id?;
            let lot = self.ctx.fetch::<ImportLot>(lot_id).ok()?;
            let taken = pending.entry(lot_id).or_insert(0);
            let available = lot.remaining_quantity() - *taken;
            if line.quantity > available {
                return Some(
                    DomainError::StockConflict {
                        order_id: order.id_typed().0,
                        line_index,
                        lot_id: lot_id.0,
                        requested: line.quantity,
                        available,
                    }
                    .into(),
                );
            }
            *taken += line.quantity;
        }
        None
    }
}

/// Outbound confirmations and inbound returns take their quantities out of lots.
fn draws_from_lots(order: &MovementOrder) -> bool {
    match order.status() {
        MovementStatus::Returned => order.direction() == Direction::Inbound,
        _ => order.direction() == Direction::Outbound,
    }
}

fn fulfil_lines<S: Store>(ws: &mut WorkingSet<'_, S>, order: &MovementOrder) -> ServiceResult<()> {
    let now = Utc::now();
    for (line_index, line) in order.lines().iter().enumerate() {
        let lot_id = line_lot(order, line)?;
        match order.direction() {
            Direction::Inbound => {
                ws.execute::<ImportLot>(
                    lot_id,
                    &LotCommand::ReceiveLot(ReceiveLot {
                        lot_id,
                        product_id: line.product_id,
                        import_code: order.code().to_string(),
                        imports_date: now,
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                        source_order: Some(order.id_typed().0),
                        occurred_at: now,
                    }),
                )?;
                adjust(ws, order, line, line.quantity, StockMovementReason::Receipt)?;
            }
            Direction::Outbound => {
                reserve(ws, order, line_index, line, lot_id)?;
                adjust(ws, order, line, -line.quantity, StockMovementReason::Issue)?;
            }
        }
    }
    Ok(())
}

fn reverse_lines<S: Store>(ws: &mut WorkingSet<'_, S>, order: &MovementOrder) -> ServiceResult<()> {
    for (line_index, line) in order.lines().iter().enumerate() {
        let lot_id = line_lot(order, line)?;
        match order.direction() {
            Direction::Outbound => {
                ws.execute::<ImportLot>(
                    lot_id,
                    &LotCommand::ReturnToLot(ReturnToLot {
                        lot_id,
                        quantity: line.quantity,
                        reference: Some(order.id_typed().0),
                        occurred_at: Utc::now(),
                    }),
                )?;
                adjust(ws, order, line, line.quantity, StockMovementReason::Return)?;
            }
            Direction::Inbound => {
                reserve(ws, order, line_index, line, lot_id)?;
                adjust(ws, order, line, -line.quantity, StockMovementReason::Return)?;
            }
        }
    }
    Ok(())
}

fn line_lot(order: &MovementOrder, line: &MovementLine) -> ServiceResult<ImportLotId> {
    line.lot_id.ok_or_else(|| {
        DomainError::invariant(format!(
            "order {} line {} has no lot",
            order.code(),
            line.line_no
        ))
        .into()
    })
}

/// Reserve a line's quantity from its lot, reporting a shortfall as a
/// [`DomainError::StockConflict`] on that line.
fn reserve<S: Store>(
    ws: &mut WorkingSet<'_, S>,
    order: &MovementOrder,
    line_index: usize,
    line: &MovementLine,
    lot_id: ImportLotId,
) -> ServiceResult<()> {
    let command = LotCommand::ReserveFromLot(ReserveFromLot {
        lot_id,
        quantity: line.quantity,
        reference: Some(order.id_typed().0),
        occurred_at: Utc::now(),
    });

    match ws.execute::<ImportLot>(lot_id, &command) {
        Ok(_) => Ok(()),
        Err(ServiceError::Domain(DomainError::InsufficientLotQuantity {
            lot_id,
            requested,
            available,
        })) => {
            warn!(line_index, %lot_id, requested, available, "lot cannot cover order line");
            Err(DomainError::StockConflict {
                order_id: order.id_typed().0,
                line_index,
                lot_id,
                requested,
                available,
            }
            .into())
        }
        Err(e) => Err(e),
    }
}

fn adjust<S: Store>(
    ws: &mut WorkingSet<'_, S>,
    order: &MovementOrder,
    line: &MovementLine,
    delta: i64,
    reason: StockMovementReason,
) -> ServiceResult<()> {
    ws.execute::<Product>(
        line.product_id,
        &ProductCommand::AdjustStock(AdjustStock {
            product_id: line.product_id,
            delta,
            reason,
            reference: order.id_typed().0,
            occurred_at: Utc::now(),
        }),
    )?;
    Ok(())
}
