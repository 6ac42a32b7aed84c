use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockyard_core::{Aggregate, AggregateRoot, DomainError, Money, PartyId, aggregate_id};
use stockyard_events::Event;
use stockyard_inventory::ImportLotId;
use stockyard_products::ProductId;

use crate::status::{Direction, MovementAction, MovementKind, MovementStatus};

aggregate_id!(
    /// Movement order identifier.
    MovementOrderId
);

/// A line as submitted by the user when creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovementLine {
    pub product_id: ProductId,
    /// Lot picked by the operator. Required for outbound orders, absent for inbound.
    pub selected_lot_id: Option<ImportLotId>,
    pub unit_price: Money,
    pub quantity: i64,
}

/// Movement order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLine {
    /// 1-based position in insertion order.
    pub line_no: u32,
    pub product_id: ProductId,
    /// Outbound: the selected lot. Inbound: the lot opened at fulfilment.
    pub lot_id: Option<ImportLotId>,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

/// Aggregate root: MovementOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementOrder {
    id: MovementOrderId,
    code: String,
    kind: MovementKind,
    counterparty_id: Option<PartyId>,
    status: MovementStatus,
    note: Option<String>,
    lines: Vec<MovementLine>,
    total_value: Money,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    version: u64,
    created: bool,
}

impl MovementOrder {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: MovementOrderId) -> Self {
        Self {
            id,
            code: String::new(),
            kind: MovementKind::SupplierImport,
            counterparty_id: None,
            status: MovementStatus::Pending,
            note: None,
            lines: Vec::new(),
            total_value: Money::ZERO,
            created_at: None,
            updated_at: None,
            rejection_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> MovementOrderId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }

    pub fn counterparty_id(&self) -> Option<PartyId> {
        self.counterparty_id
    }

    pub fn status(&self) -> MovementStatus {
        self.status
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[MovementLine] {
        &self.lines
    }

    pub fn total_value(&self) -> Money {
        self.total_value
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for MovementOrder {
    type Id = MovementOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateMovementOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMovementOrder {
    pub order_id: MovementOrderId,
    pub code: String,
    pub kind: MovementKind,
    pub counterparty_id: PartyId,
    pub note: Option<String>,
    pub lines: Vec<NewMovementLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveOrder {
    pub order_id: MovementOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmOrder.
///
/// For inbound orders `received_lots` holds one fresh lot id per line (in line
/// order); for outbound orders it must be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub order_id: MovementOrderId,
    pub received_lots: Vec<ImportLotId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: MovementOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectOrder {
    pub order_id: MovementOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReturned {
    pub order_id: MovementOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementOrderCommand {
    CreateMovementOrder(CreateMovementOrder),
    ApproveOrder(ApproveOrder),
    ConfirmOrder(ConfirmOrder),
    CancelOrder(CancelOrder),
    RejectOrder(RejectOrder),
    MarkReturned(MarkReturned),
}

/// Event: MovementOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOrderCreated {
    pub order_id: MovementOrderId,
    pub code: String,
    pub kind: MovementKind,
    pub counterparty_id: PartyId,
    pub note: Option<String>,
    pub lines: Vec<MovementLine>,
    pub total_value: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementOrderApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOrderApproved {
    pub order_id: MovementOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementOrderFulfilled.
///
/// Carries the final lines (inbound lines now reference their new lots) so a
/// consumer can reconstruct every stock effect of the confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOrderFulfilled {
    pub order_id: MovementOrderId,
    pub kind: MovementKind,
    pub status: MovementStatus,
    pub lines: Vec<MovementLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementOrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOrderCancelled {
    pub order_id: MovementOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementOrderRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOrderRejected {
    pub order_id: MovementOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementOrderReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOrderReturned {
    pub order_id: MovementOrderId,
    pub kind: MovementKind,
    pub lines: Vec<MovementLine>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementOrderEvent {
    MovementOrderCreated(MovementOrderCreated),
    MovementOrderApproved(MovementOrderApproved),
    MovementOrderFulfilled(MovementOrderFulfilled),
    MovementOrderCancelled(MovementOrderCancelled),
    MovementOrderRejected(MovementOrderRejected),
    MovementOrderReturned(MovementOrderReturned),
}

impl Event for MovementOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MovementOrderEvent::MovementOrderCreated(_) => "movements.order.created",
            MovementOrderEvent::MovementOrderApproved(_) => "movements.order.approved",
            MovementOrderEvent::MovementOrderFulfilled(_) => "movements.order.fulfilled",
            MovementOrderEvent::MovementOrderCancelled(_) => "movements.order.cancelled",
            MovementOrderEvent::MovementOrderRejected(_) => "movements.order.rejected",
            MovementOrderEvent::MovementOrderReturned(_) => "movements.order.returned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MovementOrderEvent::MovementOrderCreated(e) => e.occurred_at,
            MovementOrderEvent::MovementOrderApproved(e) => e.occurred_at,
            MovementOrderEvent::MovementOrderFulfilled(e) => e.occurred_at,
            MovementOrderEvent::MovementOrderCancelled(e) => e.occurred_at,
            MovementOrderEvent::MovementOrderRejected(e) => e.occurred_at,
            MovementOrderEvent::MovementOrderReturned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for MovementOrder {
    type Command = MovementOrderCommand;
    type Event = MovementOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MovementOrderEvent::MovementOrderCreated(e) => {
                self.id = e.order_id;
                self.code = e.code.clone();
                self.kind = e.kind;
                self.counterparty_id = Some(e.counterparty_id);
                self.status = MovementStatus::Pending;
                self.note = e.note.clone();
                self.lines = e.lines.clone();
                self.total_value = e.total_value;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            MovementOrderEvent::MovementOrderApproved(e) => {
                self.status = MovementStatus::Approved;
                self.updated_at = Some(e.occurred_at);
            }
            MovementOrderEvent::MovementOrderFulfilled(e) => {
                self.status = e.status;
                self.lines = e.lines.clone();
                self.updated_at = Some(e.occurred_at);
            }
            MovementOrderEvent::MovementOrderCancelled(e) => {
                self.status = MovementStatus::Cancelled;
                self.updated_at = Some(e.occurred_at);
            }
            MovementOrderEvent::MovementOrderRejected(e) => {
                self.status = MovementStatus::Rejected;
                self.rejection_reason = e.reason.clone();
                self.updated_at = Some(e.occurred_at);
            }
            MovementOrderEvent::MovementOrderReturned(e) => {
                self.status = MovementStatus::Returned;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MovementOrderCommand::CreateMovementOrder(cmd) => self.handle_create(cmd),
            MovementOrderCommand::ApproveOrder(cmd) => self.handle_approve(cmd),
            MovementOrderCommand::ConfirmOrder(cmd) => self.handle_confirm(cmd),
            MovementOrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
            MovementOrderCommand::RejectOrder(cmd) => self.handle_reject(cmd),
            MovementOrderCommand::MarkReturned(cmd) => self.handle_mark_returned(cmd),
        }
    }
}

impl MovementOrder {
    fn ensure_order_id(&self, order_id: MovementOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("movement order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_allowed(&self, action: MovementAction) -> Result<(), DomainError> {
        if self.status.allows(action) {
            return Ok(());
        }
        Err(DomainError::InvalidTransition {
            entity: "movement order",
            id: self.id.0,
            from: self.status.as_str(),
            action: action.as_str(),
        })
    }

    fn handle_create(
        &self,
        cmd: &CreateMovementOrder,
    ) -> Result<Vec<MovementOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("movement order already exists"));
        }
        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("order code cannot be empty"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let direction = cmd.kind.direction();
        let mut lines = Vec::with_capacity(cmd.lines.len());
        for (line_index, line) in cmd.lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::InvalidQuantity {
                    line_index,
                    quantity: line.quantity,
                });
            }
            match (direction, line.selected_lot_id) {
                (Direction::Outbound, None) => {
                    return Err(DomainError::validation(format!(
                        "line {line_index}: outbound lines must name the lot to issue from"
                    )));
                }
                (Direction::Inbound, Some(_)) => {
                    return Err(DomainError::validation(format!(
                        "line {line_index}: inbound lines open a new lot and cannot select one"
                    )));
                }
                _ => {}
            }

            lines.push(MovementLine {
                line_no: (line_index as u32) + 1,
                product_id: line.product_id,
                lot_id: line.selected_lot_id,
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.unit_price.times(line.quantity)?,
            });
        }
        let total_value = Money::sum(lines.iter().map(|l| l.line_total))?;

        Ok(vec![MovementOrderEvent::MovementOrderCreated(
            MovementOrderCreated {
                order_id: cmd.order_id,
                code: cmd.code.clone(),
                kind: cmd.kind,
                counterparty_id: cmd.counterparty_id,
                note: cmd.note.clone(),
                lines,
                total_value,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_approve(&self, cmd: &ApproveOrder) -> Result<Vec<MovementOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_allowed(MovementAction::Approve)?;

        Ok(vec![MovementOrderEvent::MovementOrderApproved(
            MovementOrderApproved {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_confirm(&self, cmd: &ConfirmOrder) -> Result<Vec<MovementOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_allowed(MovementAction::Confirm)?;

        let mut lines = self.lines.clone();
        match self.direction() {
            Direction::Inbound => {
                if cmd.received_lots.len() != lines.len() {
                    return Err(DomainError::invariant(format!(
                        "inbound confirmation needs {} lot ids, got {}",
                        lines.len(),
                        cmd.received_lots.len()
                    )));
                }
                for (line, lot_id) in lines.iter_mut().zip(&cmd.received_lots) {
                    line.lot_id = Some(*lot_id);
                }
            }
            Direction::Outbound => {
                if !cmd.received_lots.is_empty() {
                    return Err(DomainError::invariant(
                        "outbound confirmation cannot open lots",
                    ));
                }
            }
        }

        Ok(vec![MovementOrderEvent::MovementOrderFulfilled(
            MovementOrderFulfilled {
                order_id: cmd.order_id,
                kind: self.kind,
                status: self.kind.fulfilled_status(),
                lines,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<MovementOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_allowed(MovementAction::Cancel)?;

        Ok(vec![MovementOrderEvent::MovementOrderCancelled(
            MovementOrderCancelled {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_reject(&self, cmd: &RejectOrder) -> Result<Vec<MovementOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_allowed(MovementAction::Reject)?;

        Ok(vec![MovementOrderEvent::MovementOrderRejected(
            MovementOrderRejected {
                order_id: cmd.order_id,
                reason: cmd.reason.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_mark_returned(
        &self,
        cmd: &MarkReturned,
    ) -> Result<Vec<MovementOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_allowed(MovementAction::MarkReturned)?;

        if self.lines.iter().any(|l| l.lot_id.is_none()) {
            return Err(DomainError::invariant("fulfilled order line without a lot"));
        }

        Ok(vec![MovementOrderEvent::MovementOrderReturned(
            MovementOrderReturned {
                order_id: cmd.order_id,
                kind: self.kind,
                lines: self.lines.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn line(quantity: i64, price: i64, lot: Option<ImportLotId>) -> NewMovementLine {
        NewMovementLine {
            product_id: ProductId::generate(),
            selected_lot_id: lot,
            unit_price: Money::new(price).unwrap(),
            quantity,
        }
    }

    fn create(
        kind: MovementKind,
        lines: Vec<NewMovementLine>,
    ) -> (MovementOrder, Result<Vec<MovementOrderEvent>, DomainError>) {
        let order_id = MovementOrderId::generate();
        let mut order = MovementOrder::empty(order_id);
        let result = order.execute(&MovementOrderCommand::CreateMovementOrder(CreateMovementOrder {
            order_id,
            code: "PN-20240301-0001".to_string(),
            kind,
            counterparty_id: PartyId::new(),
            note: None,
            lines,
            occurred_at: test_time(),
        }));
        (order, result)
    }

    fn pending(kind: MovementKind) -> MovementOrder {
        let lot = match kind.direction() {
            Direction::Outbound => Some(ImportLotId::generate()),
            Direction::Inbound => None,
        };
        let (order, result) = create(kind, vec![line(20, 1_000, lot)]);
        result.unwrap();
        order
    }

    fn approve(order: &MovementOrder) -> MovementOrderCommand {
        MovementOrderCommand::ApproveOrder(ApproveOrder {
            order_id: order.id_typed(),
            occurred_at: test_time(),
        })
    }

    fn confirm(order: &MovementOrder) -> MovementOrderCommand {
        let received_lots = match order.direction() {
            Direction::Inbound => order.lines().iter().map(|_| ImportLotId::generate()).collect(),
            Direction::Outbound => vec![],
        };
        MovementOrderCommand::ConfirmOrder(ConfirmOrder {
            order_id: order.id_typed(),
            received_lots,
            occurred_at: test_time(),
        })
    }

    fn cancel(order: &MovementOrder) -> MovementOrderCommand {
        MovementOrderCommand::CancelOrder(CancelOrder {
            order_id: order.id_typed(),
            occurred_at: test_time(),
        })
    }

    fn reject(order: &MovementOrder) -> MovementOrderCommand {
        MovementOrderCommand::RejectOrder(RejectOrder {
            order_id: order.id_typed(),
            reason: Some("wrong supplier".to_string()),
            occurred_at: test_time(),
        })
    }

    fn returned(order: &MovementOrder) -> MovementOrderCommand {
        MovementOrderCommand::MarkReturned(MarkReturned {
            order_id: order.id_typed(),
            occurred_at: test_time(),
        })
    }

    fn command_for(order: &MovementOrder, action: MovementAction) -> MovementOrderCommand {
        match action {
            MovementAction::Approve => approve(order),
            MovementAction::Confirm => confirm(order),
            MovementAction::Cancel => cancel(order),
            MovementAction::Reject => reject(order),
            MovementAction::MarkReturned => returned(order),
        }
    }

    #[test]
    fn create_computes_line_and_order_totals() {
        let (order, result) = create(
            MovementKind::SupplierImport,
            vec![line(20, 1_000, None), line(3, 250, None)],
        );
        result.unwrap();

        assert_eq!(order.status(), MovementStatus::Pending);
        assert_eq!(order.lines()[0].line_total.minor_units(), 20_000);
        assert_eq!(order.lines()[1].line_no, 2);
        assert_eq!(order.total_value().minor_units(), 20_750);
    }

    #[test]
    fn create_rejects_empty_order() {
        let (order, result) = create(MovementKind::SupplierImport, vec![]);
        assert_eq!(result.unwrap_err(), DomainError::EmptyOrder);
        assert!(!order.is_created());
    }

    #[test]
    fn create_reports_index_of_bad_quantity() {
        let (_, result) = create(
            MovementKind::SupplierImport,
            vec![line(1, 10, None), line(0, 10, None)],
        );
        assert_eq!(
            result.unwrap_err(),
            DomainError::InvalidQuantity {
                line_index: 1,
                quantity: 0
            }
        );
    }

    #[test]
    fn outbound_lines_require_a_selected_lot() {
        let (_, result) = create(MovementKind::InternalExport, vec![line(5, 10, None)]);
        assert!(matches!(result.unwrap_err(), DomainError::Validation(msg) if msg.contains("lot")));
    }

    #[test]
    fn inbound_lines_cannot_select_a_lot() {
        let (_, result) = create(
            MovementKind::SupplierImport,
            vec![line(5, 10, Some(ImportLotId::generate()))],
        );
        assert!(matches!(result.unwrap_err(), DomainError::Validation(_)));
    }

    #[test]
    fn import_order_is_approved_then_confirmed() {
        let mut order = pending(MovementKind::ImportOrder);
        order.execute(&approve(&order)).unwrap();
        assert_eq!(order.status(), MovementStatus::Approved);

        order.execute(&confirm(&order)).unwrap();
        assert_eq!(order.status(), MovementStatus::Imported);
        assert!(order.lines().iter().all(|l| l.lot_id.is_some()));
    }

    #[test]
    fn export_confirms_directly_from_pending() {
        let mut order = pending(MovementKind::InternalExport);
        let lot = order.lines()[0].lot_id;
        order.execute(&confirm(&order)).unwrap();
        assert_eq!(order.status(), MovementStatus::Exported);
        assert_eq!(order.lines()[0].lot_id, lot);
    }

    #[test]
    fn inbound_confirm_needs_one_lot_per_line() {
        let order = pending(MovementKind::SupplierImport);
        let err = order
            .handle(&MovementOrderCommand::ConfirmOrder(ConfirmOrder {
                order_id: order.id_typed(),
                received_lots: vec![],
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn cancelled_order_is_closed() {
        let mut order = pending(MovementKind::SupplierImport);
        order.execute(&cancel(&order)).unwrap();

        let err = order.handle(&confirm(&order)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                entity: "movement order",
                id: order.id_typed().0,
                from: "CANCELLED",
                action: "confirm",
            }
        );
    }

    #[test]
    fn approved_order_cannot_be_cancelled_but_can_be_rejected() {
        let mut order = pending(MovementKind::ImportOrder);
        order.execute(&approve(&order)).unwrap();

        assert!(matches!(
            order.handle(&cancel(&order)).unwrap_err(),
            DomainError::InvalidTransition { action: "cancel", .. }
        ));
        order.execute(&reject(&order)).unwrap();
        assert_eq!(order.status(), MovementStatus::Rejected);
        assert_eq!(order.rejection_reason(), Some("wrong supplier"));
    }

    #[test]
    fn fulfilled_order_can_only_be_returned() {
        let mut order = pending(MovementKind::InternalExport);
        order.execute(&confirm(&order)).unwrap();

        for action in [
            MovementAction::Approve,
            MovementAction::Confirm,
            MovementAction::Cancel,
            MovementAction::Reject,
        ] {
            assert!(order.handle(&command_for(&order, action)).is_err());
        }
        order.execute(&returned(&order)).unwrap();
        assert_eq!(order.status(), MovementStatus::Returned);
        assert!(order.handle(&returned(&order)).is_err());
    }

    #[test]
    fn events_serialize_with_canonical_status_names() {
        let mut order = pending(MovementKind::InternalExport);
        let events = order.execute(&confirm(&order)).unwrap();
        let json = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json["MovementOrderFulfilled"]["status"], "EXPORTED");
        assert_eq!(json["MovementOrderFulfilled"]["kind"], "INTERNAL_EXPORT");
    }

    fn kind() -> impl Strategy<Value = MovementKind> {
        prop_oneof![
            Just(MovementKind::SupplierImport),
            Just(MovementKind::InternalExport),
            Just(MovementKind::ImportOrder),
        ]
    }

    fn action() -> impl Strategy<Value = MovementAction> {
        proptest::sample::select(MovementAction::ALL.to_vec())
    }

    proptest! {
        /// Random action sequences only ever succeed when the transition table
        /// allows them, and a rejected action never changes the order.
        #[test]
        fn aggregate_follows_transition_table(
            kind in kind(),
            actions in prop::collection::vec(action(), 1..12),
        ) {
            let mut order = pending(kind);
            for action in actions {
                let allowed = order.status().allows(action);
                let before = order.clone();
                let result = order.execute(&command_for(&order, action));
                prop_assert_eq!(result.is_ok(), allowed);
                if !allowed {
                    prop_assert_eq!(&order, &before);
                }
            }
        }
    }
}
