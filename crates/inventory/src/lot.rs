use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockyard_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, aggregate_id};
use stockyard_events::Event;
use stockyard_products::ProductId;

aggregate_id!(
    /// Import lot identifier.
    ImportLotId
);

/// Aggregate root: ImportLot.
///
/// Invariant: `0 <= remaining_quantity <= quantity` after every applied event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLot {
    id: ImportLotId,
    product_id: Option<ProductId>,
    import_code: String,
    imports_date: DateTime<Utc>,
    quantity: i64,
    unit_price: Money,
    remaining_quantity: i64,
    source_order: Option<AggregateId>,
    version: u64,
    created: bool,
}

impl ImportLot {
    /// Create an empty, not-yet-received lot instance.
    pub fn empty(id: ImportLotId) -> Self {
        Self {
            id,
            product_id: None,
            import_code: String::new(),
            imports_date: DateTime::<Utc>::MIN_UTC,
            quantity: 0,
            unit_price: Money::ZERO,
            remaining_quantity: 0,
            source_order: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ImportLotId {
        self.id
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn import_code(&self) -> &str {
        &self.import_code
    }

    pub fn imports_date(&self) -> DateTime<Utc> {
        self.imports_date
    }

    /// Quantity originally received.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Cost per unit at receipt.
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn remaining_quantity(&self) -> i64 {
        self.remaining_quantity
    }

    /// Order whose fulfilment created this lot, if any.
    pub fn source_order(&self) -> Option<AggregateId> {
        self.source_order
    }

    pub fn is_available(&self) -> bool {
        self.created && self.remaining_quantity > 0
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for ImportLot {
    type Id = ImportLotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ReceiveLot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveLot {
    pub lot_id: ImportLotId,
    pub product_id: ProductId,
    pub import_code: String,
    pub imports_date: DateTime<Utc>,
    pub quantity: i64,
    pub unit_price: Money,
    pub source_order: Option<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReserveFromLot (consume stock from the lot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveFromLot {
    pub lot_id: ImportLotId,
    pub quantity: i64,
    pub reference: Option<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnToLot (put previously consumed stock back).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnToLot {
    pub lot_id: ImportLotId,
    pub quantity: i64,
    pub reference: Option<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotCommand {
    ReceiveLot(ReceiveLot),
    ReserveFromLot(ReserveFromLot),
    ReturnToLot(ReturnToLot),
}

/// Event: LotReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotReceived {
    pub lot_id: ImportLotId,
    pub product_id: ProductId,
    pub import_code: String,
    pub imports_date: DateTime<Utc>,
    pub quantity: i64,
    pub unit_price: Money,
    pub source_order: Option<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LotReserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotReserved {
    pub lot_id: ImportLotId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub remaining_after: i64,
    pub reference: Option<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LotReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotReturned {
    pub lot_id: ImportLotId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub remaining_after: i64,
    pub reference: Option<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotEvent {
    LotReceived(LotReceived),
    LotReserved(LotReserved),
    LotReturned(LotReturned),
}

impl Event for LotEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LotEvent::LotReceived(_) => "inventory.lot.received",
            LotEvent::LotReserved(_) => "inventory.lot.reserved",
            LotEvent::LotReturned(_) => "inventory.lot.returned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LotEvent::LotReceived(e) => e.occurred_at,
            LotEvent::LotReserved(e) => e.occurred_at,
            LotEvent::LotReturned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ImportLot {
    type Command = LotCommand;
    type Event = LotEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LotEvent::LotReceived(e) => {
                self.id = e.lot_id;
                self.product_id = Some(e.product_id);
                self.import_code = e.import_code.clone();
                self.imports_date = e.imports_date;
                self.quantity = e.quantity;
                self.unit_price = e.unit_price;
                self.remaining_quantity = e.quantity;
                self.source_order = e.source_order;
                self.created = true;
            }
            LotEvent::LotReserved(e) => {
                self.remaining_quantity = e.remaining_after;
            }
            LotEvent::LotReturned(e) => {
                self.remaining_quantity = e.remaining_after;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LotCommand::ReceiveLot(cmd) => self.handle_receive(cmd),
            LotCommand::ReserveFromLot(cmd) => self.handle_reserve(cmd),
            LotCommand::ReturnToLot(cmd) => self.handle_return(cmd),
        }
    }
}

impl ImportLot {
    fn ensure_received(&self, lot_id: ImportLotId) -> Result<ProductId, DomainError> {
        if self.id != lot_id {
            return Err(DomainError::invariant("lot_id mismatch"));
        }
        match (self.created, self.product_id) {
            (true, Some(product_id)) => Ok(product_id),
            _ => Err(DomainError::not_found(format!("lot {lot_id}"))),
        }
    }

    fn handle_receive(&self, cmd: &ReceiveLot) -> Result<Vec<LotEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("lot already received"));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::InvalidQuantity {
                line_index: 0,
                quantity: cmd.quantity,
            });
        }
        if cmd.import_code.trim().is_empty() {
            return Err(DomainError::validation("import code cannot be empty"));
        }

        Ok(vec![LotEvent::LotReceived(LotReceived {
            lot_id: cmd.lot_id,
            product_id: cmd.product_id,
            import_code: cmd.import_code.clone(),
            imports_date: cmd.imports_date,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            source_order: cmd.source_order,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reserve(&self, cmd: &ReserveFromLot) -> Result<Vec<LotEvent>, DomainError> {
        let product_id = self.ensure_received(cmd.lot_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::InvalidQuantity {
                line_index: 0,
                quantity: cmd.quantity,
            });
        }
        if cmd.quantity > self.remaining_quantity {
            return Err(DomainError::InsufficientLotQuantity {
                lot_id: cmd.lot_id.0,
                requested: cmd.quantity,
                available: self.remaining_quantity,
            });
        }

        Ok(vec![LotEvent::LotReserved(LotReserved {
            lot_id: cmd.lot_id,
            product_id,
            quantity: cmd.quantity,
            remaining_after: self.remaining_quantity - cmd.quantity,
            reference: cmd.reference,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return(&self, cmd: &ReturnToLot) -> Result<Vec<LotEvent>, DomainError> {
        let product_id = self.ensure_received(cmd.lot_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::InvalidQuantity {
                line_index: 0,
                quantity: cmd.quantity,
            });
        }
        let over_return = DomainError::OverReturn {
            lot_id: cmd.lot_id.0,
            requested: cmd.quantity,
            remaining: self.remaining_quantity,
            received: self.quantity,
        };
        let remaining_after = self
            .remaining_quantity
            .checked_add(cmd.quantity)
            .ok_or_else(|| over_return.clone())?;
        if remaining_after > self.quantity {
            return Err(over_return);
        }

        Ok(vec![LotEvent::LotReturned(LotReturned {
            lot_id: cmd.lot_id,
            product_id,
            quantity: cmd.quantity,
            remaining_after,
            reference: cmd.reference,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn received_lot(quantity: i64) -> ImportLot {
        let lot_id = ImportLotId::generate();
        let mut lot = ImportLot::empty(lot_id);
        lot.execute(&LotCommand::ReceiveLot(ReceiveLot {
            lot_id,
            product_id: ProductId::generate(),
            import_code: "PN-20240101-0001".to_string(),
            imports_date: Utc::now(),
            quantity,
            unit_price: Money::new(1_000).unwrap(),
            source_order: None,
            occurred_at: Utc::now(),
        }))
        .unwrap();
        lot
    }

    fn reserve(lot: &ImportLot, quantity: i64) -> LotCommand {
        LotCommand::ReserveFromLot(ReserveFromLot {
            lot_id: lot.id_typed(),
            quantity,
            reference: None,
            occurred_at: Utc::now(),
        })
    }

    fn give_back(lot: &ImportLot, quantity: i64) -> LotCommand {
        LotCommand::ReturnToLot(ReturnToLot {
            lot_id: lot.id_typed(),
            quantity,
            reference: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn received_lot_is_fully_available() {
        let lot = received_lot(20);
        assert_eq!(lot.quantity(), 20);
        assert_eq!(lot.remaining_quantity(), 20);
        assert!(lot.is_available());
    }

    #[test]
    fn receive_rejects_non_positive_quantity() {
        let lot_id = ImportLotId::generate();
        let lot = ImportLot::empty(lot_id);
        let err = lot
            .handle(&LotCommand::ReceiveLot(ReceiveLot {
                lot_id,
                product_id: ProductId::generate(),
                import_code: "PN-1".to_string(),
                imports_date: Utc::now(),
                quantity: 0,
                unit_price: Money::ZERO,
                source_order: None,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity { quantity: 0, .. }));
    }

    #[test]
    fn reserve_decrements_remaining() {
        let mut lot = received_lot(20);
        lot.execute(&reserve(&lot, 5)).unwrap();
        assert_eq!(lot.remaining_quantity(), 15);
        assert_eq!(lot.quantity(), 20);
    }

    #[test]
    fn reserve_beyond_remaining_reports_available() {
        let mut lot = received_lot(20);
        lot.execute(&reserve(&lot, 5)).unwrap();

        let err = lot.handle(&reserve(&lot, 20)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientLotQuantity {
                lot_id: lot.id_typed().0,
                requested: 20,
                available: 15,
            }
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn depleted_lot_is_not_available() {
        let mut lot = received_lot(3);
        lot.execute(&reserve(&lot, 3)).unwrap();
        assert!(!lot.is_available());
    }

    #[test]
    fn return_is_capped_at_received_quantity() {
        let mut lot = received_lot(10);
        lot.execute(&reserve(&lot, 4)).unwrap();
        lot.execute(&give_back(&lot, 4)).unwrap();
        assert_eq!(lot.remaining_quantity(), 10);

        let err = lot.handle(&give_back(&lot, 1)).unwrap_err();
        assert!(matches!(err, DomainError::OverReturn { received: 10, remaining: 10, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn oversized_return_is_rejected_without_wrapping() {
        let mut lot = received_lot(10);
        lot.execute(&reserve(&lot, 1)).unwrap();

        let err = lot.handle(&give_back(&lot, i64::MAX)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::OverReturn { requested: i64::MAX, remaining: 9, received: 10, .. }
        ));
        assert!(lot.execute(&give_back(&lot, i64::MAX)).is_err());
        assert_eq!(lot.remaining_quantity(), 9);
    }

    #[test]
    fn commands_against_unreceived_lot_are_not_found() {
        let lot = ImportLot::empty(ImportLotId::generate());
        let err = lot.handle(&reserve(&lot, 1)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Reserve(i64),
        Return(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..40).prop_map(Op::Reserve),
            (1i64..40).prop_map(Op::Return),
        ]
    }

    proptest! {
        /// Whatever sequence of reservations and returns is attempted, rejected
        /// commands leave the lot untouched and accepted ones keep it in bounds.
        #[test]
        fn remaining_stays_within_bounds(
            received in 1i64..100,
            ops in prop::collection::vec(op(), 0..60),
        ) {
            let mut lot = received_lot(received);
            for op in ops {
                let cmd = match op {
                    Op::Reserve(q) => reserve(&lot, q),
                    Op::Return(q) => give_back(&lot, q),
                };
                let before = lot.clone();
                if lot.execute(&cmd).is_err() {
                    prop_assert_eq!(&lot, &before);
                }
                prop_assert!(lot.remaining_quantity() >= 0);
                prop_assert!(lot.remaining_quantity() <= lot.quantity());
            }
        }
    }
}
