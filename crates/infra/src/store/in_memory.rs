use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use stockyard_core::ExpectedVersion;
use stockyard_events::EventEnvelope;
use stockyard_inventory::{ImportLot, ImportLotId};
use stockyard_movements::{MovementOrder, MovementOrderId};
use stockyard_products::{Product, ProductId};
use stockyard_stocktake::{InventoryCheck, InventoryCheckId};

use super::r#trait::{Changeset, Repository, Staged, StoreError, StoredAggregate, UnitOfWork};

/// Table contents guarded by [`InMemoryStore`]'s lock.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct Tables {
    products: BTreeMap<ProductId, Product>,
    lots: BTreeMap<ImportLotId, ImportLot>,
    orders: BTreeMap<MovementOrderId, MovementOrder>,
    checks: BTreeMap<InventoryCheckId, InventoryCheck>,
    log: Vec<EventEnvelope<JsonValue>>,
}

/// Maps an aggregate type to its table.
pub trait Table: StoredAggregate {
    #[doc(hidden)]
    fn table(tables: &Tables) -> &BTreeMap<Self::Id, Self>;
}

impl Table for Product {
    fn table(tables: &Tables) -> &BTreeMap<ProductId, Product> {
        &tables.products
    }
}

impl Table for ImportLot {
    fn table(tables: &Tables) -> &BTreeMap<ImportLotId, ImportLot> {
        &tables.lots
    }
}

impl Table for MovementOrder {
    fn table(tables: &Tables) -> &BTreeMap<MovementOrderId, MovementOrder> {
        &tables.orders
    }
}

impl Table for InventoryCheck {
    fn table(tables: &Tables) -> &BTreeMap<InventoryCheckId, InventoryCheck> {
        &tables.checks
    }
}

/// In-memory store: every table behind one lock, so a commit is atomic.
///
/// Intended for tests/dev and the single-process server.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_version<A: StoredAggregate>(
    table: &BTreeMap<A::Id, A>,
    aggregate: &A,
    expected: ExpectedVersion,
) -> Result<(), StoreError> {
    let actual = table.get(aggregate.id()).map(|stored| stored.version());
    if expected.matches(actual) {
        return Ok(());
    }
    Err(StoreError::Concurrency {
        aggregate_type: A::AGGREGATE_TYPE,
        aggregate_id: A::aggregate_id(*aggregate.id()),
        expected,
        actual,
    })
}

fn validate(tables: &Tables, staged: &Staged) -> Result<(), StoreError> {
    match staged {
        Staged::Product(product, expected) => {
            check_version(&tables.products, product, *expected)?;
            let taken = tables
                .products
                .values()
                .any(|p| p.code() == product.code() && p.id_typed() != product.id_typed());
            if taken {
                return Err(StoreError::UniqueViolation(format!(
                    "product code '{}' already exists",
                    product.code()
                )));
            }
            Ok(())
        }
        Staged::Lot(lot, expected) => check_version(&tables.lots, lot, *expected),
        Staged::Order(order, expected) => {
            check_version(&tables.orders, order, *expected)?;
            let taken = tables
                .orders
                .values()
                .any(|o| o.code() == order.code() && o.id_typed() != order.id_typed());
            if taken {
                return Err(StoreError::UniqueViolation(format!(
                    "order code '{}' already exists",
                    order.code()
                )));
            }
            Ok(())
        }
        Staged::Check(check, expected) => check_version(&tables.checks, check, *expected),
    }
}

fn write(tables: &mut Tables, staged: Staged) {
    match staged {
        Staged::Product(product, _) => {
            tables.products.insert(product.id_typed(), product);
        }
        Staged::Lot(lot, _) => {
            tables.lots.insert(lot.id_typed(), lot);
        }
        Staged::Order(order, _) => {
            tables.orders.insert(order.id_typed(), order);
        }
        Staged::Check(check, _) => {
            tables.checks.insert(check.id_typed(), check);
        }
    }
}

impl UnitOfWork for InMemoryStore {
    fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;

        // Validate everything before the first write.
        for staged in changeset.staged() {
            validate(&tables, staged)?;
        }

        let (staged, events) = changeset.into_parts();
        for s in staged {
            write(&mut tables, s);
        }
        tables.log.extend(events);
        Ok(())
    }

    fn event_log(&self) -> Result<Vec<EventEnvelope<JsonValue>>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.log.clone())
    }
}

impl<A: Table> Repository<A> for InMemoryStore {
    fn get(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(A::table(&tables).get(id).cloned())
    }

    fn list_by(&self, filter: &dyn Fn(&A) -> bool) -> Result<Vec<A>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(A::table(&tables)
            .values()
            .filter(|a| filter(a))
            .cloned()
            .collect())
    }

    fn save(&self, aggregate: A, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut changeset = Changeset::new();
        changeset.stage(aggregate, expected);
        self.commit(changeset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockyard_core::{Aggregate, Money};
    use stockyard_inventory::{LotCommand, ReceiveLot, ReserveFromLot};

    fn received_lot(quantity: i64) -> ImportLot {
        let lot_id = ImportLotId::generate();
        let mut lot = ImportLot::empty(lot_id);
        lot.execute(&LotCommand::ReceiveLot(ReceiveLot {
            lot_id,
            product_id: ProductId::generate(),
            import_code: "PN-20240301-0001".to_string(),
            imports_date: Utc::now(),
            quantity,
            unit_price: Money::ZERO,
            source_order: None,
            occurred_at: Utc::now(),
        }))
        .unwrap();
        lot
    }

    fn reserve(lot: &mut ImportLot, quantity: i64) {
        lot.execute(&LotCommand::ReserveFromLot(ReserveFromLot {
            lot_id: lot.id_typed(),
            quantity,
            reference: None,
            occurred_at: Utc::now(),
        }))
        .unwrap();
    }

    #[test]
    fn save_and_get_round_trip() {
        let store = InMemoryStore::new();
        let lot = received_lot(10);
        store.save(lot.clone(), ExpectedVersion::New).unwrap();

        let loaded = Repository::<ImportLot>::get(&store, &lot.id_typed()).unwrap();
        assert_eq!(loaded, Some(lot));
    }

    #[test]
    fn stale_write_loses() {
        let store = InMemoryStore::new();
        let lot = received_lot(10);
        store.save(lot.clone(), ExpectedVersion::New).unwrap();

        let mut first = lot.clone();
        let mut second = lot.clone();
        reserve(&mut first, 6);
        reserve(&mut second, 6);

        store.save(first, ExpectedVersion::Exact(1)).unwrap();
        let err = store.save(second, ExpectedVersion::Exact(1)).unwrap_err();
        assert!(matches!(err, StoreError::Concurrency { actual: Some(2), .. }));

        let stored = Repository::<ImportLot>::get(&store, &lot.id_typed())
            .unwrap()
            .unwrap();
        assert_eq!(stored.remaining_quantity(), 4);
    }

    #[test]
    fn failed_commit_writes_nothing() {
        let store = InMemoryStore::new();
        let existing = received_lot(5);
        store.save(existing.clone(), ExpectedVersion::New).unwrap();

        let fresh = received_lot(7);
        let mut changeset = Changeset::new();
        changeset.stage(fresh.clone(), ExpectedVersion::New);
        changeset.stage(existing.clone(), ExpectedVersion::New);

        assert!(store.commit(changeset).is_err());
        assert!(Repository::<ImportLot>::get(&store, &fresh.id_typed())
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_by_filters_in_id_order() {
        let store = InMemoryStore::new();
        let small = received_lot(1);
        let big = received_lot(2);
        store.save(big.clone(), ExpectedVersion::New).unwrap();
        store.save(small.clone(), ExpectedVersion::New).unwrap();

        let all = Repository::<ImportLot>::list_by(&store, &|_: &ImportLot| true).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id_typed() < all[1].id_typed());

        let filtered =
            Repository::<ImportLot>::list_by(&store, &|l: &ImportLot| l.quantity() > 1).unwrap();
        assert_eq!(filtered, vec![big]);
    }
}
