//! Lot selection ordering.
//!
//! The operator always picks the lot for an export explicitly; the system only
//! decides the order in which candidate lots are presented (oldest first).

use crate::lot::ImportLot;

/// Lots that still hold stock, oldest receipt first.
///
/// Ties on the import date are broken by import code, then by lot id, so the
/// order is stable across calls.
pub fn available_in_fifo_order<I>(lots: I) -> Vec<ImportLot>
where
    I: IntoIterator<Item = ImportLot>,
{
    let mut available: Vec<ImportLot> = lots.into_iter().filter(ImportLot::is_available).collect();
    available.sort_by(|a, b| {
        a.imports_date()
            .cmp(&b.imports_date())
            .then_with(|| a.import_code().cmp(b.import_code()))
            .then_with(|| a.id_typed().cmp(&b.id_typed()))
    });
    available
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lot::{ImportLotId, LotCommand, ReceiveLot, ReserveFromLot};
    use chrono::{Duration, TimeZone, Utc};
    use stockyard_core::{Aggregate, Money};
    use stockyard_products::ProductId;

    fn lot(code: &str, days: i64, quantity: i64, consumed: i64) -> ImportLot {
        let lot_id = ImportLotId::generate();
        let mut lot = ImportLot::empty(lot_id);
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        lot.execute(&LotCommand::ReceiveLot(ReceiveLot {
            lot_id,
            product_id: ProductId::generate(),
            import_code: code.to_string(),
            imports_date: base + Duration::days(days),
            quantity,
            unit_price: Money::ZERO,
            source_order: None,
            occurred_at: Utc::now(),
        }))
        .unwrap();
        if consumed > 0 {
            lot.execute(&LotCommand::ReserveFromLot(ReserveFromLot {
                lot_id,
                quantity: consumed,
                reference: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        }
        lot
    }

    #[test]
    fn oldest_first_and_depleted_lots_hidden() {
        let newest = lot("PN-3", 3, 10, 0);
        let depleted = lot("PN-1", 1, 10, 10);
        let oldest = lot("PN-0", 0, 10, 2);

        let ordered = available_in_fifo_order(vec![newest.clone(), depleted, oldest.clone()]);

        let codes: Vec<&str> = ordered.iter().map(|l| l.import_code()).collect();
        assert_eq!(codes, vec!["PN-0", "PN-3"]);
    }

    #[test]
    fn same_day_lots_ordered_by_code() {
        let b = lot("PN-B", 0, 5, 0);
        let a = lot("PN-A", 0, 5, 0);

        let ordered = available_in_fifo_order(vec![b, a]);
        assert_eq!(ordered[0].import_code(), "PN-A");
    }

    #[test]
    fn no_stock_is_an_empty_list() {
        assert!(available_in_fifo_order(vec![lot("PN-1", 0, 4, 4)]).is_empty());
    }
}
