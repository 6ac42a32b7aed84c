use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use stockyard_core::{Money, PartyId, WarehouseId};
use stockyard_infra::{
    CreateCheckRequest, CreateMovementRequest, ReceiveLotRequest, RegisterProduct,
    projections::{JournalEntry, JournalEntryKind},
};
use stockyard_inventory::{ImportLot, ImportLotId};
use stockyard_movements::{MovementKind, MovementOrder, NewMovementLine};
use stockyard_products::{Product, ProductId};
use stockyard_stocktake::InventoryCheck;

use crate::app::errors;

type ParseResult<T> = Result<T, axum::response::Response>;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterProductBody {
    pub code: String,
    pub name: String,
    pub unit_price: i64,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub category_id: Option<String>,
    pub supplier_id: Option<String>,
}

impl RegisterProductBody {
    pub fn into_input(self) -> ParseResult<RegisterProduct> {
        Ok(RegisterProduct {
            code: self.code,
            name: self.name,
            unit_price: money(self.unit_price)?,
            min_stock: self.min_stock,
            max_stock: self.max_stock,
            category_id: self.category_id.as_deref().map(errors::parse_id).transpose()?,
            supplier_id: self.supplier_id.as_deref().map(errors::parse_id).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiveLotBody {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub import_code: String,
    /// Defaults to now.
    pub imports_date: Option<DateTime<Utc>>,
}

impl ReceiveLotBody {
    pub fn into_input(self) -> ParseResult<ReceiveLotRequest> {
        Ok(ReceiveLotRequest {
            product_id: errors::parse_id(&self.product_id)?,
            quantity: self.quantity,
            unit_price: money(self.unit_price)?,
            import_code: self.import_code,
            imports_date: self.imports_date.unwrap_or_else(Utc::now),
        })
    }
}

/// Direct reservation from, or return to, one lot.
#[derive(Debug, Deserialize)]
pub struct LotQuantityBody {
    pub quantity: i64,
    /// Order or check id the change is booked against.
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MovementLineBody {
    pub product_id: String,
    pub selected_lot_id: Option<String>,
    pub unit_price: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateMovementBody {
    pub kind: String,
    pub counterparty_id: String,
    pub note: Option<String>,
    pub lines: Vec<MovementLineBody>,
}

impl CreateMovementBody {
    pub fn into_input(self) -> ParseResult<CreateMovementRequest> {
        let kind: MovementKind = errors::parse_enum(&self.kind)?;
        let counterparty_id: PartyId = errors::parse_id(&self.counterparty_id)?;

        let mut lines = Vec::with_capacity(self.lines.len());
        for l in self.lines {
            lines.push(NewMovementLine {
                product_id: errors::parse_id(&l.product_id)?,
                selected_lot_id: l
                    .selected_lot_id
                    .as_deref()
                    .map(errors::parse_id::<ImportLotId>)
                    .transpose()?,
                unit_price: money(l.unit_price)?,
                quantity: l.quantity,
            });
        }

        Ok(CreateMovementRequest {
            kind,
            counterparty_id,
            note: self.note,
            lines,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReasonBody {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCheckBody {
    pub warehouse_id: String,
    pub reason: String,
    pub product_ids: Vec<String>,
}

impl CreateCheckBody {
    pub fn into_input(self) -> ParseResult<CreateCheckRequest> {
        let warehouse_id: WarehouseId = errors::parse_id(&self.warehouse_id)?;
        let product_ids = self
            .product_ids
            .iter()
            .map(|id| errors::parse_id::<ProductId>(id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CreateCheckRequest {
            warehouse_id,
            reason: self.reason,
            product_ids,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordActualBody {
    pub product_id: String,
    pub actual_qty: i64,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub product_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementQuery {
    pub kind: Option<String>,
    pub status: Option<String>,
}

fn money(minor_units: i64) -> ParseResult<Money> {
    Money::new(minor_units).map_err(errors::domain_error_to_response)
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(p: &Product) -> serde_json::Value {
    let bounds = p.bounds();
    json!({
        "id": p.id_typed().to_string(),
        "code": p.code(),
        "name": p.name(),
        "unit_price": p.unit_price().minor_units(),
        "quantity": p.quantity(),
        "min_stock": bounds.min_stock,
        "max_stock": bounds.max_stock,
        "category_id": p.category_id().map(|id| id.to_string()),
        "supplier_id": p.supplier_id().map(|id| id.to_string()),
        "status": p.status().as_str(),
    })
}

pub fn lot_to_json(l: &ImportLot) -> serde_json::Value {
    json!({
        "id": l.id_typed().to_string(),
        "product_id": l.product_id().map(|id| id.to_string()),
        "import_code": l.import_code(),
        "imports_date": l.imports_date().to_rfc3339(),
        "quantity": l.quantity(),
        "remaining_quantity": l.remaining_quantity(),
        "unit_price": l.unit_price().minor_units(),
        "source_order": l.source_order().map(|id| id.to_string()),
    })
}

pub fn movement_to_json(o: &MovementOrder) -> serde_json::Value {
    json!({
        "id": o.id_typed().to_string(),
        "code": o.code(),
        "kind": o.kind().as_str(),
        "counterparty_id": o.counterparty_id().map(|id| id.to_string()),
        "status": o.status().as_str(),
        "note": o.note(),
        "total_value": o.total_value().minor_units(),
        "rejection_reason": o.rejection_reason(),
        "created_at": o.created_at().map(|t| t.to_rfc3339()),
        "updated_at": o.updated_at().map(|t| t.to_rfc3339()),
        "legal_actions": o
            .status()
            .legal_actions()
            .into_iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>(),
        "lines": o.lines().iter().map(|l| json!({
            "line_no": l.line_no,
            "product_id": l.product_id.to_string(),
            "lot_id": l.lot_id.map(|id| id.to_string()),
            "unit_price": l.unit_price.minor_units(),
            "quantity": l.quantity,
            "line_total": l.line_total.minor_units(),
        })).collect::<Vec<_>>(),
    })
}

pub fn check_to_json(c: &InventoryCheck) -> serde_json::Value {
    json!({
        "id": c.id_typed().to_string(),
        "code": c.code(),
        "reason": c.reason(),
        "warehouse_id": c.warehouse_id().map(|id| id.to_string()),
        "status": c.status().as_str(),
        "rejection_reason": c.rejection_reason(),
        "created_at": c.created_at().map(|t| t.to_rfc3339()),
        "lines": c.lines().iter().map(|l| json!({
            "product_id": l.product_id.to_string(),
            "system_qty": l.system_qty,
            "actual_qty": l.actual_qty,
            "difference": l.difference(),
            "note": l.note,
        })).collect::<Vec<_>>(),
    })
}

pub fn journal_entry_to_json(e: &JournalEntry) -> serde_json::Value {
    let (kind, reason) = match e.kind {
        JournalEntryKind::LotReceived => ("LOT_RECEIVED", None),
        JournalEntryKind::LotReserved => ("LOT_RESERVED", None),
        JournalEntryKind::LotReturned => ("LOT_RETURNED", None),
        JournalEntryKind::StockAdjusted(reason) => ("STOCK_ADJUSTED", Some(reason)),
    };
    json!({
        "occurred_at": e.occurred_at.to_rfc3339(),
        "kind": kind,
        "reason": reason,
        "lot_id": e.lot_id.map(|id| id.to_string()),
        "delta": e.delta,
        "balance_after": e.balance_after,
        "reference": e.reference.map(|id| id.to_string()),
    })
}
