//! Inventory check (stocktake) domain module.
//!
//! A check snapshots the system quantity of a set of products, collects the
//! physically counted quantities and, once approved, yields the per-product
//! differences that reconcile the catalog with the shelf.

pub mod check;

pub use check::{
    ActualRecorded, ApproveCheck, CheckAdjustment, CheckApproved, CheckCreated, CheckLine,
    CheckRejected, CheckStatus, CreateCheck, InventoryCheck, InventoryCheckCommand,
    InventoryCheckEvent, InventoryCheckId, RecordActual, RejectCheck, SystemSnapshot,
};
