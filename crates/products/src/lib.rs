//! Product catalog domain module.
//!
//! Business rules for products, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage). On-hand stock only moves through the
//! `AdjustStock` command issued by the movement and inventory-check workflows.

pub mod product;

pub use product::{
    ActivateProduct, AdjustStock, CreateProduct, DeactivateProduct, Product, ProductActivated,
    ProductCommand, ProductCreated, ProductDeactivated, ProductEvent, ProductId, ProductStatus,
    StockAdjusted, StockBounds, StockMovementReason,
};
