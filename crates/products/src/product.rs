use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockyard_core::{
    Aggregate, AggregateId, AggregateRoot, CategoryId, DomainError, Money, PartyId, aggregate_id,
};
use stockyard_events::Event;

aggregate_id!(
    /// Product identifier.
    ProductId
);

/// Product status. Inactive products keep their stock but are hidden from new documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Active => "ACTIVE",
            ProductStatus::Inactive => "INACTIVE",
        }
    }
}

/// Why on-hand stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockMovementReason {
    /// Goods received by an inbound order.
    Receipt,
    /// Goods issued by an outbound order.
    Issue,
    /// A fulfilled order was returned.
    Return,
    /// Physical count correction from an approved inventory check.
    Count,
}

/// Optional stock bounds. Stored for the catalog screens; no alerting is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBounds {
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
}

impl StockBounds {
    fn validate(&self) -> Result<(), DomainError> {
        if self.min_stock.is_some_and(|v| v < 0) || self.max_stock.is_some_and(|v| v < 0) {
            return Err(DomainError::validation("stock bounds cannot be negative"));
        }
        if let (Some(min), Some(max)) = (self.min_stock, self.max_stock) {
            if min > max {
                return Err(DomainError::validation("min_stock cannot exceed max_stock"));
            }
        }
        Ok(())
    }
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    code: String,
    name: String,
    unit_price: Money,
    quantity: i64,
    bounds: StockBounds,
    category_id: Option<CategoryId>,
    supplier_id: Option<PartyId>,
    status: ProductStatus,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            code: String::new(),
            name: String::new(),
            unit_price: Money::ZERO,
            quantity: 0,
            bounds: StockBounds::default(),
            category_id: None,
            supplier_id: None,
            status: ProductStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Current on-hand quantity.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn bounds(&self) -> StockBounds {
        self.bounds
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn supplier_id(&self) -> Option<PartyId> {
        self.supplier_id
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub unit_price: Money,
    pub bounds: StockBounds,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<PartyId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ActivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock.
///
/// Issued by the movement and inventory-check workflows, never directly by users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: StockMovementReason,
    /// Order or check that caused the movement.
    pub reference: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ActivateProduct(ActivateProduct),
    DeactivateProduct(DeactivateProduct),
    AdjustStock(AdjustStock),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub unit_price: Money,
    pub bounds: StockBounds,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<PartyId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductActivated {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeactivated {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub product_id: ProductId,
    pub delta: i64,
    pub quantity_after: i64,
    pub reason: StockMovementReason,
    pub reference: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductActivated(ProductActivated),
    ProductDeactivated(ProductDeactivated),
    StockAdjusted(StockAdjusted),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductActivated(_) => "products.product.activated",
            ProductEvent::ProductDeactivated(_) => "products.product.deactivated",
            ProductEvent::StockAdjusted(_) => "products.product.stock_adjusted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductActivated(e) => e.occurred_at,
            ProductEvent::ProductDeactivated(e) => e.occurred_at,
            ProductEvent::StockAdjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.code = e.code.clone();
                self.name = e.name.clone();
                self.unit_price = e.unit_price;
                self.bounds = e.bounds;
                self.category_id = e.category_id;
                self.supplier_id = e.supplier_id;
                self.status = ProductStatus::Active;
                self.quantity = 0;
                self.created = true;
            }
            ProductEvent::ProductActivated(_) => {
                self.status = ProductStatus::Active;
            }
            ProductEvent::ProductDeactivated(_) => {
                self.status = ProductStatus::Inactive;
            }
            ProductEvent::StockAdjusted(e) => {
                self.quantity = e.quantity_after;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ActivateProduct(cmd) => self.handle_activate(cmd),
            ProductCommand::DeactivateProduct(cmd) => self.handle_deactivate(cmd),
            ProductCommand::AdjustStock(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl Product {
    fn ensure_created(&self, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("product {product_id}")));
        }
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        cmd.bounds.validate()?;

        // Code uniqueness spans aggregates; the catalog service checks it before dispatch.
        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            code: cmd.code.trim().to_string(),
            name: cmd.name.trim().to_string(),
            unit_price: cmd.unit_price,
            bounds: cmd.bounds,
            category_id: cmd.category_id,
            supplier_id: cmd.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_activate(&self, cmd: &ActivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created(cmd.product_id)?;
        if self.status == ProductStatus::Active {
            return Err(DomainError::conflict("product is already active"));
        }
        Ok(vec![ProductEvent::ProductActivated(ProductActivated {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created(cmd.product_id)?;
        if self.status == ProductStatus::Inactive {
            return Err(DomainError::conflict("product is already inactive"));
        }
        Ok(vec![ProductEvent::ProductDeactivated(ProductDeactivated {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created(cmd.product_id)?;

        if cmd.delta == 0 {
            // A zero-difference count line is a no-op, not an error.
            return Ok(vec![]);
        }

        let quantity_after = self
            .quantity
            .checked_add(cmd.delta)
            .ok_or_else(|| DomainError::validation("stock quantity overflow"))?;
        if quantity_after < 0 {
            return Err(DomainError::invariant(format!(
                "stock of product {} cannot go negative ({} on hand, delta {})",
                self.code, self.quantity, cmd.delta
            )));
        }

        Ok(vec![ProductEvent::StockAdjusted(StockAdjusted {
            product_id: cmd.product_id,
            delta: cmd.delta,
            quantity_after,
            reason: cmd.reason,
            reference: cmd.reference,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(product_id: ProductId) -> CreateProduct {
        CreateProduct {
            product_id,
            code: "SP-001".to_string(),
            name: "Cement 50kg".to_string(),
            unit_price: Money::new(1_000).unwrap(),
            bounds: StockBounds {
                min_stock: Some(5),
                max_stock: Some(500),
            },
            category_id: None,
            supplier_id: None,
            occurred_at: test_time(),
        }
    }

    fn created_product() -> Product {
        let product_id = ProductId::generate();
        let mut product = Product::empty(product_id);
        product
            .execute(&ProductCommand::CreateProduct(create_cmd(product_id)))
            .unwrap();
        product
    }

    fn adjust(product: &Product, delta: i64) -> ProductCommand {
        ProductCommand::AdjustStock(AdjustStock {
            product_id: product.id_typed(),
            delta,
            reason: StockMovementReason::Receipt,
            reference: AggregateId::new(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn create_product_starts_active_with_zero_stock() {
        let product = created_product();
        assert_eq!(product.status(), ProductStatus::Active);
        assert_eq!(product.quantity(), 0);
        assert_eq!(product.code(), "SP-001");
        assert_eq!(product.version(), 1);
    }

    #[test]
    fn create_product_rejects_empty_code() {
        let product_id = ProductId::generate();
        let product = Product::empty(product_id);
        let mut cmd = create_cmd(product_id);
        cmd.code = "  ".to_string();

        let err = product.handle(&ProductCommand::CreateProduct(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_product_rejects_inverted_bounds() {
        let product_id = ProductId::generate();
        let product = Product::empty(product_id);
        let mut cmd = create_cmd(product_id);
        cmd.bounds = StockBounds {
            min_stock: Some(10),
            max_stock: Some(1),
        };

        let err = product.handle(&ProductCommand::CreateProduct(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("min_stock")));
    }

    #[test]
    fn adjust_stock_tracks_quantity_after() {
        let mut product = created_product();
        product.execute(&adjust(&product, 20)).unwrap();
        let events = product.execute(&adjust(&product, -5)).unwrap();

        match &events[0] {
            ProductEvent::StockAdjusted(e) => assert_eq!(e.quantity_after, 15),
            other => panic!("expected StockAdjusted, got {other:?}"),
        }
        assert_eq!(product.quantity(), 15);
    }

    #[test]
    fn adjust_stock_cannot_go_negative() {
        let mut product = created_product();
        product.execute(&adjust(&product, 3)).unwrap();
        let before = product.clone();

        let err = product.execute(&adjust(&product, -4)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(product, before);
    }

    #[test]
    fn zero_adjustment_emits_nothing() {
        let product = created_product();
        assert!(product.handle(&adjust(&product, 0)).unwrap().is_empty());
    }

    #[test]
    fn deactivate_then_activate() {
        let mut product = created_product();
        let id = product.id_typed();
        product
            .execute(&ProductCommand::DeactivateProduct(DeactivateProduct {
                product_id: id,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(product.status(), ProductStatus::Inactive);

        let err = product
            .handle(&ProductCommand::DeactivateProduct(DeactivateProduct {
                product_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        product
            .execute(&ProductCommand::ActivateProduct(ActivateProduct {
                product_id: id,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(product.status(), ProductStatus::Active);
    }

    #[test]
    fn commands_on_missing_product_are_not_found() {
        let product = Product::empty(ProductId::generate());
        let err = product.handle(&adjust(&product, 1)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
