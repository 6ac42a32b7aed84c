//! Product catalog service.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use stockyard_core::{CategoryId, DomainError, Money, PartyId};
use stockyard_events::{EventBus, EventEnvelope};
use stockyard_products::{
    ActivateProduct, CreateProduct, DeactivateProduct, Product, ProductCommand, ProductId,
    StockBounds,
};

use super::ServiceContext;
use crate::error::ServiceResult;
use crate::store::Store;

/// Input of [`Catalog::register_product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterProduct {
    pub code: String,
    pub name: String,
    pub unit_price: Money,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<PartyId>,
}

/// Products and their on-hand quantity.
///
/// The catalog never changes stock itself; quantities move through movement
/// orders and approved inventory checks.
pub struct Catalog<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> Catalog<S, B>
where
    S: Store,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }

    #[tracing::instrument(skip(self), fields(code = %input.code))]
    pub fn register_product(&self, input: RegisterProduct) -> ServiceResult<Product> {
        let code = input.code.trim().to_string();
        let taken = self
            .ctx
            .fetch_all::<Product>(&|p: &Product| p.code().eq_ignore_ascii_case(&code))?;
        if !taken.is_empty() {
            let msg = format!("product code '{code}' already exists");
            return Err(DomainError::validation(msg).into());
        }

        let product_id = ProductId::generate();
        let mut ws = self.ctx.begin();
        ws.execute::<Product>(
            product_id,
            &ProductCommand::CreateProduct(CreateProduct {
                product_id,
                code,
                name: input.name,
                unit_price: input.unit_price,
                bounds: StockBounds {
                    min_stock: input.min_stock,
                    max_stock: input.max_stock,
                },
                category_id: input.category_id,
                supplier_id: input.supplier_id,
                occurred_at: Utc::now(),
            }),
        )?;
        let product = ws.existing::<Product>(product_id)?.clone();
        self.ctx.finish(ws)?;

        info!(product_id = %product_id, "product registered");
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub fn activate(&self, product_id: ProductId) -> ServiceResult<Product> {
        self.set_active(product_id, true)
    }

    #[tracing::instrument(skip(self))]
    pub fn deactivate(&self, product_id: ProductId) -> ServiceResult<Product> {
        self.set_active(product_id, false)
    }

    fn set_active(&self, product_id: ProductId, active: bool) -> ServiceResult<Product> {
        let occurred_at = Utc::now();
        let command = if active {
            ProductCommand::ActivateProduct(ActivateProduct {
                product_id,
                occurred_at,
            })
        } else {
            ProductCommand::DeactivateProduct(DeactivateProduct {
                product_id,
                occurred_at,
            })
        };

        let mut ws = self.ctx.begin();
        ws.execute::<Product>(product_id, &command)?;
        let product = ws.existing::<Product>(product_id)?.clone();
        self.ctx.finish(ws)?;

        info!(status = product.status().as_str(), "product status changed");
        Ok(product)
    }

    pub fn get(&self, product_id: ProductId) -> ServiceResult<Product> {
        self.ctx.fetch::<Product>(product_id)
    }

    pub fn list(&self) -> ServiceResult<Vec<Product>> {
        self.ctx.fetch_all::<Product>(&|_: &Product| true)
    }
}
