use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockyard_products::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_product).get(list_products))
        .route("/:id", get(get_product))
        .route("/:id/activate", post(activate_product))
        .route("/:id/deactivate", post(deactivate_product))
        .route("/:id/journal", get(product_journal))
}

pub async fn register_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterProductBody>,
) -> axum::response::Response {
    let input = match body.into_input() {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match services.stockyard.catalog.register_product(input) {
        Ok(p) => (StatusCode::CREATED, Json(dto::product_to_json(&p))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.stockyard.catalog.list() {
        Ok(products) => Json(
            products
                .iter()
                .map(dto::product_to_json)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.stockyard.catalog.get(product_id) {
        Ok(p) => Json(dto::product_to_json(&p)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn activate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.stockyard.catalog.activate(product_id) {
        Ok(p) => Json(dto::product_to_json(&p)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn deactivate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.stockyard.catalog.deactivate(product_id) {
        Ok(p) => Json(dto::product_to_json(&p)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Per-product stock history: lot receipts, reservations, returns and adjustments.
pub async fn product_journal(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Err(e) = services.stockyard.catalog.get(product_id) {
        return errors::service_error_to_response(e);
    }

    let entries = services.journal_entries(product_id);
    Json(
        entries
            .iter()
            .map(dto::journal_entry_to_json)
            .collect::<Vec<_>>(),
    )
    .into_response()
}
