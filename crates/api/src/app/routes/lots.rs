use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockyard_core::AggregateId;
use stockyard_inventory::ImportLotId;
use stockyard_products::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(receive_lot).get(list_lots))
        .route("/available", get(list_available_lots))
        .route("/:id", get(get_lot))
        .route("/:id/reserve", post(reserve_from_lot))
        .route("/:id/return", post(return_to_lot))
}

pub async fn receive_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ReceiveLotBody>,
) -> axum::response::Response {
    let input = match body.into_input() {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match services.stockyard.lots.receive_lot(input) {
        Ok(lot) => (StatusCode::CREATED, Json(dto::lot_to_json(&lot))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Every lot of a product, depleted ones included.
pub async fn list_lots(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ProductQuery>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&query.product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.stockyard.lots.list_lots(product_id) {
        Ok(lots) => Json(lots.iter().map(dto::lot_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Lots with stock left, oldest receipt first.
pub async fn list_available_lots(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ProductQuery>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&query.product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.stockyard.lots.list_available_lots(product_id) {
        Ok(lots) => Json(lots.iter().map(dto::lot_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let lot_id: ImportLotId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.stockyard.lots.get_lot(lot_id) {
        Ok(lot) => Json(dto::lot_to_json(&lot)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn reserve_from_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::LotQuantityBody>,
) -> axum::response::Response {
    let (lot_id, reference) = match parse_lot_change(&id, &body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .stockyard
        .lots
        .reserve_from_lot(lot_id, body.quantity, reference)
    {
        Ok(lot) => Json(dto::lot_to_json(&lot)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn return_to_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::LotQuantityBody>,
) -> axum::response::Response {
    let (lot_id, reference) = match parse_lot_change(&id, &body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .stockyard
        .lots
        .return_to_lot(lot_id, body.quantity, reference)
    {
        Ok(lot) => Json(dto::lot_to_json(&lot)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_lot_change(
    id: &str,
    body: &dto::LotQuantityBody,
) -> Result<(ImportLotId, Option<AggregateId>), axum::response::Response> {
    let lot_id = errors::parse_id(id)?;
    let reference = body
        .reference
        .as_deref()
        .map(errors::parse_id::<AggregateId>)
        .transpose()?;
    Ok((lot_id, reference))
}
