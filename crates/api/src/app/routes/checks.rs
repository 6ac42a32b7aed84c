use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockyard_infra::ServiceResult;
use stockyard_products::ProductId;
use stockyard_stocktake::{InventoryCheck, InventoryCheckId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_check).get(list_checks))
        .route("/:id", get(get_check))
        .route("/:id/actuals", post(record_actual))
        .route("/:id/approve", post(approve_check))
        .route("/:id/reject", post(reject_check))
}

/// Open a check over the listed products, snapshotting their on-hand quantities.
pub async fn create_check(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateCheckBody>,
) -> axum::response::Response {
    let input = match body.into_input() {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match services.stockyard.checks.create_check(input) {
        Ok(check) => (StatusCode::CREATED, Json(dto::check_to_json(&check))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_checks(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.stockyard.checks.list() {
        Ok(checks) => {
            Json(checks.iter().map(dto::check_to_json).collect::<Vec<_>>()).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_check(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    run(&id, |check_id| services.stockyard.checks.get(check_id))
}

pub async fn record_actual(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::RecordActualBody>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&body.product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    run(&id, |check_id| {
        services
            .stockyard
            .checks
            .record_actual(check_id, product_id, body.actual_qty, body.note)
    })
}

/// Apply every counted difference to product stock and its lots.
pub async fn approve_check(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    run(&id, |check_id| services.stockyard.checks.approve(check_id))
}

pub async fn reject_check(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Option<Json<dto::ReasonBody>>,
) -> axum::response::Response {
    let reason = body.and_then(|Json(b)| b.reason);
    run(&id, |check_id| services.stockyard.checks.reject(check_id, reason))
}

fn run<F>(id: &str, op: F) -> axum::response::Response
where
    F: FnOnce(InventoryCheckId) -> ServiceResult<InventoryCheck>,
{
    let check_id: InventoryCheckId = match errors::parse_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match op(check_id) {
        Ok(check) => Json(dto::check_to_json(&check)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
