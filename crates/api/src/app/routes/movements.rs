use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockyard_infra::{MovementFilter, ServiceResult};
use stockyard_movements::{MovementOrder, MovementOrderId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_movement).get(list_movements))
        .route("/:id", get(get_movement))
        .route("/:id/approve", post(approve_movement))
        .route("/:id/confirm", post(confirm_movement))
        .route("/:id/cancel", post(cancel_movement))
        .route("/:id/reject", post(reject_movement))
        .route("/:id/return", post(return_movement))
}

pub async fn create_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateMovementBody>,
) -> axum::response::Response {
    let input = match body.into_input() {
        Ok(i) => i,
        Err(resp) => return resp,
    };

    match services.stockyard.movements.create(input) {
        Ok(order) => (StatusCode::CREATED, Json(dto::movement_to_json(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// `?kind=` and `?status=` accept either case.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::MovementQuery>,
) -> axum::response::Response {
    let filter = match parse_filter(query) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.stockyard.movements.list(filter) {
        Ok(orders) => {
            Json(orders.iter().map(dto::movement_to_json).collect::<Vec<_>>()).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    run(&id, |order_id| services.stockyard.movements.get(order_id))
}

pub async fn approve_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    run(&id, |order_id| services.stockyard.movements.approve(order_id))
}

/// Fulfil the order: open lots (inbound) or deplete the selected lots (outbound).
pub async fn confirm_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    run(&id, |order_id| services.stockyard.movements.confirm(order_id))
}

pub async fn cancel_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    run(&id, |order_id| services.stockyard.movements.cancel(order_id))
}

/// The body (`{"reason": ...}`) is optional.
pub async fn reject_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Option<Json<dto::ReasonBody>>,
) -> axum::response::Response {
    let reason = body.and_then(|Json(b)| b.reason);
    run(&id, |order_id| services.stockyard.movements.reject(order_id, reason))
}

pub async fn return_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    run(&id, |order_id| services.stockyard.movements.mark_returned(order_id))
}

fn run<F>(id: &str, op: F) -> axum::response::Response
where
    F: FnOnce(MovementOrderId) -> ServiceResult<MovementOrder>,
{
    let order_id: MovementOrderId = match errors::parse_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match op(order_id) {
        Ok(order) => Json(dto::movement_to_json(&order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_filter(query: dto::MovementQuery) -> Result<MovementFilter, axum::response::Response> {
    Ok(MovementFilter {
        kind: query.kind.as_deref().map(errors::parse_enum).transpose()?,
        status: query.status.as_deref().map(errors::parse_enum).transpose()?,
    })
}
