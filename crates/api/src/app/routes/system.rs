use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use stockyard_infra::store::UnitOfWork;

use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Store reachability plus event log size.
pub async fn ready(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.stockyard.store().event_log() {
        Ok(log) => Json(serde_json::json!({
            "status": "ok",
            "events": log.len(),
        }))
        .into_response(),
        Err(e) => crate::app::errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "store_unavailable",
            e.to_string(),
        ),
    }
}
