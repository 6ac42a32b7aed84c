use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockyard_core::DomainError;
use stockyard_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        ServiceError::Serialize(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialize_error", e.to_string())
        }
        ServiceError::Publish(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "publish_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let (status, code) = match &err {
        DomainError::InvalidTransition { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition")
        }
        DomainError::IncompleteCheck { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "incomplete_check")
        }
        DomainError::OverReturn { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "over_return"),
        DomainError::InvariantViolation(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation")
        }
        DomainError::InsufficientLotQuantity { .. } => {
            (StatusCode::CONFLICT, "insufficient_lot_quantity")
        }
        DomainError::StockConflict { .. } => (StatusCode::CONFLICT, "stock_conflict"),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        DomainError::EmptyOrder => (StatusCode::BAD_REQUEST, "empty_order"),
        DomainError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, "invalid_quantity"),
        DomainError::UnknownLineItem { .. } => (StatusCode::BAD_REQUEST, "unknown_line_item"),
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
        DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
    };
    json_error(status, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path or query id, answering 400 `invalid_id` on failure.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

/// Parse an enum query value (kind, status), answering 400 on failure.
pub fn parse_enum<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(domain_error_to_response)
}
