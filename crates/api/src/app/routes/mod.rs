use axum::{Router, routing::get};

pub mod checks;
pub mod lots;
pub mod movements;
pub mod products;
pub mod system;

/// Router for every warehouse endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/ready", get(system::ready))
        .nest("/products", products::router())
        .nest("/lots", lots::router())
        .nest("/movements", movements::router())
        .nest("/checks", checks::router())
}
