use axum::{
    Router,
    routing::{get, post},
};

pub mod commission;
pub mod fees;
pub mod stock;
pub mod system;

/// Router for all `/api/v1` endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/stock", stock::router())
        .route("/commission", post(commission::calculate))
        .route("/fees", get(fees::calculate))
}
