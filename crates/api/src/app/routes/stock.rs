use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use stockroom_core::ProductCode;
use stockroom_inventory::MovementRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/movements", post(create_movement))
        .route("/products", get(list_products))
        .route("/products/:code/movements", get(movement_history))
        .route("/products/:code/audit", get(audit_product))
}

pub async fn create_movement(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateMovementRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()),
    };

    let request = MovementRequest::from(body);
    match services.ledger.process_movement(&request).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(dto::MovementResultResponse::from(&outcome)),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.ledger.list_products().await {
        Ok(products) => {
            let body: Vec<dto::ProductResponse> = products.iter().map(dto::ProductResponse::from).collect();
            Json(body).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn movement_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> Response {
    let code = match parse_code(&code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.ledger.movement_history(code).await {
        Ok(movements) => {
            let body: Vec<dto::MovementResponse> = movements.iter().map(dto::MovementResponse::from).collect();
            Json(body).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn audit_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> Response {
    let code = match parse_code(&code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.ledger.audit_product(code).await {
        Ok(report) => Json(dto::AuditResponse::from(report)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

fn parse_code(raw: &str) -> Result<ProductCode, Response> {
    raw.parse::<ProductCode>().map_err(errors::domain_error_to_response)
}
