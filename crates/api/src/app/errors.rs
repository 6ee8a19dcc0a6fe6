use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::error;

use stockroom_core::DomainError;
use stockroom_infra::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> Response {
    match err {
        LedgerError::InvalidMovementType { .. } => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_movement_type",
            format!("{err}; expected one of ENTRADA, SAIDA, INVENTARIO"),
        ),
        LedgerError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        LedgerError::ProductNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "product_not_found", err.to_string())
        }
        LedgerError::InsufficientStock {
            available,
            requested,
            ..
        } => json_error_with(
            StatusCode::BAD_REQUEST,
            "insufficient_stock",
            err.to_string(),
            json!({ "available": available, "requested": requested }),
        ),
        LedgerError::ConcurrencyConflict { .. } => json_error_with(
            StatusCode::CONFLICT,
            "concurrency_conflict",
            format!("{err}; reload and try again"),
            json!({ "retryable": true }),
        ),
        LedgerError::Store(e) => {
            error!(error = %e, "store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "an internal error occurred",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    ledger_error_to_response(LedgerError::from(err))
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    json_error_with(status, code, message, Value::Null)
}

/// Error body with extra top-level fields merged in from `extra` (an object).
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    extra: Value,
) -> Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    (status, axum::Json(body)).into_response()
}
