use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use stockroom_sales::calculate_commissions;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn calculate(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CommissionRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()),
    };

    match calculate_commissions(&body.sales, &services.commission_rates) {
        Ok(sellers) => Json(dto::CommissionResponse { sellers }).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
