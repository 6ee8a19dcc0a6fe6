use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;

use stockroom_core::DomainError;
use stockroom_invoicing::parse_due_date;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn calculate(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::FeesQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", e.body_text()),
    };

    let quote = parse_query(&query).and_then(|(due, amount)| {
        services.late_fees.quote(due, amount, Utc::now())
    });

    match quote {
        Ok(quote) => Json(quote).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn parse_query(query: &dto::FeesQuery) -> Result<(chrono::NaiveDate, Decimal), DomainError> {
    let due = parse_due_date(query.due_date.as_deref().unwrap_or_default())?;
    let raw_amount = query
        .amount
        .as_deref()
        .ok_or_else(|| DomainError::validation("amount is required"))?;
    let amount = Decimal::from_str(raw_amount.trim())
        .map_err(|_| DomainError::validation(format!("invalid amount '{raw_amount}'")))?;
    Ok((due, amount))
}
