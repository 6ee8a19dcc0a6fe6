use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_infra::MovementOutcome;
use stockroom_inventory::{AuditReport, Discrepancy, Movement, MovementRequest, Product};
use stockroom_sales::{Sale, SellerCommission};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovementRequest {
    pub product_code: i64,
    pub kind: String,
    pub quantity: i64,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CreateMovementRequest> for MovementRequest {
    fn from(body: CreateMovementRequest) -> Self {
        MovementRequest {
            product_code: body.product_code,
            kind: body.kind,
            quantity: body.quantity,
            description: body.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommissionRequest {
    pub sales: Vec<Sale>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeesQuery {
    pub due_date: Option<String>,
    pub amount: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub code: i64,
    pub description: String,
    pub stock_quantity: i64,
}

impl From<&Product> for ProductResponse {
    fn from(p: &Product) -> Self {
        Self {
            code: p.code().get(),
            description: p.description().to_string(),
            stock_quantity: p.stock_quantity(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResponse {
    pub public_id: String,
    pub kind: &'static str,
    pub quantity: i64,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub balance_before: i64,
    pub balance_after: i64,
}

impl From<&Movement> for MovementResponse {
    fn from(m: &Movement) -> Self {
        Self {
            public_id: m.public_id.to_string(),
            kind: m.kind.as_str(),
            quantity: m.quantity,
            description: m.description.clone(),
            timestamp: m.occurred_at,
            balance_before: m.balance_before,
            balance_after: m.balance_after,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResultResponse {
    pub product: ProductResponse,
    pub recent_movements: Vec<MovementResponse>,
}

impl From<&MovementOutcome> for MovementResultResponse {
    fn from(o: &MovementOutcome) -> Self {
        Self {
            product: ProductResponse::from(&o.product),
            recent_movements: o.recent_movements.iter().map(MovementResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub product_code: i64,
    pub movements_checked: usize,
    pub stock_quantity: i64,
    pub consistent: bool,
    pub discrepancy: Option<Discrepancy>,
}

impl From<AuditReport> for AuditResponse {
    fn from(r: AuditReport) -> Self {
        Self {
            product_code: r.product_code.get(),
            movements_checked: r.movements_checked,
            stock_quantity: r.stock_quantity,
            consistent: r.is_consistent(),
            discrepancy: r.discrepancy,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommissionResponse {
    pub sellers: Vec<SellerCommission>,
}
