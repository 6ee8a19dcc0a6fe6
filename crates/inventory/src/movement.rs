use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainResult, MovementId, ProductCode};

use crate::balance::compute_new_balance;
use crate::product::Product;
use crate::request::ValidatedMovement;
use crate::kind::MovementKind;

/// How many movements "recent history" returns by default.
pub const RECENT_MOVEMENTS_LIMIT: usize = 10;

/// A movement that has been decided but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub public_id: MovementId,
    pub product_code: ProductCode,
    pub kind: MovementKind,
    pub quantity: i64,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub balance_before: i64,
    pub balance_after: i64,
}

impl NewMovement {
    /// Decide the movement a validated request produces against `product`.
    ///
    /// Pure: reads the product's current balance, never mutates it. Fails with
    /// `InsufficientStock` when an outbound movement exceeds the balance.
    pub fn plan(
        product: &Product,
        request: &ValidatedMovement,
        public_id: MovementId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let balance_before = product.stock_quantity();
        let balance_after =
            compute_new_balance(request.kind, product.code(), balance_before, request.quantity)?;

        Ok(Self {
            public_id,
            product_code: product.code(),
            kind: request.kind,
            quantity: request.quantity,
            description: request.description.clone(),
            occurred_at,
            balance_before,
            balance_after,
        })
    }

    /// Attach the storage-assigned internal id.
    pub fn into_stored(self, internal_id: i64) -> Movement {
        Movement {
            internal_id,
            public_id: self.public_id,
            product_code: self.product_code,
            kind: self.kind,
            quantity: self.quantity,
            description: self.description,
            occurred_at: self.occurred_at,
            balance_before: self.balance_before,
            balance_after: self.balance_after,
        }
    }
}

/// Immutable audit record of one stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Storage-assigned, monotonically increasing; breaks timestamp ties.
    pub internal_id: i64,
    pub public_id: MovementId,
    pub product_code: ProductCode,
    pub kind: MovementKind,
    pub quantity: i64,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub balance_before: i64,
    pub balance_after: i64,
}

/// Order movements most recent first: timestamp descending, then
/// `internal_id` descending for identical timestamps.
pub fn sort_most_recent_first(movements: &mut [Movement]) {
    movements.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then_with(|| b.internal_id.cmp(&a.internal_id))
    });
}
