//! Stock balance arithmetic.

use stockroom_core::{DomainError, DomainResult, ProductCode};

use crate::kind::MovementKind;

/// Compute the balance a product holds after a movement.
///
/// - `Inbound` adds `quantity`.
/// - `Outbound` subtracts `quantity`, failing with
///   [`DomainError::InsufficientStock`] when it exceeds `current`.
/// - `Adjustment` replaces the balance with `quantity` (absolute, not a delta).
///
/// `quantity > 0` is enforced upstream by request validation; this function
/// only guards against arithmetic overflow.
pub fn compute_new_balance(
    kind: MovementKind,
    product_code: ProductCode,
    current: i64,
    quantity: i64,
) -> DomainResult<i64> {
    let next = match kind {
        MovementKind::Inbound => current.checked_add(quantity).ok_or_else(|| {
            DomainError::validation(format!(
                "inbound quantity {quantity} overflows the balance of product {product_code}"
            ))
        })?,
        MovementKind::Outbound => {
            if quantity > current {
                tracing::debug!(
                    product_code = %product_code,
                    available = current,
                    requested = quantity,
                    "outbound movement exceeds available stock"
                );
                return Err(DomainError::insufficient_stock(product_code, current, quantity));
            }
            current - quantity
        }
        MovementKind::Adjustment => quantity,
    };

    tracing::debug!(
        product_code = %product_code,
        kind = %kind,
        before = current,
        after = next,
        "computed new balance"
    );

    Ok(next)
}
