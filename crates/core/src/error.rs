//! Domain error model.

use thiserror::Error;

use crate::id::ProductCode;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// business rules). Storage and concurrency faults belong to the
/// infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The movement type text did not name one of the supported kinds.
    #[error("invalid movement type '{raw}': expected ENTRADA, SAIDA or INVENTARIO")]
    InvalidMovementType { raw: String },

    /// No product exists under the given code.
    #[error("product {0} not found")]
    ProductNotFound(ProductCode),

    /// An outbound movement asked for more than the product holds.
    #[error(
        "insufficient stock for product {product_code}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_code: ProductCode,
        available: i64,
        requested: i64,
    },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_movement_type(raw: impl Into<String>) -> Self {
        Self::InvalidMovementType { raw: raw.into() }
    }

    pub fn product_not_found(code: ProductCode) -> Self {
        Self::ProductNotFound(code)
    }

    pub fn insufficient_stock(product_code: ProductCode, available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            product_code,
            available,
            requested,
        }
    }
}
