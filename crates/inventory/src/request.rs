use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ProductCode};

use crate::kind::MovementKind;

/// Longest description a movement may carry, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Raw movement request as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub product_code: i64,
    pub kind: String,
    pub quantity: i64,
    pub description: Option<String>,
}

/// A movement request that passed every storage-independent check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMovement {
    pub product_code: ProductCode,
    pub kind: MovementKind,
    pub quantity: i64,
    pub description: Option<String>,
}

impl MovementRequest {
    /// Validate the request without touching storage.
    ///
    /// The movement kind is checked first so an unknown kind is reported as
    /// such even when other fields are also wrong.
    pub fn validate(&self) -> DomainResult<ValidatedMovement> {
        let kind = MovementKind::parse(&self.kind)?;
        let product_code = ProductCode::new(self.product_code)?;

        if self.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be greater than 0 (got {})",
                self.quantity
            )));
        }

        if let Some(description) = &self.description {
            let chars = description.chars().count();
            if chars > MAX_DESCRIPTION_CHARS {
                return Err(DomainError::validation(format!(
                    "description must not exceed {MAX_DESCRIPTION_CHARS} characters (got {chars})"
                )));
            }
        }

        Ok(ValidatedMovement {
            product_code,
            kind,
            quantity: self.quantity,
            description: self.description.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(code: i64, kind: &str, quantity: i64, description: Option<&str>) -> MovementRequest {
        MovementRequest {
            product_code: code,
            kind: kind.to_string(),
            quantity,
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn valid_request_is_normalized() {
        let v = request(101, " entrada ", 50, Some("compra")).validate().unwrap();
        assert_eq!(v.product_code.get(), 101);
        assert_eq!(v.kind, MovementKind::Inbound);
        assert_eq!(v.quantity, 50);
        assert_eq!(v.description.as_deref(), Some("compra"));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        for q in [0, -1] {
            let err = request(101, "ENTRADA", q, None).validate().unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn rejects_non_positive_product_code() {
        let err = request(0, "SAIDA", 1, None).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn description_limit_counts_characters_not_bytes() {
        let at_limit = "ç".repeat(MAX_DESCRIPTION_CHARS);
        assert!(request(101, "ENTRADA", 1, Some(&at_limit)).validate().is_ok());

        let over = "a".repeat(MAX_DESCRIPTION_CHARS + 1);
        let err = request(101, "ENTRADA", 1, Some(&over)).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unknown_kind_wins_over_other_errors() {
        let err = request(-3, "invalido", 0, None).validate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidMovementType { .. }));
    }
}
