use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

/// Closed set of stock movement kinds.
///
/// The wire tokens are the Portuguese names the clients send (`ENTRADA`,
/// `SAIDA`, `INVENTARIO`); inside the domain only the enum travels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    /// Goods received; adds to the balance.
    #[serde(rename = "ENTRADA")]
    Inbound,
    /// Goods issued; subtracts from the balance.
    #[serde(rename = "SAIDA")]
    Outbound,
    /// Physical count; the quantity replaces the balance.
    #[serde(rename = "INVENTARIO")]
    Adjustment,
}

impl MovementKind {
    pub const ALL: [MovementKind; 3] = [
        MovementKind::Inbound,
        MovementKind::Outbound,
        MovementKind::Adjustment,
    ];

    /// Canonical wire token.
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Inbound => "ENTRADA",
            MovementKind::Outbound => "SAIDA",
            MovementKind::Adjustment => "INVENTARIO",
        }
    }

    /// Parse free text into a movement kind.
    ///
    /// Surrounding whitespace is ignored and matching is case-insensitive.
    /// Empty input and unknown tokens fail with
    /// [`DomainError::InvalidMovementType`].
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_movement_type(raw));
        }

        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DomainError::invalid_movement_type(raw))
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
