use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

/// Longest seller name accepted, in characters.
pub const MAX_SELLER_CHARS: usize = 200;

/// Commission rates per tier.
///
/// Sales below 100 earn nothing, sales in `[100, 500)` earn `low`, sales of
/// 500 and above earn `high`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub low: Decimal,
    pub high: Decimal,
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self {
            low: Decimal::new(1, 2),
            high: Decimal::new(5, 2),
        }
    }
}

impl CommissionRates {
    pub fn new(low: Decimal, high: Decimal) -> DomainResult<Self> {
        if low.is_sign_negative() || high.is_sign_negative() {
            return Err(DomainError::validation("commission rates must not be negative"));
        }
        Ok(Self { low, high })
    }

    /// Unrounded commission for a single sale.
    pub fn commission_for(&self, amount: Decimal) -> DomainResult<Decimal> {
        if amount < Decimal::ONE_HUNDRED {
            return Ok(Decimal::ZERO);
        }
        let rate = if amount < Decimal::new(500, 0) { self.low } else { self.high };
        amount.checked_mul(rate).ok_or_else(too_large)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub seller: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionLine {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Rounded to cents for display.
    #[serde(with = "rust_decimal::serde::float")]
    pub commission: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerCommission {
    pub seller: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_sales: Decimal,
    /// Sum of the unrounded line commissions, rounded once.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_commission: Decimal,
    pub items: Vec<CommissionLine>,
}

fn too_large() -> DomainError {
    DomainError::validation("amount too large")
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn validate(sales: &[Sale]) -> DomainResult<()> {
    if sales.is_empty() {
        return Err(DomainError::validation("sales list must not be empty"));
    }
    for (idx, sale) in sales.iter().enumerate() {
        if sale.seller.trim().is_empty() {
            return Err(DomainError::validation(format!("sale {idx}: seller is required")));
        }
        if sale.seller.chars().count() > MAX_SELLER_CHARS {
            return Err(DomainError::validation(format!(
                "sale {idx}: seller must not exceed {MAX_SELLER_CHARS} characters"
            )));
        }
        if sale.amount.is_sign_negative() && !sale.amount.is_zero() {
            return Err(DomainError::validation(format!(
                "sale {idx}: amount must be greater than or equal to 0"
            )));
        }
    }
    Ok(())
}

/// Compute commissions grouped by seller, in order of first appearance.
pub fn calculate_commissions(
    sales: &[Sale],
    rates: &CommissionRates,
) -> DomainResult<Vec<SellerCommission>> {
    validate(sales)?;

    let mut out: Vec<SellerCommission> = Vec::new();
    let mut unrounded: Vec<Decimal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for sale in sales {
        let slot = *index.entry(sale.seller.as_str()).or_insert_with(|| {
            out.push(SellerCommission {
                seller: sale.seller.clone(),
                total_sales: Decimal::ZERO,
                total_commission: Decimal::ZERO,
                items: Vec::new(),
            });
            unrounded.push(Decimal::ZERO);
            out.len() - 1
        });

        let commission = rates.commission_for(sale.amount)?;
        unrounded[slot] = unrounded[slot].checked_add(commission).ok_or_else(too_large)?;

        let group = &mut out[slot];
        group.total_sales = group.total_sales.checked_add(sale.amount).ok_or_else(too_large)?;
        group.items.push(CommissionLine {
            amount: sale.amount,
            commission: round_cents(commission),
        });
    }

    for (group, total) in out.iter_mut().zip(unrounded) {
        group.total_commission = round_cents(total);
    }

    Ok(out)
}
