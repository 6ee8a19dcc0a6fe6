//! Replay check over a product's movement history.
//!
//! Movements snapshot the balance before and after each change, so the full
//! history of a product can be verified without the original seed: every link
//! must follow the balance arithmetic, consecutive links must join up, and the
//! last link must land on the product's current stock.

use serde::{Deserialize, Serialize};

use stockroom_core::{MovementId, ProductCode};

use crate::balance::compute_new_balance;
use crate::movement::Movement;
use crate::product::Product;

/// First inconsistency found while replaying a history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discrepancy {
    /// `balance_before` does not continue from the previous `balance_after`.
    BrokenChain {
        public_id: MovementId,
        expected_before: i64,
        actual_before: i64,
    },
    /// `balance_after` is not what the movement's arithmetic yields.
    WrongBalance {
        public_id: MovementId,
        expected_after: i64,
        actual_after: i64,
    },
    /// The stored movement could not have been accepted (e.g. outbound beyond stock).
    RejectedMovement { public_id: MovementId, reason: String },
    /// The last movement does not match the product's current stock.
    StockMismatch { expected: i64, actual: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub product_code: ProductCode,
    pub movements_checked: usize,
    pub stock_quantity: i64,
    pub discrepancy: Option<Discrepancy>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancy.is_none()
    }
}

/// Replay `movements` (oldest first) against `product`.
pub fn audit_chain(product: &Product, movements: &[Movement]) -> AuditReport {
    let mut report = AuditReport {
        product_code: product.code(),
        movements_checked: 0,
        stock_quantity: product.stock_quantity(),
        discrepancy: None,
    };

    let mut previous_after: Option<i64> = None;
    for m in movements {
        report.movements_checked += 1;

        if let Some(expected_before) = previous_after {
            if m.balance_before != expected_before {
                report.discrepancy = Some(Discrepancy::BrokenChain {
                    public_id: m.public_id,
                    expected_before,
                    actual_before: m.balance_before,
                });
                return report;
            }
        }

        match compute_new_balance(m.kind, m.product_code, m.balance_before, m.quantity) {
            Ok(expected_after) if expected_after != m.balance_after => {
                report.discrepancy = Some(Discrepancy::WrongBalance {
                    public_id: m.public_id,
                    expected_after,
                    actual_after: m.balance_after,
                });
                return report;
            }
            Ok(_) => {}
            Err(e) => {
                report.discrepancy = Some(Discrepancy::RejectedMovement {
                    public_id: m.public_id,
                    reason: e.to_string(),
                });
                return report;
            }
        }

        previous_after = Some(m.balance_after);
    }

    if let Some(last_after) = previous_after {
        if last_after != product.stock_quantity() {
            report.discrepancy = Some(Discrepancy::StockMismatch {
                expected: last_after,
                actual: product.stock_quantity(),
            });
        }
    }

    report
}
