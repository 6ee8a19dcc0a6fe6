//! Sales commission module.
//!
//! Tiered commission rules implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod commission;

pub use commission::{
    CommissionLine, CommissionRates, MAX_SELLER_CHARS, Sale, SellerCommission, calculate_commissions,
};
