//! Late-payment interest module.
//!
//! Simple daily interest on overdue amounts, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). The clock is
//! passed in by the caller.

pub mod late_fee;

pub use late_fee::{DUE_DATE_FORMAT, LateFeePolicy, LateFeeQuote, parse_due_date, quote_late_fee};
