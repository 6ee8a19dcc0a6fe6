//! Inventory domain module.
//!
//! This crate contains business rules for stock movements, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod audit;
pub mod balance;
pub mod kind;
pub mod movement;
pub mod product;
pub mod request;
pub mod seed;

pub use audit::{AuditReport, Discrepancy, audit_chain};
pub use balance::compute_new_balance;
pub use kind::MovementKind;
pub use movement::{Movement, NewMovement, RECENT_MOVEMENTS_LIMIT, sort_most_recent_first};
pub use product::Product;
pub use request::{MAX_DESCRIPTION_CHARS, MovementRequest, ValidatedMovement};
pub use seed::seed_catalog;
