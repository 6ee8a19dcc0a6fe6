//! HTTP API for the stock ledger plus the commission and late-fee calculators.

pub mod app;
pub mod config;
pub mod middleware;
