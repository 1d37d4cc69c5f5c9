//! Ledger
//!
//! The append-only operation log paired with the balances it aggregates.

mod repository;

pub use repository::Ledger;
