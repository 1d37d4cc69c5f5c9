//! Account store
//!
//! Per-user, per-currency accounts.

mod repository;

pub use repository::AccountRepository;
