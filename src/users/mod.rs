//! Users
//!
//! Registration, authentication, and profile management.

mod repository;

pub use repository::{NewUser, UserRepository};
