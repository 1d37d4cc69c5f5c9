//! Command handlers
//!
//! Commands describe intended state changes; handlers execute them against
//! the repositories.

mod commands;
mod operation_handler;

pub use commands::{OperationCommand, OperationResult};
pub use operation_handler::OperationHandler;
