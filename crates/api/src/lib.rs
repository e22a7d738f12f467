//! # StudentPocket App
//!
//! Application layer: the [`AppContext`] container, the command functions a
//! front end calls and logging setup.

pub mod commands;
pub mod context;
pub mod utils;

pub use context::{AppContext, ContextOptions};
pub use utils::logging::{init_logging, LoggingGuard};
