//! # StudentPocket Domain
//!
//! Business domain types and models for StudentPocket.
//!
//! This crate contains:
//! - Profiles, per-feature records, audit log entries and the system key state
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Storage key naming
//!
//! ## Architecture
//! - No dependencies on other StudentPocket crates
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod keys;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
