//! # StudentPocket Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLCipher-backed repositories for every `pocket-core` port
//! - The database schema and migration runner
//! - Configuration loading (environment, `.env`, JSON/TOML files)
//! - Keyring-backed database key management
//!
//! ## Architecture
//! - Implements traits defined in `pocket-core`
//! - Depends on `pocket-common` for the connection pool
//! - Contains all "impure" code (I/O, keychain access)

pub mod config;
pub mod database;
pub mod errors;
pub mod key_manager;

// Re-export commonly used items
pub use database::*;
pub use errors::InfraError;
pub use key_manager::*;
