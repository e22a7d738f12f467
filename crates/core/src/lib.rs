//! # StudentPocket Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for every store the services touch
//! - The account security services: system key rotation, violation policy,
//!   credentials and sessions
//! - Per-feature user data, the vault guard and the support desk
//!
//! ## Architecture Principles
//! - Only depends on `pocket-common` and `pocket-domain`
//! - No database or platform code
//! - Time comes from an injected [`pocket_common::Clock`]

pub mod audit;
pub mod auth;
pub mod kv;
pub mod security;
pub mod support;
pub mod system_key;
pub mod user_data;
pub mod vault;

// Re-export specific items to avoid ambiguity
pub use audit::ports::ActivityLogRepository;
pub use audit::AuditTrail;
pub use auth::ports::{CredentialRepository, SessionRepository};
pub use auth::{CredentialService, RegistrationRequest, SessionService};
pub use kv::ports::{KeyValueStore, VersionedValue};
pub use security::ports::FailedLoginRepository;
pub use security::ViolationPolicy;
pub use support::ports::{ChangeRequestRepository, SupportTicketRepository};
pub use support::SupportDesk;
pub use system_key::ports::SystemConfigRepository;
pub use system_key::SystemKeyRotator;
pub use user_data::{ProfileStore, UserDataService};
pub use vault::{UnlockMethod, VaultGuard, VaultUnlock};
