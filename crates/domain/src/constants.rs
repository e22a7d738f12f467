//! Application constants
//!
//! Centralized location for domain-level defaults, badge names and storage
//! key fragments.

// Storage keys
pub const USER_KEY_PREFIX: &str = "user:";
pub const PROFILE_SEGMENT: &str = "profile";
pub const SYSTEM_KEY_ID: &str = "system_key";

// Security policy defaults
pub const DEFAULT_MAX_VIOLATIONS: u32 = 3;
pub const DEFAULT_MAX_FAILED_LOGINS: u32 = 3;
pub const DEFAULT_UPDATE_RETRIES: u32 = 5;
pub const FAILED_LOGIN_LOCKDOWN_REASON: &str = "Excessive failed login attempts";
pub const INVALID_VAULT_PIN_REASON: &str = "Invalid vault PIN";

// Badges
pub const BADGE_BANNED: &str = "BANNED";
pub const BADGE_SECURITY_RISK: &str = "SECURITY_RISK";

// System key rotation
pub const DEFAULT_KEY_ACTIVE_SECS: u64 = 300;
pub const DEFAULT_KEY_COOLDOWN_SECS: u64 = 60;
pub const MAX_KEY_PHASE_SECS: u64 = 24 * 60 * 60;
pub const SYSTEM_KEY_PIN_LENGTH: usize = 6;
pub const SYSTEM_KEY_PREFIXES: [&str; 3] = ["SYS", "ADM", "ARC"];

// Sessions
pub const DEFAULT_SESSION_TTL_SECS: u64 = 12 * 60 * 60;
pub const MAX_SESSION_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

// Storage quota (100 MiB)
pub const DEFAULT_STORAGE_LIMIT_BYTES: u64 = 100 * 1024 * 1024;

// Credential rules
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 32;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const VAULT_PIN_MIN_LENGTH: usize = 4;
pub const VAULT_PIN_MAX_LENGTH: usize = 8;

// Audit actors
pub const SYSTEM_ACTOR: &str = "system";
