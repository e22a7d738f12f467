//! Composite key naming for the key-value store.
//!
//! Every user-owned value lives under `user:<username>:`, so deleting an
//! account is a single prefix delete.

use crate::constants::{PROFILE_SEGMENT, USER_KEY_PREFIX};
use crate::types::Feature;

/// `user:<username>:`
pub fn user_prefix(username: &str) -> String {
    format!("{USER_KEY_PREFIX}{username}:")
}

/// `user:<username>:profile`
pub fn profile_key(username: &str) -> String {
    format!("{}{PROFILE_SEGMENT}", user_prefix(username))
}

/// `user:<username>:<feature>`
pub fn feature_key(username: &str, feature: Feature) -> String {
    format!("{}{}", user_prefix(username), feature.as_str())
}

/// Extract the username from a profile key, if it is one.
pub fn username_from_profile_key(key: &str) -> Option<&str> {
    key.strip_prefix(USER_KEY_PREFIX)?.strip_suffix(PROFILE_SEGMENT)?.strip_suffix(':')
}
