//! User profile types
//!
//! The profile is the security-relevant part of a user's data: identity,
//! verification, quota and the violation/ban state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{BADGE_BANNED, BADGE_SECURITY_RISK};
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    #[default]
    #[serde(rename = "NONE")]
    Unverified,
    Pending,
    Verified,
}

impl_domain_status_conversions!(VerificationStatus {
    Unverified => "NONE",
    Pending => "PENDING",
    Verified => "VERIFIED",
});

/// User profile stored under `user:<username>:profile`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub phone_verified: bool,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub level: u32,
    pub storage_limit_bytes: u64,
    #[serde(default)]
    pub storage_used_bytes: u64,
    #[serde(default)]
    pub violation_count: u32,
    pub max_violations: u32,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub ban_reason: Option<String>,
    #[serde(default)]
    pub is_suspicious: bool,
    /// Insertion-ordered, no duplicates
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub vault_pin_hash: Option<String>,
    #[serde(default)]
    pub totp_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Fresh profile at level 1 with no violations.
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        storage_limit_bytes: u64,
        max_violations: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
            email: email.into(),
            phone: String::new(),
            email_verified: false,
            phone_verified: false,
            verification_status: VerificationStatus::Unverified,
            level: 1,
            storage_limit_bytes,
            storage_used_bytes: 0,
            violation_count: 0,
            max_violations,
            is_banned: false,
            ban_reason: None,
            is_suspicious: false,
            badges: Vec::new(),
            skills: Vec::new(),
            experience: 0,
            vault_pin_hash: None,
            totp_secret: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a badge unless already present. Returns whether it was added.
    pub fn add_badge(&mut self, badge: &str) -> bool {
        if self.badges.iter().any(|b| b == badge) {
            return false;
        }
        self.badges.push(badge.to_string());
        true
    }

    pub fn remove_badge(&mut self, badge: &str) -> bool {
        let before = self.badges.len();
        self.badges.retain(|b| b != badge);
        before != self.badges.len()
    }

    /// Apply the lockdown state: banned, suspicious, unverified, level zero.
    pub fn lock_down(&mut self, reason: &str, now: DateTime<Utc>) {
        self.is_banned = true;
        self.is_suspicious = true;
        self.ban_reason = Some(reason.to_string());
        self.verification_status = VerificationStatus::Unverified;
        self.email_verified = false;
        self.phone_verified = false;
        self.level = 0;
        self.add_badge(BADGE_BANNED);
        self.add_badge(BADGE_SECURITY_RISK);
        self.updated_at = now;
    }

    /// Bytes still available under the quota
    pub fn storage_available(&self) -> u64 {
        self.storage_limit_bytes.saturating_sub(self.storage_used_bytes)
    }
}

/// Result of recording a violation against an existing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationOutcome {
    pub violation_count: u32,
    pub max_violations: u32,
    pub locked_down: bool,
}
