//! Rotating system key state (singleton)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SYSTEM_KEY_PREFIXES;
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyStatus {
    Active,
    Cooldown,
}

impl_domain_status_conversions!(KeyStatus {
    Active => "ACTIVE",
    Cooldown => "COOLDOWN",
});

/// The three accepted spellings of a pin: `SYS-`, `ADM-` and `ARC-` prefixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemKeyCodes {
    pub sys: String,
    pub adm: String,
    pub arc: String,
}

impl SystemKeyCodes {
    pub fn derive(pin: &str) -> Self {
        let [sys, adm, arc] = SYSTEM_KEY_PREFIXES.map(|prefix| format!("{prefix}-{pin}"));
        Self { sys, adm, arc }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [self.sys.as_str(), self.adm.as_str(), self.arc.as_str()].into_iter()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.iter().any(|code| code == candidate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemKeyState {
    /// Six decimal digits
    pub pin: String,
    /// `None` while cooling down
    pub codes: Option<SystemKeyCodes>,
    pub status: KeyStatus,
    pub phase_started_at: DateTime<Utc>,
}

impl SystemKeyState {
    /// New ACTIVE phase for `pin` starting at `at`.
    pub fn active(pin: impl Into<String>, at: DateTime<Utc>) -> Self {
        let pin = pin.into();
        let codes = Some(SystemKeyCodes::derive(&pin));
        Self { pin, codes, status: KeyStatus::Active, phase_started_at: at }
    }

    /// Same pin, codes withdrawn, COOLDOWN starting at `at`.
    pub fn cooldown(pin: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { pin: pin.into(), codes: None, status: KeyStatus::Cooldown, phase_started_at: at }
    }

    pub fn is_active(&self) -> bool {
        self.status == KeyStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_three_prefixed_codes() {
        let codes = SystemKeyCodes::derive("123456");
        assert_eq!(codes.iter().collect::<Vec<_>>(), vec!["SYS-123456", "ADM-123456", "ARC-123456"]);
        assert!(codes.matches("ADM-123456"));
        assert!(!codes.matches("123456"));
    }

    #[test]
    fn cooldown_has_no_codes() {
        let state = SystemKeyState::cooldown("123456", Utc::now());
        assert!(state.codes.is_none());
        assert!(!state.is_active());
    }
}
