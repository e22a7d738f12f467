//! Audit log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an audit entry records. Unknown codes read back as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityAction {
    Register,
    Login,
    Logout,
    LoginFailed,
    PasswordChange,
    AccountDeleted,
    AccountSeeded,
    SecurityViolation,
    SecurityLockdown,
    BanLifted,
    KeyRotated,
    VaultPinSet,
    VaultUnlocked,
    VaultOverride,
    VaultDocumentStored,
    VaultDocumentRemoved,
    ChangeRequestSubmitted,
    ChangeRequestApproved,
    ChangeRequestRejected,
    TicketOpened,
    TicketReplied,
    TicketStatusChanged,
    Other(String),
}

impl ActivityAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Register => "REGISTER",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::PasswordChange => "PASSWORD_CHANGE",
            Self::AccountDeleted => "ACCOUNT_DELETED",
            Self::AccountSeeded => "ACCOUNT_SEEDED",
            Self::SecurityViolation => "SECURITY_VIOLATION",
            Self::SecurityLockdown => "SECURITY_LOCKDOWN",
            Self::BanLifted => "BAN_LIFTED",
            Self::KeyRotated => "KEY_ROTATED",
            Self::VaultPinSet => "VAULT_PIN_SET",
            Self::VaultUnlocked => "VAULT_UNLOCKED",
            Self::VaultOverride => "VAULT_OVERRIDE",
            Self::VaultDocumentStored => "VAULT_DOCUMENT_STORED",
            Self::VaultDocumentRemoved => "VAULT_DOCUMENT_REMOVED",
            Self::ChangeRequestSubmitted => "CHANGE_REQUEST_SUBMITTED",
            Self::ChangeRequestApproved => "CHANGE_REQUEST_APPROVED",
            Self::ChangeRequestRejected => "CHANGE_REQUEST_REJECTED",
            Self::TicketOpened => "TICKET_OPENED",
            Self::TicketReplied => "TICKET_REPLIED",
            Self::TicketStatusChanged => "TICKET_STATUS_CHANGED",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for ActivityAction {
    fn from(code: String) -> Self {
        match code.as_str() {
            "REGISTER" => Self::Register,
            "LOGIN" => Self::Login,
            "LOGOUT" => Self::Logout,
            "LOGIN_FAILED" => Self::LoginFailed,
            "PASSWORD_CHANGE" => Self::PasswordChange,
            "ACCOUNT_DELETED" => Self::AccountDeleted,
            "ACCOUNT_SEEDED" => Self::AccountSeeded,
            "SECURITY_VIOLATION" => Self::SecurityViolation,
            "SECURITY_LOCKDOWN" => Self::SecurityLockdown,
            "BAN_LIFTED" => Self::BanLifted,
            "KEY_ROTATED" => Self::KeyRotated,
            "VAULT_PIN_SET" => Self::VaultPinSet,
            "VAULT_UNLOCKED" => Self::VaultUnlocked,
            "VAULT_OVERRIDE" => Self::VaultOverride,
            "VAULT_DOCUMENT_STORED" => Self::VaultDocumentStored,
            "VAULT_DOCUMENT_REMOVED" => Self::VaultDocumentRemoved,
            "CHANGE_REQUEST_SUBMITTED" => Self::ChangeRequestSubmitted,
            "CHANGE_REQUEST_APPROVED" => Self::ChangeRequestApproved,
            "CHANGE_REQUEST_REJECTED" => Self::ChangeRequestRejected,
            "TICKET_OPENED" => Self::TicketOpened,
            "TICKET_REPLIED" => Self::TicketReplied,
            "TICKET_STATUS_CHANGED" => Self::TicketStatusChanged,
            _ => Self::Other(code),
        }
    }
}

impl From<ActivityAction> for String {
    fn from(action: ActivityAction) -> Self {
        match action {
            ActivityAction::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Username or `system`
    pub actor: String,
    pub target_user: Option<String>,
    pub action: ActivityAction,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
}

impl ActivityLog {
    pub fn new(
        actor: impl Into<String>,
        action: ActivityAction,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp,
            actor: actor.into(),
            target_user: None,
            action,
            description: description.into(),
            metadata: None,
        }
    }

    pub fn for_user(mut self, username: impl Into<String>) -> Self {
        self.target_user = Some(username.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
