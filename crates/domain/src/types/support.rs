//! Profile change requests and support tickets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;

/// Profile fields a student may ask an admin to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileField {
    Name,
    Email,
    Phone,
}

impl_domain_status_conversions!(ProfileField {
    Name => "name",
    Email => "email",
    Phone => "phone",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl_domain_status_conversions!(RequestStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: Uuid,
    pub username: String,
    pub field: ProfileField,
    pub requested_value: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

impl ChangeRequest {
    pub fn new(
        username: impl Into<String>,
        field: ProfileField,
        requested_value: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            field,
            requested_value: requested_value.into(),
            status: RequestStatus::Pending,
            created_at,
            resolved_at: None,
            resolved_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    Resolved,
    Closed,
}

impl_domain_status_conversions!(TicketStatus {
    Open => "OPEN",
    Resolved => "RESOLVED",
    Closed => "CLOSED",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReply {
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: Uuid,
    pub username: String,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    #[serde(default)]
    pub replies: Vec<TicketReply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupportTicket {
    pub fn new(
        username: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            subject: subject.into(),
            message: message.into(),
            status: TicketStatus::Open,
            replies: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }
}
