//! Support desk: profile change requests and support tickets.

pub mod ports;

use std::sync::Arc;

use pocket_common::Clock;
use pocket_domain::{
    ActivityAction, ChangeRequest, PocketError, ProfileField, RequestStatus, Result,
    SupportTicket, TicketReply, TicketStatus, UserProfile,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use self::ports::{ChangeRequestRepository, SupportTicketRepository};
use crate::audit::AuditTrail;
use crate::auth::validate_email;
use crate::user_data::ProfileStore;

/// Profile change requests and support tickets.
pub struct SupportDesk {
    requests: Arc<dyn ChangeRequestRepository>,
    tickets: Arc<dyn SupportTicketRepository>,
    profiles: ProfileStore,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
}

impl SupportDesk {
    /// Wire the desk to its repositories.
    pub fn new(
        requests: Arc<dyn ChangeRequestRepository>,
        tickets: Arc<dyn SupportTicketRepository>,
        profiles: ProfileStore,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { requests, tickets, profiles, audit, clock }
    }

    // ========================================================================
    // Change requests
    // ========================================================================

    /// Ask an admin to change a locked profile field.
    #[instrument(skip(self, value))]
    pub async fn submit_change(
        &self,
        username: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<ChangeRequest> {
        let value = value.trim();
        if value.is_empty() {
            return Err(PocketError::InvalidInput("requested value must not be empty".into()));
        }
        if field == ProfileField::Email {
            validate_email(value)?;
        }
        self.profiles.require(username).await?;

        let request = ChangeRequest::new(username, field, value, self.clock.now());
        self.requests.insert(&request).await?;
        self.audit
            .record(
                username,
                Some(username),
                ActivityAction::ChangeRequestSubmitted,
                format!("Requested {field} change"),
                Some(json!({ "request_id": request.id, "field": field })),
            )
            .await?;
        Ok(request)
    }

    /// Change requests, optionally filtered by status.
    pub async fn list_changes(&self, status: Option<RequestStatus>) -> Result<Vec<ChangeRequest>> {
        self.requests.list(status).await
    }

    /// A user's own change requests.
    pub async fn changes_for_user(&self, username: &str) -> Result<Vec<ChangeRequest>> {
        self.requests.list_for_user(username).await
    }

    /// Mark the request approved, then apply the requested value to the
    /// profile. Changing email or phone clears its verified flag.
    #[instrument(skip(self))]
    pub async fn approve_change(&self, id: Uuid, admin: &str) -> Result<UserProfile> {
        let request = self.pending_request(id).await?;
        self.profiles.require(&request.username).await?;
        let now = self.clock.now();

        // Resolve before applying: only a PENDING row moves.
        if !self.requests.resolve(id, RequestStatus::Approved, admin, now).await? {
            return Err(PocketError::InvalidInput(format!("change request {id} is not pending")));
        }

        let updated = self
            .profiles
            .update(&request.username, |profile| {
                match request.field {
                    ProfileField::Name => profile.name = request.requested_value.clone(),
                    ProfileField::Email => {
                        profile.email = request.requested_value.clone();
                        profile.email_verified = false;
                    }
                    ProfileField::Phone => {
                        profile.phone = request.requested_value.clone();
                        profile.phone_verified = false;
                    }
                }
                profile.updated_at = now;
                Ok(())
            })
            .await?;
        let Some((profile, ())) = updated else {
            return Err(PocketError::NotFound(format!("profile for '{}'", request.username)));
        };

        info!(%id, admin, username = %request.username, "change request approved");
        self.audit
            .record(
                admin,
                Some(&request.username),
                ActivityAction::ChangeRequestApproved,
                format!("Approved {} change", request.field),
                Some(json!({ "request_id": id })),
            )
            .await?;
        Ok(profile)
    }

    /// Mark a pending request rejected without touching the profile.
    #[instrument(skip(self))]
    pub async fn reject_change(&self, id: Uuid, admin: &str) -> Result<()> {
        let request = self.pending_request(id).await?;
        if !self.requests.resolve(id, RequestStatus::Rejected, admin, self.clock.now()).await? {
            return Err(PocketError::InvalidInput(format!("change request {id} is not pending")));
        }

        self.audit
            .record(
                admin,
                Some(&request.username),
                ActivityAction::ChangeRequestRejected,
                format!("Rejected {} change", request.field),
                Some(json!({ "request_id": id })),
            )
            .await
    }

    async fn pending_request(&self, id: Uuid) -> Result<ChangeRequest> {
        let request = self
            .requests
            .get(id)
            .await?
            .ok_or_else(|| PocketError::NotFound(format!("change request {id}")))?;
        if !request.is_pending() {
            return Err(PocketError::InvalidInput(format!(
                "change request {id} is already {}",
                request.status
            )));
        }
        Ok(request)
    }

    // ========================================================================
    // Tickets
    // ========================================================================

    /// Open a ticket with its first message.
    pub async fn open_ticket(&self, username: &str, subject: &str, message: &str) -> Result<SupportTicket> {
        let subject = subject.trim();
        if subject.is_empty() || message.trim().is_empty() {
            return Err(PocketError::InvalidInput("ticket subject and message are required".into()));
        }

        let ticket = SupportTicket::new(username, subject, message, self.clock.now());
        self.tickets.insert(&ticket).await?;
        self.audit
            .record(
                username,
                Some(username),
                ActivityAction::TicketOpened,
                format!("Opened ticket: {subject}"),
                Some(json!({ "ticket_id": ticket.id })),
            )
            .await?;
        Ok(ticket)
    }

    /// Append a reply. Replying to a closed ticket is rejected.
    pub async fn reply(&self, id: Uuid, author: &str, message: &str) -> Result<SupportTicket> {
        if message.trim().is_empty() {
            return Err(PocketError::InvalidInput("reply must not be empty".into()));
        }
        let mut ticket = self.ticket(id).await?;
        if ticket.status == TicketStatus::Closed {
            return Err(PocketError::InvalidInput(format!("ticket {id} is closed")));
        }

        let now = self.clock.now();
        ticket.replies.push(TicketReply {
            author: author.to_string(),
            message: message.to_string(),
            timestamp: now,
        });
        ticket.updated_at = now;
        self.tickets.update(&ticket).await?;

        self.audit
            .record(
                author,
                Some(&ticket.username),
                ActivityAction::TicketReplied,
                format!("Replied to ticket: {}", ticket.subject),
                Some(json!({ "ticket_id": id })),
            )
            .await?;
        Ok(ticket)
    }

    /// Move a ticket to `status` (admin).
    pub async fn set_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        actor: &str,
    ) -> Result<SupportTicket> {
        let mut ticket = self.ticket(id).await?;
        let previous = ticket.status;
        ticket.status = status;
        ticket.updated_at = self.clock.now();
        self.tickets.update(&ticket).await?;

        self.audit
            .record(
                actor,
                Some(&ticket.username),
                ActivityAction::TicketStatusChanged,
                format!("Ticket {previous} -> {status}"),
                Some(json!({ "ticket_id": id })),
            )
            .await?;
        Ok(ticket)
    }

    /// Tickets opened by `username`.
    pub async fn tickets_for_user(&self, username: &str) -> Result<Vec<SupportTicket>> {
        self.tickets.list_for_user(username).await
    }

    /// Every ticket, for the admin queue.
    pub async fn all_tickets(&self) -> Result<Vec<SupportTicket>> {
        self.tickets.list_all().await
    }

    /// Drop a user's requests and tickets (account deletion).
    pub async fn purge_user(&self, username: &str) -> Result<()> {
        self.requests.delete_for_user(username).await?;
        self.tickets.delete_for_user(username).await?;
        Ok(())
    }

    async fn ticket(&self, id: Uuid) -> Result<SupportTicket> {
        self.tickets
            .get(id)
            .await?
            .ok_or_else(|| PocketError::NotFound(format!("ticket {id}")))
    }
}
