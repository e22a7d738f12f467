//! Domain types and models

pub mod activity;
pub mod auth;
pub mod records;
pub mod support;
pub mod system_key;
pub mod user;

pub use activity::{ActivityAction, ActivityLog};
pub use auth::{CredentialRecord, Role, Session};
pub use records::{
    Assignment, AssignmentPriority, AttendanceRecord, AttendanceStatus, CampusNode, Feature,
    FeatureCollection, FeatureRecord, GradeRecord, JournalEntry, Note, VaultDocument,
};
pub use support::{ChangeRequest, ProfileField, RequestStatus, SupportTicket, TicketReply, TicketStatus};
pub use system_key::{KeyStatus, SystemKeyCodes, SystemKeyState};
pub use user::{UserProfile, VerificationStatus, ViolationOutcome};
