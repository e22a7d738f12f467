//! Local credentials and the device session.

pub mod ports;

mod credentials;
mod session;
mod validation;

pub use credentials::{CredentialService, RegistrationRequest};
pub use session::SessionService;
pub use validation::{normalize_username, validate_email, validate_password, validate_username};
