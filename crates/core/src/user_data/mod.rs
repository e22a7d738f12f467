//! Per-user data: the profile and the feature collections.

mod profile;
mod service;

pub use profile::ProfileStore;
pub use service::UserDataService;
