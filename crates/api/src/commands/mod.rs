//! Command layer - the surface a front end calls into
//!
//! Every command takes `&AppContext`, resolves the signed-in user from the
//! persisted session and returns a `pocket_domain::Result`.

pub mod admin;
pub mod auth;
pub mod health;
pub mod support;
pub mod user_data;
pub mod vault;

pub use admin::*;
pub use auth::*;
pub use health::*;
pub use support::*;
pub use user_data::*;
pub use vault::*;
