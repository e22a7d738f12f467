//! Infrastructure error conversions

mod conversions;

pub use conversions::InfraError;
pub(crate) use conversions::{is_unique_violation, map_join_error, map_storage_error};
