//! Column encoding shared by the SQLCipher repositories.
//!
//! Timestamps are stored as epoch milliseconds, identifiers as hyphenated
//! UUID text and enums as their domain codes. Decoding failures surface as
//! `FromSqlConversionFailure` so a corrupt row never becomes a default value.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| conversion_error(column, Type::Integer, format!("timestamp out of range: {millis}")))
}

pub(crate) fn from_optional_millis(
    column: usize,
    millis: Option<i64>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    millis.map(|value| from_millis(column, value)).transpose()
}

pub(crate) fn parse_uuid(column: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| conversion_error(column, Type::Text, format!("invalid id '{raw}': {e}")))
}

/// Parse a stored domain code (`PENDING`, `ADMIN`, ...).
pub(crate) fn parse_code<T>(column: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|e| conversion_error(column, Type::Text, e.to_string()))
}

pub(crate) fn parse_json<T: DeserializeOwned>(column: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| conversion_error(column, Type::Text, e.to_string()))
}

/// Saturating conversion for `LIMIT` parameters
pub(crate) fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn count_to_u32(column: usize, value: i64) -> rusqlite::Result<u32> {
    u32::try_from(value)
        .map_err(|_| conversion_error(column, Type::Integer, format!("count out of range: {value}")))
}

fn conversion_error(column: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, ty, message.into())
}
