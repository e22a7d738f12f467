//! Conversions from external infrastructure errors into domain errors.

use keyring::Error as KeyringError;
use pocket_common::storage::StorageError;
use pocket_domain::PocketError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub PocketError);

impl From<InfraError> for PocketError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<PocketError> for InfraError {
    fn from(value: PocketError) -> Self {
        InfraError(value)
    }
}

trait IntoPocketError {
    fn into_pocket(self) -> PocketError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → PocketError */
/* -------------------------------------------------------------------------- */

const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;

impl IntoPocketError for SqlError {
    fn into_pocket(self) -> PocketError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        fn looks_like_wrong_key(message: &str) -> bool {
            let lower = message.to_ascii_lowercase();
            lower.contains("not a database") || lower.contains("encrypted")
        }

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => PocketError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        PocketError::Database("database is locked".into())
                    }
                    (
                        ErrorCode::ConstraintViolation,
                        SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY,
                    ) => PocketError::Conflict("unique constraint violation".into()),
                    (ErrorCode::ConstraintViolation, SQLITE_CONSTRAINT_FOREIGNKEY) => {
                        PocketError::Database("foreign key constraint violation".into())
                    }
                    (_, _) if looks_like_wrong_key(&message) => PocketError::Security(
                        "SQLCipher key rejected or database not encrypted".into(),
                    ),
                    _ => PocketError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => PocketError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(column, _, cause) => {
                PocketError::Database(format!("invalid stored value in column {column}: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                PocketError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::Utf8Error(_) => PocketError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidPath(path) => PocketError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => PocketError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_pocket())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → PocketError */
/* -------------------------------------------------------------------------- */

impl IntoPocketError for StorageError {
    fn into_pocket(self) -> PocketError {
        match self {
            StorageError::WrongKeyOrNotEncrypted => {
                PocketError::Security("sqlcipher key rejected or database not encrypted".into())
            }
            StorageError::Timeout(seconds) => {
                PocketError::Database(format!("database timeout after {seconds}s"))
            }
            StorageError::Rusqlite(sql_err) => sql_err.into_pocket(),
            StorageError::SerdeJson(json_err) => PocketError::Serialization(json_err.to_string()),
            StorageError::Connection(message)
            | StorageError::Query(message)
            | StorageError::Encryption(message)
            | StorageError::Migration(message)
            | StorageError::InvalidConfig(message) => PocketError::Database(message),
            StorageError::Common(common_err) => PocketError::Database(common_err.to_string()),
            StorageError::R2d2(r2d2_err) => PocketError::Database(r2d2_err.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_pocket())
    }
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → PocketError */
/* -------------------------------------------------------------------------- */

impl IntoPocketError for KeyringError {
    fn into_pocket(self) -> PocketError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => PocketError::NotFound("keychain entry not found".into()),
            BadEncoding(_) => {
                PocketError::Security("credential in keychain is not valid UTF-8".into())
            }
            TooLong(name, limit) => PocketError::Security(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            Invalid(attr, reason) => {
                PocketError::Security(format!("keychain attribute '{attr}' is invalid: {reason}"))
            }
            PlatformFailure(err) => PocketError::Security(format!("keychain platform error: {err}")),
            NoStorageAccess(err) => {
                PocketError::Security(format!("unable to access secure storage: {err}"))
            }
            _ => PocketError::Security(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_pocket())
    }
}

/* -------------------------------------------------------------------------- */
/* Repository helpers */
/* -------------------------------------------------------------------------- */

pub(crate) fn map_storage_error(err: StorageError) -> PocketError {
    PocketError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: JoinError) -> PocketError {
    if err.is_cancelled() {
        PocketError::Internal("blocking database task cancelled".into())
    } else {
        PocketError::Internal(format!("blocking database task failed: {err}"))
    }
}

/// Primary-key or unique-index collision
pub(crate) fn is_unique_violation(err: &StorageError) -> bool {
    match err {
        StorageError::Rusqlite(SqlError::SqliteFailure(inner, _)) => matches!(
            inner.extended_code,
            SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY
        ),
        _ => false,
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
