//! Conversions from external infrastructure errors into domain errors.

use harvester_common::error::ErrorClassification;
use harvester_common::storage::StorageError;
use harvester_domain::HarvestError;
use rusqlite::Error as SqlError;
use tracing::debug;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub HarvestError);

impl From<InfraError> for HarvestError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<HarvestError> for InfraError {
    fn from(value: HarvestError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoHarvestError {
    fn into_harvest(self) -> HarvestError;
}

/* -------------------------------------------------------------------------- */
/* StorageError → HarvestError */
/* -------------------------------------------------------------------------- */

impl IntoHarvestError for StorageError {
    fn into_harvest(self) -> HarvestError {
        if self.is_connection_failure() || self.is_retryable() {
            debug!(severity = %self.severity(), error = %self, "store unavailable");
            return HarvestError::StoreUnavailable(self.to_string());
        }

        match self {
            StorageError::InvalidConfig(message) => HarvestError::Config(message),
            StorageError::SchemaVersionMismatch { expected, found } => HarvestError::Database(
                format!("schema version {found} is newer than supported version {expected}"),
            ),
            StorageError::Rusqlite(err) => err.into_harvest(),
            other => HarvestError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_harvest())
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → HarvestError */
/* -------------------------------------------------------------------------- */

impl IntoHarvestError for SqlError {
    fn into_harvest(self) -> HarvestError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (
                        ErrorCode::DatabaseBusy
                        | ErrorCode::DatabaseLocked
                        | ErrorCode::CannotOpen
                        | ErrorCode::NotADatabase
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::DiskFull,
                        _,
                    ) => HarvestError::StoreUnavailable(format!("{:?}: {message}", err.code)),
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        HarvestError::Database(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, _) => {
                        HarvestError::Database(format!("constraint violation: {message}"))
                    }
                    _ => HarvestError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                HarvestError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::IntegralValueOutOfRange(column, value) => {
                HarvestError::Database(format!("value {value} out of range in column {column}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                HarvestError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::Utf8Error(..) => HarvestError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidPath(path) => HarvestError::StoreUnavailable(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => HarvestError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_harvest())
    }
}

/* -------------------------------------------------------------------------- */
/* Configuration parse errors → HarvestError */
/* -------------------------------------------------------------------------- */

impl IntoHarvestError for toml::de::Error {
    fn into_harvest(self) -> HarvestError {
        HarvestError::Config(format!("Invalid TOML format: {}", self.message()))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(value.into_harvest())
    }
}

impl IntoHarvestError for serde_json::Error {
    fn into_harvest(self) -> HarvestError {
        HarvestError::Config(format!("Invalid JSON format: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_harvest())
    }
}

/// Map a storage-layer failure into the domain error
pub fn map_storage_error(err: StorageError) -> HarvestError {
    InfraError::from(err).into()
}

/// Map a rusqlite failure into the domain error
pub fn map_sql_error(err: SqlError) -> HarvestError {
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
