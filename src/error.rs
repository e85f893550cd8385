//! Error types for the document store lifecycle manager.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Store-originated errors carry a namespace tag and a coarse code so callers can
//! tell data problems apart from infrastructure failures without inspecting the driver.

use std::time::Duration;
use thiserror::Error;

/// Namespace used for errors that did not originate in a store driver.
pub const STORE_NAMESPACE: &str = "STORE";

/// Coarse classification of a driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// The document was rejected by a validator.
    Validation,
    /// The document changed underneath the operation (version / write conflict).
    Version,
    /// Anything else the driver reports.
    Other,
}

impl StoreErrorKind {
    /// Error code exposed to callers for this classification.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "STORE.DATA",
            Self::Version => "STORE.DATA_VERSION",
            Self::Other => "DATABASE_ERROR",
        }
    }
}

impl std::fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection {
        message: String,
        suggestion: String,
        #[source]
        source: Option<Box<DbError>>,
    },

    #[error("Connection failed: missing {field}")]
    MissingConnectionField { field: &'static str },

    #[error("Store error [{namespace}]: {message}")]
    Store {
        /// e.g., "STORE.mongo"
        namespace: String,
        kind: StoreErrorKind,
        message: String,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Could not load model [{path}]: {message}")]
    ModelLoad { path: String, message: String },

    #[error("Model '{name}' is already registered")]
    DuplicateModel { name: String },

    #[error("Transaction error: {message} (transaction: {transaction_id})")]
    Transaction {
        message: String,
        transaction_id: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_ms}ms")]
    Timeout {
        operation: String,
        elapsed_ms: u64,
    },

    #[error("Store '{store}' is not connected")]
    NotConnected { store: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
            source: None,
        }
    }

    /// Create a connection error that wraps the driver failure behind it.
    pub fn connection_caused_by(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        cause: DbError,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Create a fast-fail error for a missing connection field.
    pub fn missing_connection_field(field: &'static str) -> Self {
        Self::MissingConnectionField { field }
    }

    /// Create a driver error tagged with the driver's namespace.
    pub fn store(
        namespace: impl Into<String>,
        kind: StoreErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Store {
            namespace: namespace.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create a model load error.
    pub fn model_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate model error.
    pub fn duplicate_model(name: impl Into<String>) -> Self {
        Self::DuplicateModel { name: name.into() }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
            transaction_id: transaction_id.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a not connected error.
    pub fn not_connected(store: impl Into<String>) -> Self {
        Self::NotConnected {
            store: store.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Namespace tag identifying where the error came from.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Store { namespace, .. } => namespace,
            _ => STORE_NAMESPACE,
        }
    }

    /// Coarse error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store { kind, .. } => kind.code(),
            Self::Connection { .. } | Self::MissingConnectionField { .. } => "STORE.CONNECTION",
            Self::Schema { .. } | Self::ModelLoad { .. } => "STORE.MODEL",
            Self::DuplicateModel { .. } => "STORE.DUPLICATE_MODEL",
            Self::Transaction { .. } => "STORE.TRANSACTION",
            Self::Timeout { .. } => "STORE.TIMEOUT",
            Self::NotConnected { .. } | Self::InvalidState { .. } => "STORE.STATE",
            Self::InvalidInput { .. } => "STORE.INVALID_INPUT",
            Self::Internal { .. } => "STORE.INTERNAL",
        }
    }

    /// Classification of a driver error, if this is one.
    pub fn store_kind(&self) -> Option<StoreErrorKind> {
        match self {
            Self::Store { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::MissingConnectionField { field } => Some(match *field {
                "hostname" => "Set 'hostname' or provide a full 'url'",
                "database" => "Set 'database' or provide a full 'url'",
                _ => "Provide a full 'url'",
            }),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Timeout { .. }
                | Self::Store {
                    kind: StoreErrorKind::Version,
                    ..
                }
        )
    }
}

/// Convert MongoDB driver errors to DbError.
#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        // Server codes: 121 DocumentValidationFailure, 112 WriteConflict
        let code = match err.kind.as_ref() {
            ErrorKind::Command(command) => Some(command.code),
            ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
            _ => None,
        };
        let kind = match code {
            Some(121) => StoreErrorKind::Validation,
            Some(112) => StoreErrorKind::Version,
            _ if err.contains_label("TransientTransactionError") => StoreErrorKind::Version,
            _ => StoreErrorKind::Other,
        };
        DbError::store("STORE.mongo", kind, err.to_string())
    }
}

/// Result type alias for store operations.
pub type DbResult<T> = Result<T, DbError>;
