use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Identifies which store call produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    InitSchema,
    SaveUrl,
    GetUrl,
    DeleteUrl,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "storage.connect",
            Operation::InitSchema => "storage.init_schema",
            Operation::SaveUrl => "storage.save_url",
            Operation::GetUrl => "storage.get_url",
            Operation::DeleteUrl => "storage.delete_url",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flavor of an opaque infrastructure failure.
///
/// Callers are expected to treat every [`StorageError::Storage`] the same way;
/// the kind only exists so logs can tell a stalled engine from a bad query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageFailure {
    Timeout,
    Cancelled,
    Unavailable,
    Query,
    InvalidData,
}

impl Display for StorageFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StorageFailure::Timeout => "timed out",
            StorageFailure::Cancelled => "cancelled",
            StorageFailure::Unavailable => "unavailable",
            StorageFailure::Query => "query failed",
            StorageFailure::InvalidData => "invalid data",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("{op}: url already exists for alias '{alias}'")]
    UrlExists { op: Operation, alias: String },
    #[error("{op}: url not found for alias '{alias}'")]
    UrlNotFound { op: Operation, alias: String },
    #[error("{op}: failed to connect to storage: {message}")]
    Connection { op: Operation, message: String },
    #[error("{op}: failed to initialize schema: {message}")]
    SchemaInit { op: Operation, message: String },
    #[error("{op}: storage {kind}: {message}")]
    Storage {
        op: Operation,
        kind: StorageFailure,
        message: String,
    },
}

impl StorageError {
    pub fn storage(op: Operation, kind: StorageFailure, message: impl Into<String>) -> Self {
        Self::Storage {
            op,
            kind,
            message: message.into(),
        }
    }

    /// The store call that failed.
    pub fn operation(&self) -> Operation {
        match self {
            StorageError::UrlExists { op, .. }
            | StorageError::UrlNotFound { op, .. }
            | StorageError::Connection { op, .. }
            | StorageError::SchemaInit { op, .. }
            | StorageError::Storage { op, .. } => *op,
        }
    }

    pub fn is_url_exists(&self) -> bool {
        matches!(self, StorageError::UrlExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::UrlNotFound { .. })
    }

    /// Returns the failure kind for catch-all infrastructure errors.
    pub fn storage_failure(&self) -> Option<StorageFailure> {
        match self {
            StorageError::Storage { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
