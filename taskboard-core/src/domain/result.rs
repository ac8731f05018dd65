//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Each variant corresponds to one failure class of the API surface; the
/// `status`/`delete_status` methods give the HTTP codes the handlers map
/// them to. Store failures are 400 on read and write paths but 500 on
/// delete paths, matching the original surface.
#[derive(Error, Debug)]
pub enum Error {
    /// A required body field is missing or malformed. The payload is the
    /// caller-facing message (e.g. "name and deadline are required").
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist, e.g. assigning a task to an
    /// unknown user. The payload is the referencing field name.
    #[error("{0} not found")]
    Reference(String),

    /// A unique constraint was violated. The payload is the field, so the
    /// message reads "Email already exists".
    #[error("{0} already exists")]
    UniqueConstraint(String),

    /// The addressed entity id does not resolve. The payload is the
    /// entity kind ("Task" or "User").
    #[error("{0} not found")]
    NotFound(String),

    /// Underlying persistence failure during a read or compensating write.
    #[error("Store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a reference error for the given field
    pub fn reference(field: impl Into<String>) -> Self {
        Self::Reference(field.into())
    }

    /// Create a unique-constraint error for the given field
    pub fn unique(field: impl Into<String>) -> Self {
        Self::UniqueConstraint(field.into())
    }

    /// Create a not-found error for the given entity kind
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// HTTP status for read, create and update paths
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            _ => 400,
        }
    }

    /// HTTP status for delete paths, where store failures are server errors
    pub fn delete_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Store(_) | Self::Json(_) => 500,
            _ => 400,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Response envelope shared by every API operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Create a successful envelope
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an envelope with no data (deletes, errors)
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

impl Envelope<serde_json::Value> {
    /// Envelope for a failed read/create/update path
    ///
    /// Typed errors carry their own caller-facing message; store-layer
    /// failures collapse to "Bad Request" with the detail in `data`,
    /// matching the original catch-all.
    pub fn failure(err: &Error) -> Self {
        match err {
            Error::Store(detail) => Self {
                message: "Bad Request".to_string(),
                data: Some(serde_json::Value::String(detail.clone())),
            },
            Error::Json(e) => Self {
                message: "Bad Request".to_string(),
                data: Some(serde_json::Value::String(e.to_string())),
            },
            other => Self::empty(other.to_string()),
        }
    }

    /// Envelope for a failed delete path ("Server Error" on store failures)
    pub fn delete_failure(err: &Error) -> Self {
        match err {
            Error::Store(detail) => Self {
                message: "Server Error".to_string(),
                data: Some(serde_json::Value::String(detail.clone())),
            },
            Error::Json(e) => Self {
                message: "Server Error".to_string(),
                data: Some(serde_json::Value::String(e.to_string())),
            },
            other => Self::empty(other.to_string()),
        }
    }
}
