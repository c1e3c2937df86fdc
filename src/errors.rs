//! Error types for the draftpress application.
//!
//! This module defines the error types that categorize the failures that can
//! occur while managing drafts locally and publishing them to a remote store.

use std::{fmt, io};

use thiserror::Error;

/// Classification of a failed remote call.
///
/// The kind is decided once, where the transport turns a response into an
/// error, and everything downstream switches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The requested path does not exist on the remote store.
    NotFound,
    /// The credential was missing or rejected.
    Unauthorized,
    /// The credential lacks permission for the operation.
    Forbidden,
    /// The expected content hash was stale.
    Conflict,
    /// Network failure or any other unexpected response.
    Transport,
}

impl RemoteErrorKind {
    /// Credential problems abort a whole batch rather than a single item.
    pub fn is_auth(self) -> bool {
        matches!(self, RemoteErrorKind::Unauthorized | RemoteErrorKind::Forbidden)
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::Unauthorized => "unauthorized",
            RemoteErrorKind::Forbidden => "forbidden",
            RemoteErrorKind::Conflict => "conflict",
            RemoteErrorKind::Transport => "transport",
        };
        f.write_str(label)
    }
}

/// A failed call to the remote file store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transport, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RemoteErrorKind::NotFound
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::transport(err.to_string())
    }
}

/// The main error type for the draftpress application.
#[derive(Error, Debug)]
pub enum DraftError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A draft is missing a title or a body.
    #[error("{message}")]
    Validation { message: String },

    /// Draft was not found when performing an operation.
    #[error("Draft not found: {id}")]
    DraftNotFound { id: String },

    /// A call to the remote store failed.
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Another publish is still running.
    #[error("A publish is already in progress")]
    PublishInProgress,

    /// A draft is being edited, which blocks delete and publish.
    #[error("Draft {id} is being edited; finish or cancel the edit first")]
    EditLocked { id: String },

    /// A confirmation is already waiting for an answer.
    #[error("Another action is waiting for confirmation")]
    ConfirmationPending,

    #[error("{message}")]
    EditorError { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}

impl DraftError {
    pub fn validation(message: impl Into<String>) -> Self {
        DraftError::Validation {
            message: message.into(),
        }
    }
}
