use crate::services::content_store::StorageError;
use std::fmt;

/// Broad category of a command failure, used to pick the operator message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The install or the arguments do not allow the command to run.
    Precondition,
    /// The addressed site or network does not exist.
    NotFound,
    /// The operator declined the confirmation prompt.
    Aborted,
    Internal,
}

/// A lightweight wrapper for command errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific kind and message.
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
        }
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Precondition, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let kind = match &err {
            StorageError::SiteExists { domain, path } => {
                tracing::debug!("site address {}{} is taken", domain, path);
                ErrorKind::Precondition
            }
            StorageError::UserCreation(login) => {
                tracing::debug!("login {} could not be created", login);
                ErrorKind::Precondition
            }
            StorageError::NotMultisite
            | StorageError::ReservedSlug(_)
            | StorageError::UnsupportedLocator(_) => ErrorKind::Precondition,
            StorageError::SiteNotFound(lookup) => {
                tracing::debug!("no site matches {}", lookup);
                ErrorKind::NotFound
            }
            StorageError::NetworkNotFound(_) => ErrorKind::NotFound,
            StorageError::Fetch(_) | StorageError::Sqlx(_) | StorageError::Io(_) => {
                ErrorKind::Internal
            }
        };
        AppError::new(kind, err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(err.to_string())
    }
}
