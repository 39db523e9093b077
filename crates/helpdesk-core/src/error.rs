//! Error types for help desk operations.

use thiserror::Error;

/// Errors returned by every [`HelpDesk`](crate::HelpDesk) operation.
///
/// Every variant except `Storage` is raised before the operation writes
/// anything. A `Storage` failure inside a transaction rolls the whole
/// operation back.
#[derive(Debug, Error)]
pub enum HelpDeskError {
    /// Missing or malformed input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Unknown user, article, group or role assignment.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller lacks the role, admin right, grant or membership required.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Duplicate username, role already held, account already bootstrapped.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unknown username or wrong secret; callers cannot tell which.
    #[error("invalid username or secret")]
    AuthFailure,

    /// A one-time secret or invitation code past its expiry.
    #[error("{0} has expired")]
    Expired(&'static str),

    /// No invitation code with that value exists.
    #[error("invitation code is not valid")]
    InvalidCode,

    /// The invitation code was consumed earlier.
    #[error("invitation code has already been used")]
    AlreadyUsed,

    /// Database or crypto failure.
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),

    /// A backup snapshot that cannot be read back.
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for HelpDeskError {
    fn from(e: rusqlite::Error) -> Self {
        HelpDeskError::Storage(e.into())
    }
}

/// Coarse classification for callers that only branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthorized,
    Conflict,
    Storage,
}

impl HelpDeskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HelpDeskError::Validation(_)
            | HelpDeskError::AuthFailure
            | HelpDeskError::Expired(_)
            | HelpDeskError::InvalidCode
            | HelpDeskError::Corrupt(_) => ErrorKind::Validation,
            HelpDeskError::NotFound(_) => ErrorKind::NotFound,
            HelpDeskError::Unauthorized(_) => ErrorKind::Unauthorized,
            HelpDeskError::Conflict(_) | HelpDeskError::AlreadyUsed => ErrorKind::Conflict,
            HelpDeskError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Result type for help desk operations.
pub type Result<T> = std::result::Result<T, HelpDeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redemption_errors_classify() {
        assert_eq!(HelpDeskError::AlreadyUsed.kind(), ErrorKind::Conflict);
        assert_eq!(HelpDeskError::InvalidCode.kind(), ErrorKind::Validation);
        assert_eq!(HelpDeskError::Expired("invitation code").kind(), ErrorKind::Validation);
    }

    #[test]
    fn storage_wraps_sqlite() {
        let err: HelpDeskError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().starts_with("storage failure"));
    }
}
