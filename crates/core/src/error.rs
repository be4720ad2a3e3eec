//! Domain error model.

use thiserror::Error;

/// Result type used across the authorization engine.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Stores and provisioning workflows return these; the evaluator never does
/// (it degrades every failure to a denial).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input failed validation (empty screen selection, malformed email, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested row (invitation token, role, tenant) does not exist.
    #[error("not found")]
    NotFound,

    /// The operation conflicts with current state (already-used invitation,
    /// owner who already has a tenant, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A structural invariant was found violated (e.g. a custom role with no
    /// tenant). Unexpected; the operation is aborted.
    #[error("state invariant violated: {0}")]
    State(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The acting principal may not perform the operation.
    #[error("unauthorized")]
    Unauthorized,

    /// The backing store could not be used.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// True for failures the HTTP layer must not distinguish from one another
    /// (missing row vs. denied access).
    pub fn is_concealed(&self) -> bool {
        matches!(self, Self::NotFound | Self::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_and_unauthorized_are_concealed() {
        assert!(DomainError::not_found().is_concealed());
        assert!(DomainError::Unauthorized.is_concealed());
        assert!(!DomainError::conflict("used").is_concealed());
        assert!(!DomainError::validation("empty").is_concealed());
    }

    #[test]
    fn messages_carry_context() {
        let err = DomainError::validation("select at least one screen");
        assert_eq!(err.to_string(), "validation failed: select at least one screen");
    }
}
