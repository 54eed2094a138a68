//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be at most {max} characters, got {actual}")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates a too-long validation error.
    pub fn too_long(field: impl Into<String>, max: usize, actual: usize) -> Self {
        ValidationError::TooLong {
            field: field.into(),
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }

    /// Checks a required text field against a maximum length.
    pub fn check_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::empty_field(field));
        }
        let len = value.chars().count();
        if len > max {
            return Err(ValidationError::too_long(field, max, len));
        }
        Ok(())
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    DiscussionNotFound,
    VotingSessionNotFound,
    ActionNotFound,
    UserNotFound,
    PartyNotFound,
    CompanyNotFound,

    // State errors
    InvalidStateTransition,
    Conflict,

    // Authorization errors
    Forbidden,

    // Action dispatch errors
    MalformedPayload,

    // Infrastructure errors
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// Returns true for the not-found family of codes.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ErrorCode::DiscussionNotFound
                | ErrorCode::VotingSessionNotFound
                | ErrorCode::ActionNotFound
                | ErrorCode::UserNotFound
                | ErrorCode::PartyNotFound
                | ErrorCode::CompanyNotFound
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::DiscussionNotFound => "DISCUSSION_NOT_FOUND",
            ErrorCode::VotingSessionNotFound => "VOTING_SESSION_NOT_FOUND",
            ErrorCode::ActionNotFound => "ACTION_NOT_FOUND",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::PartyNotFound => "PARTY_NOT_FOUND",
            ErrorCode::CompanyNotFound => "COMPANY_NOT_FOUND",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::MalformedPayload => "MALFORMED_PAYLOAD",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
///
/// Ports and adapters speak `DomainError`; application handlers translate it
/// into the richer `GovernanceError` before it reaches a caller.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a database error, prefixing the failed operation.
    pub fn database(operation: &str, err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, format!("{}: {}", operation, err))
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("subject");
        assert_eq!(format!("{}", err), "Field 'subject' cannot be empty");
    }

    #[test]
    fn validation_error_too_long_displays_correctly() {
        let err = ValidationError::too_long("subject", 200, 250);
        assert_eq!(
            format!("{}", err),
            "Field 'subject' must be at most 200 characters, got 250"
        );
    }

    #[test]
    fn check_text_rejects_blank_and_oversized_values() {
        assert!(ValidationError::check_text("name", "ok", 10).is_ok());
        assert_eq!(
            ValidationError::check_text("name", "   ", 10),
            Err(ValidationError::empty_field("name"))
        );
        assert_eq!(
            ValidationError::check_text("name", "abcdef", 5),
            Err(ValidationError::too_long("name", 5, 6))
        );
    }

    #[test]
    fn check_text_counts_characters_not_bytes() {
        assert!(ValidationError::check_text("name", "вече", 4).is_ok());
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::DiscussionNotFound, "Discussion not found");
        assert_eq!(format!("{}", err), "[DISCUSSION_NOT_FOUND] Discussion not found");
    }

    #[test]
    fn domain_error_with_detail_adds_detail() {
        let err = DomainError::new(ErrorCode::Conflict, "Status changed")
            .with_detail("expected", "VOTING");
        assert_eq!(err.details.get("expected"), Some(&"VOTING".to_string()));
    }

    #[test]
    fn not_found_family_is_recognised() {
        assert!(ErrorCode::PartyNotFound.is_not_found());
        assert!(!ErrorCode::Forbidden.is_not_found());
    }
}
