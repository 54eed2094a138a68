//! Governance error taxonomy returned by every application operation.

use thiserror::Error;

use super::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors surfaced to callers of the governance engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    /// A referenced discussion, session, action, user or party does not exist.
    #[error("{what} not found: {id}")]
    NotFound {
        code: ErrorCode,
        what: &'static str,
        id: String,
    },

    /// Membership, role or status precondition failed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested status change is not part of the lifecycle graph.
    #[error("Forbidden transition from {from} to {to}")]
    ForbiddenTransition {
        from: &'static str,
        to: &'static str,
    },

    /// The stored status moved underneath the caller.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Stored data that cannot be interpreted (e.g. an undecodable action payload).
    #[error("Malformed payload: {0}")]
    Fatal(String),

    /// Storage or transport failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl GovernanceError {
    pub fn not_found(code: ErrorCode, what: &'static str, id: impl ToString) -> Self {
        GovernanceError::NotFound {
            code,
            what,
            id: id.to_string(),
        }
    }

    pub fn discussion_not_found(id: impl ToString) -> Self {
        Self::not_found(ErrorCode::DiscussionNotFound, "Discussion", id)
    }

    pub fn session_not_found(id: impl ToString) -> Self {
        Self::not_found(ErrorCode::VotingSessionNotFound, "Voting session", id)
    }

    pub fn user_not_found(id: impl ToString) -> Self {
        Self::not_found(ErrorCode::UserNotFound, "User", id)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        GovernanceError::Forbidden(reason.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        GovernanceError::Conflict(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        GovernanceError::Fatal(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        GovernanceError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            GovernanceError::NotFound { code, .. } => *code,
            GovernanceError::Forbidden(_) => ErrorCode::Forbidden,
            GovernanceError::ForbiddenTransition { .. } => ErrorCode::InvalidStateTransition,
            GovernanceError::Conflict(_) => ErrorCode::Conflict,
            GovernanceError::Validation(_) => ErrorCode::ValidationFailed,
            GovernanceError::Fatal(_) => ErrorCode::MalformedPayload,
            GovernanceError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// True for the Forbidden kind, which includes refused transitions.
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            GovernanceError::Forbidden(_) | GovernanceError::ForbiddenTransition { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GovernanceError::NotFound { .. })
    }
}

impl From<DomainError> for GovernanceError {
    fn from(err: DomainError) -> Self {
        match err.code {
            code if code.is_not_found() => GovernanceError::NotFound {
                code,
                what: "Resource",
                id: err.message,
            },
            ErrorCode::Forbidden | ErrorCode::InvalidStateTransition => {
                GovernanceError::Forbidden(err.message)
            }
            ErrorCode::Conflict => GovernanceError::Conflict(err.message),
            ErrorCode::ValidationFailed => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                GovernanceError::Validation(ValidationError::invalid_format(field, err.message))
            }
            ErrorCode::MalformedPayload => GovernanceError::Fatal(err.message),
            _ => GovernanceError::Infrastructure(err.to_string()),
        }
    }
}
