//! Service-level error taxonomy.

use crate::auth::domain::AuthError;
use crate::marketplace::{
    domain::{AgentAddress, BidId, MarketplaceDomainError, TaskId, TransitionError},
    ports::RepositoryError,
};
use std::fmt;
use thiserror::Error;

/// Category of a failed marketplace operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Required input was missing or malformed; nothing was attempted.
    Validation,
    /// The request envelope failed authentication.
    Authentication,
    /// The actor does not hold the role the operation requires.
    Authorization,
    /// The task or bid is not in the state the operation requires,
    /// including races lost at write time.
    StateConflict,
    /// The referenced task, bid or agent does not exist.
    NotFound,
    /// Unexpected infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::StateConflict => "state_conflict",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Errors returned by marketplace services.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// Input validation failed.
    #[error(transparent)]
    Domain(#[from] MarketplaceDomainError),

    /// The lifecycle state machine refused the request.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The authentication envelope was refused.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The bid does not exist.
    #[error("bid not found: {0}")]
    BidNotFound(BidId),

    /// The agent has never been referenced.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentAddress),
}

impl MarketplaceError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(_) => ErrorKind::Validation,
            Self::Transition(err) => match err {
                TransitionError::Forbidden { .. } | TransitionError::NotBidOwner { .. } => {
                    ErrorKind::Authorization
                }
                TransitionError::InvalidState { .. } | TransitionError::BidNotPending { .. } => {
                    ErrorKind::StateConflict
                }
                TransitionError::SelfBid { .. } => ErrorKind::Validation,
                TransitionError::BidNotOnTask { .. } => ErrorKind::NotFound,
            },
            Self::Auth(err) => {
                if err.is_validation() {
                    ErrorKind::Validation
                } else {
                    ErrorKind::Authentication
                }
            }
            Self::Repository(err) => match err {
                RepositoryError::TaskNotFound(_) | RepositoryError::BidNotFound(_) => {
                    ErrorKind::NotFound
                }
                RepositoryError::TransitionConflict { .. } | RepositoryError::BidConflict(_) => {
                    ErrorKind::StateConflict
                }
                RepositoryError::InvalidPersistedData(_) | RepositoryError::Persistence(_) => {
                    ErrorKind::Internal
                }
            },
            Self::TaskNotFound(_) | Self::BidNotFound(_) | Self::AgentNotFound(_) => {
                ErrorKind::NotFound
            }
        }
    }

    /// Returns a message safe to show callers.
    ///
    /// Internal failures collapse to a generic text; every other kind
    /// reports its own description.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal error".to_owned(),
            _ => self.to_string(),
        }
    }
}

/// Result type for marketplace service operations.
pub type MarketplaceResult<T> = Result<T, MarketplaceError>;
