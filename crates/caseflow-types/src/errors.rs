//! Error taxonomy for caseflow operations.
//!
//! Every core operation fails synchronously with one of these. Gate
//! violation messages are the only workflow guidance the caller ever
//! sees, so they name the current state and the next required action and
//! must be surfaced verbatim.

use crate::CaseState;

/// Errors that can occur in caseflow operations
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum CaseflowError {
    /// Transition not allowed from the current state, or a cross-entity
    /// precondition is unmet. Recoverable by performing the named
    /// prerequisite step.
    #[error("{message}")]
    GateViolation {
        /// The state the case was in when the operation was refused
        current_state: CaseState,
        /// Human-actionable guidance, surfaced verbatim to the caller
        message: String,
    },

    /// A referenced entity does not exist or is outside the caller's
    /// ownership scope.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("case", "shipment", "install window", ...)
        entity: &'static str,
        /// The id that failed to resolve
        id: String,
    },

    /// Missing or malformed required fields.
    #[error("{0}")]
    Validation(String),

    /// Attempted duplicate creation of an at-most-one resource.
    #[error("{0}")]
    Conflict(String),

    /// The storage layer failed (poisoned lock, backend fault).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl CaseflowError {
    /// Build a gate violation for a case in `current_state`.
    pub fn gate(current_state: CaseState, message: impl Into<String>) -> Self {
        Self::GateViolation {
            current_state,
            message: message.into(),
        }
    }

    /// Build a not-found error for an entity kind and id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// The coarse error kind, for callers that map to transport codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GateViolation { .. } => ErrorKind::GateViolation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// The case state at refusal time, when the error carries one.
    pub fn current_state(&self) -> Option<CaseState> {
        match self {
            Self::GateViolation { current_state, .. } => Some(*current_state),
            _ => None,
        }
    }
}

/// Coarse classification of a [`CaseflowError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    GateViolation,
    NotFound,
    Validation,
    Conflict,
    Storage,
}

/// Result type alias for caseflow operations
pub type CaseflowResult<T> = Result<T, CaseflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_violation_carries_state_and_message() {
        let err = CaseflowError::gate(
            CaseState::Verifying,
            "Your case is currently in \"VERIFYING\". Run \"Verify (done)\" next.",
        );
        assert_eq!(err.kind(), ErrorKind::GateViolation);
        assert_eq!(err.current_state(), Some(CaseState::Verifying));
        assert!(err.to_string().contains("VERIFYING"));
        assert!(err.to_string().contains("Verify (done)"));
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let err = CaseflowError::not_found("shipment", "ship-9");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "shipment not found: ship-9");
        assert!(err.current_state().is_none());
    }
}
