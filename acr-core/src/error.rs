use thiserror::Error;

/// Result type alias used throughout the runtime.
pub type Result<T> = std::result::Result<T, AcrError>;

/// Error taxonomy for the Agent Coordination Runtime.
///
/// Each variant corresponds to one of the sentinel *kinds* described in the
/// runtime's error handling design: expected negative outcomes (claim
/// conflicts, missing entities, version mismatches) are returned as
/// structured results rather than panics, and runtime-internal failures in
/// timers or loops are reported through [`crate::events::AcrEvent`] rather
/// than propagated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcrError {
    /// Referenced agent/task/plan/item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Registration was attempted for an id that is already active.
    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    /// An operation was attempted by an agent that does not hold the task.
    #[error("agent {agent_id} does not own task {task_id}")]
    NotOwned { task_id: String, agent_id: String },

    /// Optimistic-lock failure: the caller's expected version is stale.
    #[error("version mismatch on {task_id}: expected {expected}, current {actual}")]
    VersionMismatch {
        task_id: String,
        expected: u64,
        actual: u64,
    },

    /// The agent lacks the role or capabilities required for an operation.
    #[error("ineligible: {0}")]
    Ineligible(String),

    /// A task has unmet dependencies.
    #[error("dependencies pending: {0}")]
    DependenciesPending(String),

    /// A request or message exceeded its deadline.
    #[error("expired: {0}")]
    Expired(String),

    /// A user-provided handler raised an error while processing a message.
    #[error("handler error: {0}")]
    HandlerError(String),

    /// A precondition was violated (e.g. a task referencing an unknown
    /// dependency, or a malformed field).
    #[error("invalid: {0}")]
    Invalid(String),

    /// An unexpected internal failure; never crashes the process.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AcrError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, Self::VersionMismatch { .. })
    }

    pub fn is_dependencies_pending(&self) -> bool {
        matches!(self, Self::DependenciesPending(_))
    }

    pub fn is_ineligible(&self) -> bool {
        matches!(self, Self::Ineligible(_))
    }

    /// Coarse severity used by the runtime's tracing integration to decide
    /// whether an error deserves a `warn` or merely an `info`/`debug` line.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Internal(_) | Self::HandlerError(_) => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

/// Coarse classification used when logging an [`AcrError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_variants() {
        assert!(AcrError::not_found("task-1").is_not_found());
        assert!(!AcrError::invalid("x").is_not_found());

        let pending = AcrError::DependenciesPending("t-1".into());
        assert!(pending.is_dependencies_pending());
        assert_eq!(pending.severity(), Severity::Info);

        assert_eq!(AcrError::Internal("boom".into()).severity(), Severity::Warn);
    }

    #[test]
    fn display_messages_are_informative() {
        let err = AcrError::VersionMismatch {
            task_id: "t-9".into(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "version mismatch on t-9: expected 2, current 3"
        );
    }
}
