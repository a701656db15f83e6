use thiserror::Error;

/// Errors surfaced by the simulation engine.
///
/// There are no transient failures here: every operation is deterministic
/// given the RNG seed and prior state, so retrying would reproduce the same
/// error. A failed call leaves previously-completed rounds intact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrainError {
    /// Invalid static configuration: bad sizes or probabilities, or a
    /// reference to a brain part that was never registered.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An operation was given parts that violate its preconditions, e.g.
    /// merging two assemblies that live in the same area.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = core::result::Result<T, BrainError>;

impl BrainError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        BrainError::Configuration(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        BrainError::InvariantViolation(msg.into())
    }
}
