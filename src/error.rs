//! Error kinds shared across the framework.

use thiserror::Error;

/// Errors produced by explorers, runners, the solver driver and the
/// parameter registry.
///
/// `EmptyNeighborhood` doubles as a control-flow signal: multimodal
/// combinators catch it and fall through to the next slot, and runners
/// treat it as end of search. Every other variant aborts the current run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// No first/next/random move exists from the given state.
    #[error("empty neighborhood")]
    EmptyNeighborhood,

    /// A parameter value lies outside its declared domain.
    #[error("parameter `{parameter}` set to incorrect value: {reason}")]
    IncorrectParameterValue {
        /// Fully qualified parameter name (`prefix::name`).
        parameter: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A parameter with no default was read before being set.
    #[error("parameter `{0}` not set")]
    ParameterNotSet(String),

    /// A composite move carried a payload of a type unknown to the slot
    /// it was dispatched to.
    #[error("move of type `{expected}` expected by this explorer slot")]
    InvalidMoveType {
        /// Name of the move type the slot expects.
        expected: &'static str,
    },

    /// An optional user hook was invoked without an override.
    #[error("`{0}` must be implemented by the model to use this feature")]
    NotImplemented(&'static str),
}

impl SearchError {
    /// Shorthand for [`SearchError::IncorrectParameterValue`].
    pub fn incorrect_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        SearchError::IncorrectParameterValue {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}
