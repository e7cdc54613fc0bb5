use crate::interpreter::{EnvId, ObjectId};

/// Errors raised by the engine itself.
///
/// These are defects or acknowledged gaps in the implementation. They are
/// never visible to running script code and are never turned into a
/// `Completion::Throw`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// A construct the engine does not support yet.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// An internal invariant did not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// `CreateMutableBinding`/`CreateImmutableBinding` ran twice for one name
    /// in the same declarative record.
    #[error("binding '{0}' is already declared in this environment")]
    DuplicateBinding(String),

    /// A binding operation named a binding the record does not hold.
    #[error("binding '{0}' does not exist in this environment")]
    MissingBinding(String),

    #[error("invalid object handle {0:?}")]
    InvalidObject(ObjectId),

    #[error("invalid environment handle {0:?}")]
    InvalidEnvironment(EnvId),

    #[error("no running execution context")]
    NoRunningContext,
}

pub type EngineResult<T> = Result<T, EngineError>;
