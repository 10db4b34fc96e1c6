//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Composition errors.
///
/// Absence is not an error: `get`, `has`, `remove` and `separate` report a
/// missing child through `Option`/no-op. These variants cover the
/// error-returning conveniences and refused installs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("no component of type {type_name}")]
    NotFound { type_name: &'static str },

    #[error("{type_name} is not attached to a container")]
    Detached { type_name: &'static str },

    #[error("container is {found}, not {expected}")]
    ParentTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("node of type {type_name} no longer exists")]
    Expired { type_name: &'static str },

    #[error("{owner} has no handle yet, wrap it with Owned::new before adding components")]
    Unbound { owner: &'static str },

    #[error("cycle detected: {child} already owns {owner}")]
    CycleDetected {
        child: &'static str,
        owner: &'static str,
    },
}

/// Result type for composition operations.
pub type CompositionResult<T> = Result<T, CompositionError>;
