//! Error types for tree construction, narrowing, and traversal.

use thiserror::Error;

use crate::element::ElementKind;

/// Errors that can occur while building or traversing configuration trees.
///
/// None of these are retried internally: a failed operation leaves any
/// partially built output in an unspecified state and the caller is expected
/// to discard it.
#[derive(Error, Debug)]
pub enum TreeError {
    /// A narrowing accessor was applied to the wrong element variant
    /// (e.g. `as_list` on a scalar).
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: ElementKind,
        actual: ElementKind,
    },

    /// The engine (or a codec built on it) was handed input it cannot
    /// interpret — typically something the container test approved but
    /// `expand` could not give a recognizable shape.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A mutator was invoked on a frozen container or an immutable view.
    #[error("cannot mutate an immutable container")]
    ImmutableMutation,

    /// An index-based mutator addressed a position outside the list.
    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Convenience alias used throughout conifer-core.
pub type Result<T> = std::result::Result<T, TreeError>;
