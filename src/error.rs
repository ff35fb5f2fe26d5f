use crate::descriptor::TypeDescriptor;
use thiserror::Error;

/// Errors that can occur when using a concurrent map
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The internal lock was poisoned by a thread that panicked while holding it
    #[error("Failed to acquire lock")]
    LockError,
    /// A key or value did not match the type declared at construction
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The declared type
        expected: TypeDescriptor,
        /// The type that was supplied or requested
        found: TypeDescriptor,
    },
}

impl MapError {
    pub(crate) fn mismatch(expected: TypeDescriptor, found: TypeDescriptor) -> Self {
        MapError::TypeMismatch { expected, found }
    }
}
