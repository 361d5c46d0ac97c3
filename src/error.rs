//! Errors reported by [`SharedHandle`](crate::SharedHandle).

use crate::alloc::AllocError;
use core::fmt;

/// Why a handle operation could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// The handle holds no payload.
    Empty,
    /// The control block or payload could not be allocated.
    Alloc(AllocError),
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Empty => f.write_str("dereferenced an empty SharedHandle"),
            HandleError::Alloc(err) => write!(f, "SharedHandle allocation failed: {err}"),
        }
    }
}

impl std::error::Error for HandleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandleError::Empty => None,
            HandleError::Alloc(err) => Some(err),
        }
    }
}

impl From<AllocError> for HandleError {
    fn from(err: AllocError) -> Self {
        HandleError::Alloc(err)
    }
}
