// src/error.rs
//! Error types for allocator operations.

use std::fmt;

/// Errors surfaced by the aligned-allocation entry point.
///
/// The other entry points follow the C allocator convention and signal
/// failure with a null result (`None`); only [`memalign`] distinguishes
/// why it failed.
///
/// [`memalign`]: crate::memalign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Every mapping attempt failed and no existing pool had a large
    /// enough contiguous free span.
    OutOfMemory,
    /// The requested alignment is zero, not a power of two, or not a
    /// multiple of the pointer size.
    InvalidAlignment,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
        }
    }
}

impl std::error::Error for AllocError {}

// ============================================================================
// ERROR CONVERSION
// ============================================================================

/// Convert AllocError to std::io::Error
impl From<AllocError> for std::io::Error {
    fn from(err: AllocError) -> Self {
        use std::io::ErrorKind;
        match err {
            AllocError::OutOfMemory => std::io::Error::new(ErrorKind::OutOfMemory, err),
            AllocError::InvalidAlignment => std::io::Error::new(ErrorKind::InvalidInput, err),
        }
    }
}

/// Convert AllocError to anyhow::Error
#[cfg(feature = "anyhow")]
impl From<AllocError> for anyhow::Error {
    fn from(err: AllocError) -> Self {
        anyhow::anyhow!("{}", err)
    }
}

/// Result type alias for allocator operations.
pub type Result<T> = std::result::Result<T, AllocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(AllocError::OutOfMemory.to_string(), "out of memory");
        assert_eq!(AllocError::InvalidAlignment.to_string(), "invalid alignment");
    }

    #[test]
    fn test_error_conversion_io() {
        let io_err: std::io::Error = AllocError::OutOfMemory.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::OutOfMemory);
        let io_err: std::io::Error = AllocError::InvalidAlignment.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[cfg(feature = "anyhow")]
    #[test]
    fn test_anyhow_conversion() {
        let err: anyhow::Error = AllocError::OutOfMemory.into();
        assert!(err.to_string().contains("out of memory"));
    }
}
