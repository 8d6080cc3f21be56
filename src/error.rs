//! # Error Types
//!
//! This module defines error types used throughout the tmprint library.
//!
//! Two layers exist:
//!
//! - [`SdkError`]: a failure reported by the printer SDK itself, carrying the
//!   SDK's status code and the call that produced it.
//! - [`TmprintError`]: the library-level error. Workflow steps return it with
//!   `?`; the screens log it and turn it into a boolean at their boundary.

use std::fmt;

use thiserror::Error;

use crate::sdk::PrinterStatus;

/// Status codes reported by the printer SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// Invalid parameter
    Param,
    /// Could not reach the device
    Connect,
    /// Operation timed out
    Timeout,
    /// Out of memory in the SDK
    Memory,
    /// Call not allowed in the current state
    Illegal,
    /// Another operation is in progress ("busy")
    Processing,
    /// Target not found
    NotFound,
    /// Device already in use
    InUse,
    /// Device type mismatch
    TypeInvalid,
    /// Connection lost
    Disconnect,
    /// Unspecified failure
    Failure,
}

impl ErrorStatus {
    /// SDK constant name, used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Param => "ERR_PARAM",
            Self::Connect => "ERR_CONNECT",
            Self::Timeout => "ERR_TIMEOUT",
            Self::Memory => "ERR_MEMORY",
            Self::Illegal => "ERR_ILLEGAL",
            Self::Processing => "ERR_PROCESSING",
            Self::NotFound => "ERR_NOT_FOUND",
            Self::InUse => "ERR_IN_USE",
            Self::TypeInvalid => "ERR_TYPE_INVALID",
            Self::Disconnect => "ERR_DISCONNECT",
            Self::Failure => "ERR_FAILURE",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed SDK call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {status}")]
pub struct SdkError {
    /// SDK call that failed (e.g. "connect")
    pub operation: &'static str,
    /// Status code reported by the SDK
    pub status: ErrorStatus,
}

impl SdkError {
    pub fn new(operation: &'static str, status: ErrorStatus) -> Self {
        Self { operation, status }
    }

    /// `true` when the SDK rejected the call because another operation is
    /// still running. Discovery treats this as ignorable.
    pub fn is_busy(&self) -> bool {
        self.status == ErrorStatus::Processing
    }
}

/// Main error type for tmprint operations
#[derive(Debug, Error)]
pub enum TmprintError {
    /// Error reported by the printer SDK
    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    /// The printer handle has not been created
    #[error("Printer not initialized")]
    NotInitialized,

    /// No connection target was handed to the printing screen
    #[error("No printer target selected")]
    NoTarget,

    /// Printer is connected but cannot accept data
    #[error("Printer not printable: {0}")]
    NotPrintable(PrinterStatus),

    /// Print attempt was not accepted by the printer
    #[error("Print failed: {0}")]
    PrintFailed(String),

    /// No printer model with this name
    #[error("Unknown printer model: {0}")]
    UnknownModel(String),

    /// Platform permissions were not granted
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Image loading or encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_detection() {
        assert!(SdkError::new("stop", ErrorStatus::Processing).is_busy());
        assert!(!SdkError::new("stop", ErrorStatus::Failure).is_busy());
        assert!(!SdkError::new("start", ErrorStatus::Illegal).is_busy());
    }

    #[test]
    fn test_sdk_error_message() {
        let err = SdkError::new("connect", ErrorStatus::Connect);
        assert_eq!(err.to_string(), "connect failed: ERR_CONNECT");

        let wrapped = TmprintError::from(err);
        assert_eq!(wrapped.to_string(), "SDK error: connect failed: ERR_CONNECT");
    }
}
