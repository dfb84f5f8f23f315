//! Error classification shared by every layer.
//!
//! Layers keep their own `thiserror` enums; this module only provides the
//! vocabulary used to decide whether a failure is transient and how loudly it
//! should be reported.

use std::fmt;
use std::time::Duration;

/// Trait for classifying errors
///
/// Implemented by layer-specific error types so callers can make retry and
/// abort decisions without matching on concrete variants.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient conditions such as lock contention,
    /// pool exhaustion or connection timeouts.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
