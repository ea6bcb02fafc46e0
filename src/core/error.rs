// src/core/error.rs

use std::time::Duration;
use thiserror::Error;

/// Errors that stop a scan before or instead of producing a [`ScanResult`].
///
/// Probe failures never show up here: they are folded into checks.
///
/// [`ScanResult`]: crate::core::models::ScanResult
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("A target URL is required")]
    MissingUrl,

    #[error("URL is too long ({length} characters, maximum is {max})")]
    UrlTooLong { length: usize, max: usize },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Scanning internal or private addresses is not allowed: {0}")]
    BlockedTarget(String),

    #[error("Scan not permitted ({status_code}): {reason}")]
    AccessDenied { status_code: u16, reason: String },

    #[error("Scan was cancelled")]
    Cancelled,

    #[error("Scan timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Scan failed: {0}")]
    Internal(String),
}

impl ScanError {
    /// HTTP-like status code a hosting layer can answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ScanError::MissingUrl
            | ScanError::UrlTooLong { .. }
            | ScanError::InvalidUrl(_)
            | ScanError::BlockedTarget(_) => 400,
            ScanError::AccessDenied { status_code, .. } => *status_code,
            ScanError::Cancelled => 499,
            ScanError::TimedOut(_) => 504,
            ScanError::Internal(_) => 500,
        }
    }

    pub fn is_input_error(&self) -> bool {
        (400..500).contains(&self.status_code()) && !matches!(self, ScanError::Cancelled)
    }
}
