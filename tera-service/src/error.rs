//! Errors raised by the certificate lifecycle.

use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid date '{input}': {reason}")]
    InvalidDate { input: String, reason: String },
}

impl LifecycleError {
    pub fn invalid_date(input: impl Into<String>, reason: impl Into<String>) -> Self {
        LifecycleError::InvalidDate {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}
