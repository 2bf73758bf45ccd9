//! Error taxonomy and process exit codes.
//!
//! Every failure a run can end in maps onto one of these variants. None of them
//! are retried in-process: the scheduler that invokes `pricewatch` is the retry
//! mechanism.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// The observation source was unreachable, timed out, or served a page
    /// without the expected price.
    #[error("observation failed: {0}")]
    ObservationFailed(String),

    /// The record store could not be written (or locked).
    #[error("storage failed: {0}")]
    StorageFailed(String),

    /// Required out-of-band settings are absent. Holds the variable names.
    #[error("configuration missing: {}", .0.join(", "))]
    ConfigurationMissing(Vec<String>),

    /// The mail transport rejected or failed to deliver the report.
    #[error("notification failed: {0}")]
    NotifyFailed(String),

    /// A setting was present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AppError {
    pub fn observation(message: impl Into<String>) -> Self {
        Self::ObservationFailed(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageFailed(message.into())
    }

    pub fn notify(message: impl Into<String>) -> Self {
        Self::NotifyFailed(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigurationMissing(_) | Self::InvalidConfig(_) => 2,
            Self::ObservationFailed(_) => 3,
            Self::StorageFailed(_) => 4,
            Self::NotifyFailed(_) => 5,
        }
    }
}
