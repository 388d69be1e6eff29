//! Error types and handling for the `BarrierFree` planning service

use thiserror::Error;

/// Main error type for the `BarrierFree` planning service
#[derive(Error, Debug)]
pub enum BarrierFreeError {
    /// Missing or invalid provider credentials and settings
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed or missing structured output from the generative provider
    #[error("Generation error: {message}")]
    Generation { message: String },

    /// Transport failure while talking to the geodata provider
    #[error("Resolution error: {message}")]
    Resolution { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// A call or the whole pipeline ran out of time
    #[error("Timed out: {message}")]
    Timeout { message: String },
}

impl BarrierFreeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new generation error
    pub fn generation<S: Into<String>>(message: S) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Create a new resolution error
    pub fn resolution<S: Into<String>>(message: S) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            BarrierFreeError::Config { .. } => {
                "Server configuration error. Please check the provider API keys.".to_string()
            }
            BarrierFreeError::Generation { .. } => {
                "Failed to generate the travel plan on the server.".to_string()
            }
            BarrierFreeError::Resolution { .. } => {
                "Unable to reach the place lookup service.".to_string()
            }
            BarrierFreeError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            BarrierFreeError::Timeout { .. } => {
                "Planning took too long and was cancelled. Please try again.".to_string()
            }
        }
    }
}
