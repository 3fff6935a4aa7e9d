// Centralized error handling for the attendance client

use thiserror::Error;

/// Failures surfaced by a gateway call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Gateway unreachable: {0}")]
    Transport(String),

    #[error("Gateway request timed out after {0} ms")]
    Timeout(u64),

    #[error("Gateway returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Business rejection from the server, shown to the user as is
    #[error("{0}")]
    Rejected(String),

    #[error("Malformed gateway response: {0}")]
    Decode(String),

    #[error("Gateway not available")]
    Unavailable,
}

impl GatewayError {
    /// Message suitable for a check-in result card
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            message
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionFormError {
    #[error("Session name must not be empty")]
    EmptyName,

    #[error("Invalid date or time: {0}")]
    InvalidDateTime(String),

    #[error("End time must be after start time")]
    EndNotAfterStart,

    #[error("Failed to create session: {0}")]
    Gateway(#[from] GatewayError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Please enter your name")]
    EmptyName,

    #[error("Caller identity is unknown")]
    MissingIdentity,

    #[error("Failed to complete registration: {0}")]
    Gateway(#[from] GatewayError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScannerError {
    #[error("Camera is not supported on this device")]
    Unsupported,

    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera is in use by another application")]
    DeviceBusy,

    #[error("Camera error: {0}")]
    Device(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CheckInFlowError {
    #[error("A check-in result is still displayed, retry before submitting again")]
    AwaitingRetry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_is_verbatim() {
        let err = GatewayError::Rejected("Already checked in to this session".to_string());
        assert_eq!(err.user_message(), "Already checked in to this session");
    }

    #[test]
    fn test_empty_rejection_falls_back() {
        let err = GatewayError::Rejected(String::new());
        assert_eq!(err.user_message(), "Unknown error");
    }

    #[test]
    fn test_form_error_wraps_gateway() {
        let err: SessionFormError = GatewayError::Unavailable.into();
        assert!(err.to_string().contains("Gateway not available"));
    }
}
