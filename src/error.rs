use crate::types::BookingStatus;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("booking not found: {id}")]
    NotFound { id: String },

    #[error("cannot {action} a booking that is {from}: {reason}")]
    InvalidTransition {
        from: BookingStatus,
        action: String,
        reason: String,
    },

    #[error("validation error: {reason}")]
    Validation { reason: String },

    #[error("{service} failure: {reason}")]
    Upstream { service: String, reason: String },

    #[error("config error: {reason}")]
    Config { reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_transition(
        from: BookingStatus,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            from,
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// HTTP-equivalent status code surfaced to clients.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::InvalidTransition { .. } | Self::Validation { .. } | Self::Json(_) => 400,
            Self::Upstream { .. } | Self::Config { .. } => 500,
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Validation { .. } => "validation_error",
            Self::Upstream { .. } => "upstream_failure",
            Self::Config { .. } => "config_error",
            Self::Json(_) => "malformed_request",
        }
    }
}
