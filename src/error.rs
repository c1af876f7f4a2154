use thiserror::Error;

/// Every way a classification call can fail. The HTTP layer maps these to
/// status codes; nothing else leaks onto the wire.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("No image provided")]
    MissingInput,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Rate limit exceeded. Please try again later.")]
    Throttled,

    #[error("AI credits exhausted. Please add credits to continue.")]
    QuotaExceeded,

    #[error("AI gateway error: {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("AI model returned an empty response")]
    EmptyResponse,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClassifyError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingInput => 400,
            Self::Throttled => 429,
            Self::QuotaExceeded => 402,
            Self::Configuration(_)
            | Self::Upstream { .. }
            | Self::EmptyResponse
            | Self::Internal(_) => 500,
        }
    }

    /// Client-caused and caller-actionable errors carry only a message;
    /// everything else goes out as a generic 500 with details.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}
