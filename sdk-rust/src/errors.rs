use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynapseError {
    /// The input was rejected locally before any request was made
    /// (e.g. a blank question or an empty channel list).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The request to the backend failed or the response body could not be
    /// read.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend returned a non-2xx status. The message is the normalized
    /// `detail`/`message` field of the body, or the status text.
    #[error("{1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// A 2xx body did not match the expected shape.
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    /// A guarded operation was called while another call held its slot.
    #[error("Operation busy: {0}")]
    Busy(&'static str),
    #[error("Unknown project context: {0}")]
    UnknownContext(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynapseError {
    /// A short discriminator suitable for [`ErrorInfo::code`].
    ///
    /// [`ErrorInfo::code`]: crate::ErrorInfo
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::InvalidInput(_) => "invalid_input".to_string(),
            Self::StatusCode(status, _) => status.as_u16().to_string(),
            Self::Transport(error) if error.is_connect() => "network".to_string(),
            Self::Transport(error) if error.is_decode() => "invalid_response".to_string(),
            Self::Decode(_) => "invalid_response".to_string(),
            Self::Busy(_) => "busy".to_string(),
            Self::UnknownContext(_) => "unknown_context".to_string(),
            Self::Config(_) => "config".to_string(),
            Self::Transport(_) | Self::Io(_) => "unknown".to_string(),
        }
    }

    /// The human readable part of the error, without the status suffix.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::StatusCode(_, message) | Self::InvalidInput(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type SynapseResult<T> = Result<T, SynapseError>;
