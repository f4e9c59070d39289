use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message not found: {0}")]
    MessageNotFound(String),
    /// The query backend panicked instead of returning a failure value.
    #[error("Query backend panicked: {0}")]
    BackendPanicked(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
