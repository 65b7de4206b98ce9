use thiserror::Error;

pub type RelayResult<T> = Result<T, RelayError>;

/// Failure taxonomy shared by the engine, the receiver and the dispatcher.
///
/// `Process` and `Transport` carry the external text verbatim so the operator
/// sees the tool's (or peer's) own diagnostic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    BackendUnavailable(String),

    #[error("{0}")]
    Process(String),

    #[error("{0}")]
    Transport(String),
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        RelayError::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        RelayError::Auth(message.into())
    }

    pub fn process(message: impl Into<String>) -> Self {
        RelayError::Process(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        RelayError::Transport(message.into())
    }

    /// Stable short code used in structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "E_VALIDATION",
            RelayError::Auth(_) => "E_AUTH",
            RelayError::BackendUnavailable(_) => "E_BACKEND_UNAVAILABLE",
            RelayError::Process(_) => "E_PROCESS",
            RelayError::Transport(_) => "E_TRANSPORT",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RelayError::Validation(msg)
            | RelayError::Auth(msg)
            | RelayError::BackendUnavailable(msg)
            | RelayError::Process(msg)
            | RelayError::Transport(msg) => msg,
        }
    }

    /// First line of the message, which is what chat-style front-ends show.
    pub fn headline(&self) -> &str {
        self.message().lines().next().unwrap_or("")
    }
}
