use thiserror::Error;

/// Why a single host could not be inventoried.
///
/// Every variant is terminal for that host only; none of them abort a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Worker task aborted: {0}")]
    Worker(String),
}

impl ScanError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Auth(_) => "auth",
            Self::Command { .. } => "command",
            Self::Worker(_) => "worker",
        }
    }
}

/// Errors raised by a session capability (connect, enable, run).
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Login rejected: {0}")]
    Login(String),

    #[error("Privileged mode rejected: {0}")]
    Rejected(String),

    #[error("Session closed by peer")]
    Closed,

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
