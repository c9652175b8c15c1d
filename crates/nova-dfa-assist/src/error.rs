use thiserror::Error;

pub type DfaAssistResult<T> = Result<T, DfaAssistError>;

#[derive(Error, Debug)]
pub enum DfaAssistError {
    #[error("jdwp: {0}")]
    Jdwp(#[from] nova_jdwp::JdwpError),
    #[error("malformed execution location: {0}")]
    InvalidLocation(String),
    #[error("live values must not be fetched while holding analysis read access")]
    ReadAccessHeld,
    #[error("data-flow assist was cancelled")]
    Cancelled,
}

impl DfaAssistError {
    /// Whether this failure came from talking to the debuggee (as opposed to a
    /// misuse of the pipeline or cancellation).
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Jdwp(_) | Self::InvalidLocation(_))
    }
}
