use thiserror::Error;

#[derive(Error, Debug)]
pub enum TuneError {
    #[error("Missing prerequisite: {0}")]
    FatalPrecondition(String),

    #[error("Tunable '{key}' skipped: {reason}")]
    UnresolvedTunable { key: String, reason: String },

    #[error("State store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, TuneError>;

impl From<std::io::Error> for TuneError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
