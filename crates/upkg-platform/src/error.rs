use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported operating system: {0}")]
    UnsupportedOS(String),

    #[error("unsupported architecture: {0}")]
    UnsupportedArch(String),

    #[error("command not found: {cmd}")]
    CommandNotFound { cmd: String },

    #[error("command failed: {cmd}, source: {source}")]
    CommandFailed { cmd: String, source: std::io::Error },

    #[error("failed to capture {stream} of {cmd}")]
    StreamUnavailable { cmd: String, stream: &'static str },

    #[error("{cmd} exited with {status}")]
    NonZeroExit { cmd: String, status: ExitStatus },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
