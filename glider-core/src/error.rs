use glider_model::{BuildId, ModelError};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogChannelError {
    #[error("log channel already closed")]
    AlreadyClosed,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousError {
    /// Nothing was delivered before the fetch deadline.
    #[error("timed out waiting for a delivery")]
    TimedOut,
    /// The delivered item sat in the slot past its pickup window.
    #[error("delivery was not fetched in time")]
    NotFetched,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Build not found: {0}")]
    NotFound(BuildId),

    #[error("Invalid build: {0}")]
    Validation(#[from] ModelError),

    #[error("Session endpoints already recorded for build {0}")]
    SessionAlreadySet(BuildId),

    #[error("Build {0} already has a result")]
    AlreadyCompleted(BuildId),

    #[error("Build {0} was already handed to the executor")]
    AlreadyDelegated(BuildId),
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("executor rejected the request with status {status}")]
    Rejected { status: u16, body: String },

    #[error("executor unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid request: {0}")]
    Validation(#[from] ModelError),

    #[error("Executor rejected build with status {status}")]
    ExecutorRejected { status: u16 },

    #[error("Executor unreachable: {0}")]
    ExecutorUnreachable(String),

    #[error("Bits were not fetched by the executor")]
    BitsNotFetched,

    #[error("No bits were uploaded in time")]
    BitsTimedOut,

    #[error("Executor stopped reading bits before the upload finished")]
    BitsInterrupted,

    #[error("No {0} endpoint recorded for build")]
    NoSessionEndpoint(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ExecutorError> for CoordinatorError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Rejected { status, .. } => {
                CoordinatorError::ExecutorRejected { status }
            }
            ExecutorError::Transport(err) => {
                CoordinatorError::ExecutorUnreachable(err.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
