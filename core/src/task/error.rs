use std::any::Any;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was cancelled")]
    Cancelled,

    #[error("task result channel was dropped before completion")]
    Dropped,

    #[error("task result was already consumed")]
    Consumed,

    #[error("failed to build the task runtime: {0}")]
    Build(String),
}

pub type TaskResult<T> = std::result::Result<T, TaskError>;

impl From<JoinError> for TaskError {
    fn from(err: JoinError) -> Self {
        if err.is_panic() { TaskError::Panicked(panic_message(err.into_panic().as_ref())) } else { TaskError::Cancelled }
    }
}

/// Extracts a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    match payload.downcast_ref::<&str>() {
        Some(s) => s.to_string(),
        None => match payload.downcast_ref::<String>() {
            Some(s) => s.clone(),
            None => "Box<dyn Any>".to_string(),
        },
    }
}
