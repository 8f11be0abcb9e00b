//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors emitted by `TaskScheduler`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("topic content unavailable: {0}")]
    Content(#[from] StorageError),
}

/// Errors emitted while driving a task attempt.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("input closed before the task completed")]
    Aborted,
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Errors emitted by story mode.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoryError {
    #[error("story unavailable: {0}")]
    Content(#[from] StorageError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
