//! Shared error types for the services crate.

use thiserror::Error;

use prep_core::error::{ComposeError, RequestError};
use prep_core::lesson::{LessonCompletion, LessonError};
use prep_core::model::{LessonId, Session, SessionId, SessionStateError};
use storage::repository::StorageError;

use crate::practice::{AnswerFeedback, SubmitOutcome};

/// Work that completed in memory but could not be persisted.
#[derive(Debug, Clone)]
pub enum UnsavedProgress {
    Started(Session),
    Answered(AnswerFeedback),
    Submitted(SubmitOutcome),
}

/// Errors emitted by `PracticeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Session(#[from] SessionStateError),
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),
    #[error("session {0} was idle too long and has been abandoned")]
    SessionExpired(SessionId),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The result is valid and held in memory until `flush_unsaved` succeeds.
    #[error("progress not saved: {source}")]
    ProgressNotSaved {
        unsaved: Box<UnsavedProgress>,
        source: StorageError,
    },
}

/// Errors emitted by `StudyProgressCoordinator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error("lesson {0} was not started")]
    LessonNotStarted(LessonId),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("lesson completion not saved: {source}")]
    ProgressNotSaved {
        completion: Box<LessonCompletion>,
        source: StorageError,
    },
}
