use thiserror::Error;

use crate::model::{AreaCode, QuestionId, Section};

/// Malformed corpus or blueprint data. Fatal at load time.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("question {id}: {field} must not be empty")]
    EmptyField { id: QuestionId, field: &'static str },

    #[error("question {id}: expected 4 options, found {found}")]
    OptionCount { id: QuestionId, found: usize },

    #[error("question {id}: two options share the same text")]
    DuplicateOption { id: QuestionId },

    #[error("question {id}: correct answer index {index} is out of range")]
    CorrectAnswerOutOfRange { id: QuestionId, index: usize },

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),

    #[error("question {id}: blueprint area {area} is not registered for section {section}")]
    UnknownArea {
        id: QuestionId,
        area: AreaCode,
        section: Section,
    },

    #[error("batch {batch}: question {id} belongs to {found}, batch is {expected}")]
    BatchSectionMismatch {
        batch: String,
        id: QuestionId,
        expected: Section,
        found: Section,
    },

    #[error("blueprint area {0} is declared more than once")]
    DuplicateArea(AreaCode),

    #[error("blueprint area {code}: invalid weight range {min}..{max}")]
    InvalidWeightRange { code: AreaCode, min: f64, max: f64 },

    #[error("section {section}: weight midpoints sum to {sum:.2}, expected 100 ± 1")]
    WeightSum { section: Section, sum: f64 },

    #[error("blueprint area {code}: label must not be empty")]
    EmptyLabel { code: AreaCode },

    #[error("failed to parse {what}: {message}")]
    Parse { what: &'static str, message: String },
}

/// A request the engine cannot serve; retrying unchanged will not help.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequestError {
    #[error("session size must be at least 1")]
    InvalidCount,

    #[error("unknown section: {0}")]
    UnknownSection(String),

    #[error("blueprint area {area} is not part of section {section}")]
    UnknownArea { area: AreaCode, section: String },

    #[error("unknown question: {0}")]
    UnknownQuestion(QuestionId),

    #[error("choice {choice} is out of range for question {id}")]
    InvalidChoice { id: QuestionId, choice: usize },
}

/// Failure to compose a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ComposeError {
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    /// The caller may retry with relaxed constraints.
    #[error("blueprint area {area} has {available} eligible questions, {required} required")]
    PoolExhausted {
        area: AreaCode,
        required: usize,
        available: usize,
    },
}
