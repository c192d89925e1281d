#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod fallback;
pub mod persist;
pub mod practice;
pub mod retry;
pub mod study;

pub use prep_core::Clock;

pub use app_services::PrepServices;
pub use error::{PracticeError, StudyError, UnsavedProgress};
pub use persist::{FlushReport, Persistence};
pub use practice::{AnswerFeedback, PracticeService, QuestionResult, SubmitOutcome, SubmittedAnswer};
pub use retry::RetryPolicy;
pub use study::StudyProgressCoordinator;
