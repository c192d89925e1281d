pub mod activity;
mod ids;
mod question;
mod session;

pub use activity::{ActivityEvent, events};
pub use ids::{AreaCode, LessonId, ParseIdError, QuestionId, SessionId, UserId};
pub use question::{
    Difficulty, OPTION_COUNT, ParseDifficultyError, ParseSectionError, Question, Section,
};
pub use session::{
    AnswerRecord, Session, SessionProgress, SessionStateError, SessionStatus, SessionSummary,
};
