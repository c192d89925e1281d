use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, SessionId, UserId};
use crate::model::question::Section;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("a session needs at least one question")]
    Empty,

    #[error("session {0} is no longer in progress")]
    NotInProgress(SessionId),

    #[error("question {0} is not part of this session")]
    NotInSession(QuestionId),

    #[error("persisted session is inconsistent: {0}")]
    InvalidPersistedState(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    InProgress,
    Submitted,
    Abandoned,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Submitted => "submitted",
            SessionStatus::Abandoned => "abandoned",
        }
    }
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// The learner's latest choice for one question of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub choice: usize,
    pub correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub correct: usize,
}

/// Totals for a submitted session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub accuracy_percent: f64,
    pub duration: Duration,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One practice or mock-exam attempt over an ordered set of questions.
///
/// Answers are kept positionally: `answers[i]` belongs to `question_ids[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    section: Section,
    question_ids: Vec<QuestionId>,
    answers: Vec<Option<AnswerRecord>>,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Opens a new in-progress session.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::Empty` if `question_ids` is empty.
    pub fn start(
        id: SessionId,
        user_id: UserId,
        section: Section,
        question_ids: Vec<QuestionId>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionStateError> {
        if question_ids.is_empty() {
            return Err(SessionStateError::Empty);
        }
        let answers = vec![None; question_ids.len()];
        Ok(Self {
            id,
            user_id,
            section,
            question_ids,
            answers,
            status: SessionStatus::InProgress,
            started_at,
            last_activity_at: started_at,
            closed_at: None,
        })
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::InvalidPersistedState` when answers do not
    /// line up with the question list or the status and close time disagree.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        user_id: UserId,
        section: Section,
        question_ids: Vec<QuestionId>,
        answers: Vec<Option<AnswerRecord>>,
        status: SessionStatus,
        started_at: DateTime<Utc>,
        last_activity_at: DateTime<Utc>,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SessionStateError> {
        if question_ids.is_empty() {
            return Err(SessionStateError::Empty);
        }
        if answers.len() != question_ids.len() {
            return Err(SessionStateError::InvalidPersistedState(format!(
                "{} answers for {} questions",
                answers.len(),
                question_ids.len()
            )));
        }
        for (qid, answer) in question_ids.iter().zip(&answers) {
            match answer {
                Some(answer) if &answer.question_id != qid => {
                    return Err(SessionStateError::InvalidPersistedState(format!(
                        "answer for {} stored at slot of {qid}",
                        answer.question_id
                    )));
                }
                _ => {}
            }
        }
        if (status == SessionStatus::InProgress) == closed_at.is_some() {
            return Err(SessionStateError::InvalidPersistedState(
                "close time does not match status".into(),
            ));
        }
        Ok(Self {
            id,
            user_id,
            section,
            question_ids,
            answers,
            status,
            started_at,
            last_activity_at,
            closed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<AnswerRecord>] {
        &self.answers
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// When the session was submitted or abandoned.
    #[must_use]
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// True when an in-progress session has seen no activity for longer than `timeout`.
    #[must_use]
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.is_in_progress() && now.signed_duration_since(self.last_activity_at) > timeout
    }

    /// Record (or replace) the answer for a question of this session.
    ///
    /// # Errors
    ///
    /// Returns `NotInProgress` once the session is closed and `NotInSession`
    /// for foreign question ids.
    pub fn record_answer(
        &mut self,
        question_id: &QuestionId,
        choice: usize,
        correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<&AnswerRecord, SessionStateError> {
        if !self.is_in_progress() {
            return Err(SessionStateError::NotInProgress(self.id));
        }
        let slot = self
            .question_ids
            .iter()
            .position(|q| q == question_id)
            .ok_or_else(|| SessionStateError::NotInSession(question_id.clone()))?;

        self.last_activity_at = self.last_activity_at.max(answered_at);
        let record = self.answers[slot].insert(AnswerRecord {
            question_id: question_id.clone(),
            choice,
            correct,
            answered_at,
        });
        Ok(record)
    }

    /// Close the session as submitted.
    ///
    /// # Errors
    ///
    /// Returns `NotInProgress` if it was already closed.
    pub fn submit(&mut self, at: DateTime<Utc>) -> Result<(), SessionStateError> {
        self.close(SessionStatus::Submitted, at)
    }

    /// Close the session as abandoned; its answers never reach mastery.
    ///
    /// # Errors
    ///
    /// Returns `NotInProgress` if it was already closed.
    pub fn abandon(&mut self, at: DateTime<Utc>) -> Result<(), SessionStateError> {
        self.close(SessionStatus::Abandoned, at)
    }

    fn close(&mut self, status: SessionStatus, at: DateTime<Utc>) -> Result<(), SessionStateError> {
        if !self.is_in_progress() {
            return Err(SessionStateError::NotInProgress(self.id));
        }
        self.status = status;
        self.closed_at = Some(at);
        self.last_activity_at = self.last_activity_at.max(at);
        Ok(())
    }

    /// Answered questions in session order.
    pub fn answered(&self) -> impl Iterator<Item = &AnswerRecord> {
        self.answers.iter().flatten()
    }

    /// Question ids answered correctly in this session.
    pub fn correctly_answered(&self) -> impl Iterator<Item = &QuestionId> {
        self.answered().filter(|a| a.correct).map(|a| &a.question_id)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.answered().count();
        SessionProgress {
            total: self.question_ids.len(),
            answered,
            remaining: self.question_ids.len() - answered,
            correct: self.correctly_answered().count(),
        }
    }

    /// Summary of a submitted session; `None` while open or when abandoned.
    #[must_use]
    pub fn summary(&self) -> Option<SessionSummary> {
        if self.status != SessionStatus::Submitted {
            return None;
        }
        let closed_at = self.closed_at?;
        let progress = self.progress();
        #[allow(clippy::cast_precision_loss)]
        let accuracy_percent = progress.correct as f64 * 100.0 / progress.total as f64;
        Some(SessionSummary {
            total: progress.total,
            answered: progress.answered,
            correct: progress.correct,
            accuracy_percent,
            duration: closed_at.signed_duration_since(self.started_at),
        })
    }
}
