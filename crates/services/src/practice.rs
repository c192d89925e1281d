use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use prep_core::bank::QuestionBank;
use prep_core::blueprint::BlueprintRegistry;
use prep_core::compose::{ComposedSession, CompositionRequest, LearnerContext, SessionComposer};
use prep_core::config::EngineConfig;
use prep_core::error::RequestError;
use prep_core::mastery::{MasteryRecord, MasteryTracker, Outcome};
use prep_core::model::{
    ActivityEvent, AreaCode, Question, QuestionId, Section, Session, SessionId, SessionProgress,
    SessionSummary, UserId, events,
};
use prep_core::readiness::{ReadinessEstimator, ReadinessScore};
use storage::repository::StorageError;

use crate::Clock;
use crate::error::{PracticeError, UnsavedProgress};
use crate::fallback::PendingWrite;
use crate::persist::{FlushReport, Persistence};

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Immediate feedback for one answered question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub choice: usize,
    pub correct: bool,
    pub correct_answer: usize,
    pub explanation: String,
    pub progress: SessionProgress,
}

/// An answer handed in with the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub choice: usize,
}

impl SubmittedAnswer {
    #[must_use]
    pub fn new(question_id: impl Into<QuestionId>, choice: usize) -> Self {
        Self {
            question_id: question_id.into(),
            choice,
        }
    }
}

/// Per-question correctness after submission. Unanswered questions count as incorrect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub area: AreaCode,
    pub choice: Option<usize>,
    pub correct: bool,
    pub correct_answer: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub session_id: SessionId,
    pub results: Vec<QuestionResult>,
    pub summary: SessionSummary,
    pub readiness: ReadinessScore,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Practice and mock-exam entry point: compose, start, answer, submit, score.
#[derive(Clone)]
pub struct PracticeService {
    clock: Clock,
    config: EngineConfig,
    bank: Arc<QuestionBank>,
    registry: Arc<BlueprintRegistry>,
    tracker: MasteryTracker,
    persistence: Persistence,
}

impl PracticeService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: EngineConfig,
        bank: Arc<QuestionBank>,
        registry: Arc<BlueprintRegistry>,
        persistence: Persistence,
    ) -> Self {
        Self {
            clock,
            tracker: MasteryTracker::new(&config),
            config,
            bank,
            registry,
            persistence,
        }
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn idle_timeout(&self) -> Duration {
        Duration::hours(self.config.idle_timeout_hours)
    }

    fn question(&self, id: &QuestionId) -> Result<&Question, RequestError> {
        self.bank
            .get(id)
            .ok_or_else(|| RequestError::UnknownQuestion(id.clone()))
    }

    async fn learner_context(
        &self,
        user_id: &UserId,
        section: Section,
    ) -> Result<LearnerContext, StorageError> {
        let recent = self
            .persistence
            .recent_submitted(user_id, section, self.config.recent_session_window)
            .await?;
        let recently_correct: HashSet<QuestionId> = recent
            .iter()
            .flat_map(|s| s.correctly_answered().cloned())
            .collect();

        let now = self.now();
        let mastery = self
            .persistence
            .load_mastery(user_id)
            .await?
            .into_iter()
            .map(|(area, record)| (area, self.tracker.decayed_estimate(&record, now)))
            .collect();

        Ok(LearnerContext {
            recently_correct,
            mastery,
        })
    }

    /// Compose a session for `user_id` without starting it.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Compose` for invalid requests or exhausted pools,
    /// and `PracticeError::Storage` if the learner history cannot be read.
    pub async fn compose_session(
        &self,
        user_id: &UserId,
        request: &CompositionRequest,
    ) -> Result<ComposedSession, PracticeError> {
        let learner = self.learner_context(user_id, request.section).await?;
        let composed = SessionComposer::new(&self.bank, &self.registry)
            .with_max_run(self.config.max_area_run)
            .compose(request, &learner)?;
        Ok(composed)
    }

    /// Compose and open a new session, abandoning any in-progress one for the
    /// same user and section.
    ///
    /// # Errors
    ///
    /// Returns composition or storage errors; `ProgressNotSaved` still carries
    /// the started session when storage is only temporarily unavailable.
    pub async fn start_session(
        &self,
        user_id: &UserId,
        request: &CompositionRequest,
    ) -> Result<Session, PracticeError> {
        let composed = self.compose_session(user_id, request).await?;
        let now = self.now();

        let mut writes = Vec::new();
        for mut previous in self
            .persistence
            .active_sessions(user_id, request.section)
            .await?
        {
            previous.abandon(now)?;
            tracing::info!(session = %previous.id(), "superseded session abandoned");
            let event = self.activity(
                user_id,
                events::SESSION_ABANDONED,
                json!({ "sessionId": previous.id().to_string(), "reason": "superseded" }),
            );
            writes.push(PendingWrite::Session(previous));
            writes.push(event);
        }

        let session = Session::start(
            SessionId::generate(),
            user_id.clone(),
            request.section,
            composed.question_ids,
            now,
        )?;
        tracing::info!(
            session = %session.id(),
            section = %session.section(),
            questions = session.question_ids().len(),
            "session started"
        );
        writes.push(PendingWrite::Session(session.clone()));
        writes.push(self.activity(
            user_id,
            events::SESSION_STARTED,
            json!({
                "sessionId": session.id().to_string(),
                "section": session.section().as_str(),
                "count": session.question_ids().len(),
            }),
        ));

        match self.persistence.save_all(writes).await {
            Ok(()) => Ok(session),
            Err(source) if source.is_transient() => Err(PracticeError::ProgressNotSaved {
                unsaved: Box::new(UnsavedProgress::Started(session)),
                source,
            }),
            Err(source) => Err(source.into()),
        }
    }

    /// Load a session, closing it as abandoned if it sat idle too long.
    async fn open_session(&self, session_id: SessionId) -> Result<Session, PracticeError> {
        let mut session = self
            .persistence
            .load_session(session_id)
            .await?
            .ok_or(PracticeError::UnknownSession(session_id))?;

        let now = self.now();
        if session.is_idle(now, self.idle_timeout()) {
            session.abandon(now)?;
            tracing::info!(session = %session_id, "idle session abandoned");
            let writes = [
                PendingWrite::Session(session.clone()),
                self.activity(
                    session.user_id(),
                    events::SESSION_ABANDONED,
                    json!({ "sessionId": session_id.to_string(), "reason": "idle" }),
                ),
            ];
            self.persistence.save_all(writes).await?;
            return Err(PracticeError::SessionExpired(session_id));
        }
        Ok(session)
    }

    /// Current state of a session, for progress views.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` or a storage error.
    pub async fn session(&self, session_id: SessionId) -> Result<Session, PracticeError> {
        self.persistence
            .load_session(session_id)
            .await?
            .ok_or(PracticeError::UnknownSession(session_id))
    }

    /// Record one answer and return immediate feedback.
    ///
    /// # Errors
    ///
    /// Returns request errors for unknown questions or choices, session state
    /// errors once closed, `SessionExpired` after the idle timeout, and
    /// `ProgressNotSaved` (with the feedback) when the write fails.
    pub async fn record_answer(
        &self,
        session_id: SessionId,
        question_id: &QuestionId,
        choice: usize,
    ) -> Result<AnswerFeedback, PracticeError> {
        let mut session = self.open_session(session_id).await?;
        let question = self.question(question_id)?;
        if choice >= question.options.len() {
            return Err(RequestError::InvalidChoice {
                id: question_id.clone(),
                choice,
            }
            .into());
        }

        let correct = question.is_correct(choice);
        session.record_answer(question_id, choice, correct, self.now())?;
        let feedback = AnswerFeedback {
            question_id: question_id.clone(),
            choice,
            correct,
            correct_answer: question.correct_answer,
            explanation: question.explanation.clone(),
            progress: session.progress(),
        };

        match self.persistence.save(PendingWrite::Session(session)).await {
            Ok(()) => Ok(feedback),
            Err(source) if source.is_transient() => Err(PracticeError::ProgressNotSaved {
                unsaved: Box::new(UnsavedProgress::Answered(feedback)),
                source,
            }),
            Err(source) => Err(source.into()),
        }
    }

    /// Close the session, fold its answers into mastery, and score readiness.
    ///
    /// `answers` may add to or replace answers already recorded. Mastery is
    /// only ever updated here, so abandoned sessions never affect it.
    ///
    /// # Errors
    ///
    /// As [`PracticeService::record_answer`]; `ProgressNotSaved` carries the
    /// full outcome.
    pub async fn submit_answers(
        &self,
        session_id: SessionId,
        answers: &[SubmittedAnswer],
    ) -> Result<SubmitOutcome, PracticeError> {
        let mut session = self.open_session(session_id).await?;
        let now = self.now();

        for answer in answers {
            let question = self.question(&answer.question_id)?;
            if answer.choice >= question.options.len() {
                return Err(RequestError::InvalidChoice {
                    id: answer.question_id.clone(),
                    choice: answer.choice,
                }
                .into());
            }
            let correct = question.is_correct(answer.choice);
            session.record_answer(&answer.question_id, answer.choice, correct, now)?;
        }
        session.submit(now)?;

        let user_id = session.user_id().clone();
        let mut mastery = self.persistence.load_mastery(&user_id).await?;
        let mut touched: Vec<AreaCode> = Vec::new();
        for record in session.answered() {
            let area = &self.question(&record.question_id)?.blueprint_area;
            let current = mastery
                .remove(area)
                .unwrap_or_else(|| MasteryRecord::empty(user_id.clone(), area.clone(), now));
            let updated = self
                .tracker
                .apply_attempt(&current, Outcome::from_correct(record.correct), now);
            mastery.insert(area.clone(), updated);
            if !touched.contains(area) {
                touched.push(area.clone());
            }
        }

        let results = self.results(&session)?;
        let summary = session
            .summary()
            .ok_or(PracticeError::UnknownSession(session_id))?;
        let records: Vec<MasteryRecord> = mastery.values().cloned().collect();
        let readiness = ReadinessEstimator::new(&self.registry, &self.config).estimate(
            &user_id,
            session.section(),
            &records,
            now,
        )?;
        tracing::info!(
            session = %session_id,
            correct = summary.correct,
            total = summary.total,
            readiness = readiness.score,
            "session submitted"
        );

        let mut writes: Vec<PendingWrite> = touched
            .iter()
            .filter_map(|area| mastery.get(area).cloned())
            .map(PendingWrite::Mastery)
            .collect();
        writes.push(PendingWrite::Session(session));
        writes.push(self.activity(
            &user_id,
            events::SESSION_SUBMITTED,
            json!({
                "sessionId": session_id.to_string(),
                "correct": summary.correct,
                "total": summary.total,
                "accuracyPercent": summary.accuracy_percent,
                "readiness": readiness.rounded(),
                "readinessLevel": readiness.level.as_str(),
            }),
        ));

        let outcome = SubmitOutcome {
            session_id,
            results,
            summary,
            readiness,
        };
        match self.persistence.save_all(writes).await {
            Ok(()) => Ok(outcome),
            Err(source) if source.is_transient() => Err(PracticeError::ProgressNotSaved {
                unsaved: Box::new(UnsavedProgress::Submitted(outcome)),
                source,
            }),
            Err(source) => Err(source.into()),
        }
    }

    fn results(&self, session: &Session) -> Result<Vec<QuestionResult>, RequestError> {
        session
            .question_ids()
            .iter()
            .zip(session.answers())
            .map(|(id, answer)| {
                let question = self.question(id)?;
                Ok(QuestionResult {
                    question_id: id.clone(),
                    area: question.blueprint_area.clone(),
                    choice: answer.as_ref().map(|a| a.choice),
                    correct: answer.as_ref().is_some_and(|a| a.correct),
                    correct_answer: question.correct_answer,
                })
            })
            .collect()
    }

    /// Readiness for a section from the user's current mastery.
    ///
    /// # Errors
    ///
    /// Returns `Request` for an unknown section or a storage error.
    pub async fn readiness(
        &self,
        user_id: &UserId,
        section: Section,
    ) -> Result<ReadinessScore, PracticeError> {
        let records: Vec<MasteryRecord> = self
            .persistence
            .load_mastery(user_id)
            .await?
            .into_values()
            .collect();
        let score = ReadinessEstimator::new(&self.registry, &self.config).estimate(
            user_id,
            section,
            &records,
            self.now(),
        )?;
        Ok(score)
    }

    /// Decayed mastery estimates per area, for remediation views.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn mastery(&self, user_id: &UserId) -> Result<HashMap<AreaCode, f64>, PracticeError> {
        let now = self.now();
        Ok(self
            .persistence
            .load_mastery(user_id)
            .await?
            .into_iter()
            .map(|(area, record)| (area, self.tracker.decayed_estimate(&record, now)))
            .collect())
    }

    /// Retry writes that previously could not be saved.
    ///
    /// # Errors
    ///
    /// Returns the storage error if storage is still failing.
    pub async fn flush_unsaved(&self) -> Result<FlushReport, PracticeError> {
        Ok(self.persistence.flush().await?)
    }

    fn activity(&self, user_id: &UserId, name: &str, payload: serde_json::Value) -> PendingWrite {
        PendingWrite::Activity(ActivityEvent::new(
            user_id.clone(),
            name,
            payload,
            self.now(),
        ))
    }
}
