use chrono::Duration;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use prep_core::blueprint::BlueprintRegistry;
use prep_core::config::EngineConfig;
use prep_core::error::RequestError;
use prep_core::lesson::{LessonCompletion, LessonProgress, LessonState, ScrollThrottle, scroll_percent};
use prep_core::mastery::{MasteryRecord, MasteryTracker};
use prep_core::model::{ActivityEvent, AreaCode, LessonId, UserId, events};

use crate::Clock;
use crate::error::StudyError;
use crate::fallback::PendingWrite;
use crate::persist::{FlushReport, Persistence};

struct OpenLesson {
    progress: LessonProgress,
    throttle: ScrollThrottle,
}

/// Lesson reading state machine feeding partial mastery credit.
pub struct StudyProgressCoordinator {
    clock: Clock,
    config: EngineConfig,
    registry: Arc<BlueprintRegistry>,
    tracker: MasteryTracker,
    persistence: Persistence,
    lessons: Mutex<HashMap<(UserId, LessonId), OpenLesson>>,
}

impl StudyProgressCoordinator {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: EngineConfig,
        registry: Arc<BlueprintRegistry>,
        persistence: Persistence,
    ) -> Self {
        Self {
            clock,
            tracker: MasteryTracker::new(&config),
            config,
            registry,
            persistence,
            lessons: Mutex::new(HashMap::new()),
        }
    }

    fn lessons(&self) -> MutexGuard<'_, HashMap<(UserId, LessonId), OpenLesson>> {
        self.lessons.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter a lesson. Re-entering restarts its reading progress.
    ///
    /// # Errors
    ///
    /// Returns `Request` if `area` is not a blueprint area, or a storage error
    /// when the activity entry cannot be saved.
    pub async fn start_lesson(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
        title: &str,
        area: &AreaCode,
    ) -> Result<LessonState, StudyError> {
        let section = self
            .registry
            .area(area)
            .map(|a| a.section)
            .ok_or_else(|| RequestError::UnknownArea {
                area: area.clone(),
                section: "any".into(),
            })?;
        let now = self.clock.now();
        let progress = LessonProgress::start(
            user_id.clone(),
            lesson_id.clone(),
            title,
            area.clone(),
            now,
        );
        let throttle = ScrollThrottle::new(Duration::milliseconds(self.config.scroll_throttle_ms));
        self.lessons().insert(
            (user_id.clone(), lesson_id.clone()),
            OpenLesson { progress, throttle },
        );
        tracing::debug!(user = %user_id, lesson = %lesson_id, "lesson started");

        self.log_activity(
            user_id,
            events::LESSON_STARTED,
            json!({
                "lessonId": lesson_id.as_str(),
                "title": title,
                "blueprintArea": area.as_str(),
                "section": section.as_str(),
            }),
        )
        .await?;
        Ok(LessonState::Reading)
    }

    /// Feed a scroll position.
    ///
    /// Every reading advances the lesson; the returned state is throttled to
    /// one per frame interval unless the state changed. Returns `None` when
    /// throttled.
    ///
    /// # Errors
    ///
    /// Returns `LessonNotStarted` for a lesson that was never entered.
    pub fn update_scroll(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
        scroll_top: f64,
        scroll_height: f64,
        viewport_height: f64,
    ) -> Result<Option<LessonState>, StudyError> {
        let now = self.clock.now();
        let mut lessons = self.lessons();
        let open = lessons
            .get_mut(&(user_id.clone(), lesson_id.clone()))
            .ok_or_else(|| StudyError::LessonNotStarted(lesson_id.clone()))?;
        let percent = scroll_percent(scroll_top, scroll_height, viewport_height);
        let before = open.progress.state();
        let after = open.progress.observe(percent, self.config.completable_percent);
        let emit = open.throttle.should_emit(now);
        if before != after {
            tracing::debug!(lesson = %lesson_id, percent, "lesson completable");
            return Ok(Some(after));
        }
        Ok(emit.then_some(after))
    }

    /// Current state of an open lesson.
    #[must_use]
    pub fn lesson_state(&self, user_id: &UserId, lesson_id: &LessonId) -> Option<LessonState> {
        self.lessons()
            .get(&(user_id.clone(), lesson_id.clone()))
            .map(|open| open.progress.state())
    }

    /// Confirm a completable lesson: credit its area's mastery and log it.
    /// A confirmed lesson is closed; entering it again starts over.
    ///
    /// # Errors
    ///
    /// Returns `Lesson` errors before the lesson is completable, a storage
    /// error (with the lesson still completable) if its mastery cannot be
    /// read, and `ProgressNotSaved` (with the completion) if the writes are
    /// held in memory.
    pub async fn complete_lesson(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<LessonCompletion, StudyError> {
        let now = self.clock.now();
        let key = (user_id.clone(), lesson_id.clone());
        let area = {
            let lessons = self.lessons();
            let open = lessons
                .get(&key)
                .ok_or_else(|| StudyError::LessonNotStarted(lesson_id.clone()))?;
            open.progress.ensure_completable()?;
            open.progress.area().clone()
        };

        // read before confirming so a failed read leaves the lesson completable
        let current = self
            .persistence
            .load_mastery_record(user_id, &area)
            .await?
            .unwrap_or_else(|| MasteryRecord::empty(user_id.clone(), area.clone(), now));

        let completion = {
            let mut lessons = self.lessons();
            let open = lessons
                .get_mut(&key)
                .ok_or_else(|| StudyError::LessonNotStarted(lesson_id.clone()))?;
            let completion = open.progress.confirm(now)?;
            lessons.remove(&key);
            completion
        };
        let credited = self.tracker.apply_lesson_credit(&current, now);
        tracing::info!(
            lesson = %lesson_id,
            area = %completion.area,
            estimate = credited.estimate(),
            "lesson completed"
        );

        let payload = json!({
            "lessonId": completion.lesson_id.as_str(),
            "title": completion.title,
            "blueprintArea": completion.area.as_str(),
            "timeSpentSecs": completion.time_spent_secs,
        });
        let writes = [
            PendingWrite::Mastery(credited),
            PendingWrite::Activity(ActivityEvent::new(
                user_id.clone(),
                events::LESSON_COMPLETED,
                payload,
                now,
            )),
        ];
        match self.persistence.save_all(writes).await {
            Ok(()) => Ok(completion),
            Err(source) if source.is_transient() => Err(StudyError::ProgressNotSaved {
                completion: Box::new(completion),
                source,
            }),
            Err(source) => Err(source.into()),
        }
    }

    /// Append an arbitrary event to the user's activity log.
    ///
    /// # Errors
    ///
    /// Returns the storage error; after a transient failure the event stays
    /// queued for `flush_unsaved`.
    pub async fn log_activity(
        &self,
        user_id: &UserId,
        name: &str,
        payload: Value,
    ) -> Result<(), StudyError> {
        let event = ActivityEvent::new(user_id.clone(), name, payload, self.clock.now());
        self.persistence.save(PendingWrite::Activity(event)).await?;
        Ok(())
    }

    /// Retry writes that previously could not be saved.
    ///
    /// # Errors
    ///
    /// Returns the storage error if storage is still failing.
    pub async fn flush_unsaved(&self) -> Result<FlushReport, StudyError> {
        Ok(self.persistence.flush().await?)
    }
}
