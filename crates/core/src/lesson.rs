//! Lesson reading progress: `Reading → Completable → Completed`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AreaCode, LessonId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson {0} has not been read far enough to complete")]
    NotCompletable(LessonId),

    #[error("lesson {0} is already completed")]
    AlreadyCompleted(LessonId),
}

/// Percentage of a document scrolled through, 0–100.
///
/// Content that fits in the viewport counts as fully read.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scroll_percent(scroll_top: f64, scroll_height: f64, viewport_height: f64) -> u8 {
    let scrollable = scroll_height - viewport_height;
    if !scrollable.is_finite() || scrollable <= 0.0 {
        return 100;
    }
    let percent = (scroll_top.max(0.0) / scrollable * 100.0).round();
    if percent.is_nan() {
        return 0;
    }
    percent.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LessonState {
    Reading,
    Completable,
    Completed,
}

/// Emitted once when a lesson is confirmed complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCompletion {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub title: String,
    pub area: AreaCode,
    pub completed_at: DateTime<Utc>,
    pub time_spent_secs: i64,
}

/// One user's pass through one lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    user_id: UserId,
    lesson_id: LessonId,
    title: String,
    area: AreaCode,
    state: LessonState,
    furthest_percent: u8,
    started_at: DateTime<Utc>,
}

impl LessonProgress {
    #[must_use]
    pub fn start(
        user_id: UserId,
        lesson_id: LessonId,
        title: impl Into<String>,
        area: AreaCode,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            title: title.into(),
            area,
            state: LessonState::Reading,
            furthest_percent: 0,
            started_at: at,
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn area(&self) -> &AreaCode {
        &self.area
    }

    #[must_use]
    pub fn state(&self) -> LessonState {
        self.state
    }

    #[must_use]
    pub fn furthest_percent(&self) -> u8 {
        self.furthest_percent
    }

    /// Feed a scroll reading. Scrolling back up never revokes completability.
    pub fn observe(&mut self, percent: u8, threshold: u8) -> LessonState {
        self.furthest_percent = self.furthest_percent.max(percent.min(100));
        if self.state == LessonState::Reading && self.furthest_percent >= threshold {
            self.state = LessonState::Completable;
        }
        self.state
    }

    #[must_use]
    pub fn time_spent(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).max(Duration::zero())
    }

    /// Check that `confirm` would succeed, without changing state.
    ///
    /// # Errors
    ///
    /// As [`LessonProgress::confirm`].
    pub fn ensure_completable(&self) -> Result<(), LessonError> {
        match self.state {
            LessonState::Reading => Err(LessonError::NotCompletable(self.lesson_id.clone())),
            LessonState::Completed => Err(LessonError::AlreadyCompleted(self.lesson_id.clone())),
            LessonState::Completable => Ok(()),
        }
    }

    /// Confirm completion.
    ///
    /// # Errors
    ///
    /// `NotCompletable` while still reading, `AlreadyCompleted` on a second confirm.
    pub fn confirm(&mut self, at: DateTime<Utc>) -> Result<LessonCompletion, LessonError> {
        self.ensure_completable()?;
        self.state = LessonState::Completed;
        Ok(LessonCompletion {
            user_id: self.user_id.clone(),
            lesson_id: self.lesson_id.clone(),
            title: self.title.clone(),
            area: self.area.clone(),
            completed_at: at,
            time_spent_secs: self.time_spent(at).num_seconds(),
        })
    }
}

/// Lets through at most one event per interval.
#[derive(Debug, Clone, Copy)]
pub struct ScrollThrottle {
    interval: Duration,
    last: Option<DateTime<Utc>>,
}

impl ScrollThrottle {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn should_emit(&mut self, now: DateTime<Utc>) -> bool {
        match self.last {
            Some(last) if now - last < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
