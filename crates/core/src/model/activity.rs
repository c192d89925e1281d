use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ids::UserId;

/// Event names emitted by the engine itself; callers may log their own.
pub mod events {
    pub const LESSON_STARTED: &str = "lesson_started";
    pub const LESSON_COMPLETED: &str = "lesson_completed";
    pub const SESSION_STARTED: &str = "session_started";
    pub const SESSION_SUBMITTED: &str = "session_submitted";
    pub const SESSION_ABANDONED: &str = "session_abandoned";
}

/// One append-only entry of a learner's activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub user_id: UserId,
    pub name: String,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEvent {
    #[must_use]
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        payload: Value,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            payload,
            occurred_at,
        }
    }
}
