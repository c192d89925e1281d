use async_trait::async_trait;
use prep_core::mastery::MasteryRecord;
use prep_core::model::{ActivityEvent, AreaCode, Section, Session, SessionId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The adapter itself is broken, e.g. a lock poisoned by a panicked writer.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Session persistence. Every write replaces the whole record or nothing.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Fetch a session by id, `None` if it was never stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError>;

    /// Insert or replace a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if this would leave two in-progress
    /// sessions for the same user and section.
    async fn put_session(&self, session: &Session) -> Result<(), StorageError>;

    /// The in-progress session for `(user, section)`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn active_session(
        &self,
        user_id: &UserId,
        section: Section,
    ) -> Result<Option<Session>, StorageError>;

    /// Up to `limit` submitted sessions for `(user, section)`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn recent_submitted(
        &self,
        user_id: &UserId,
        section: Section,
        limit: usize,
    ) -> Result<Vec<Session>, StorageError>;
}

/// Mastery persistence keyed by `(user, area)`.
#[async_trait]
pub trait MasteryRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_mastery(
        &self,
        user_id: &UserId,
        area: &AreaCode,
    ) -> Result<Option<MasteryRecord>, StorageError>;

    /// Store a new version of a record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored version is newer.
    async fn put_mastery(&self, record: &MasteryRecord) -> Result<(), StorageError>;

    /// All of a user's records, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_mastery(&self, user_id: &UserId) -> Result<Vec<MasteryRecord>, StorageError>;
}

/// Append-only learner activity log.
#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the event cannot be appended.
    async fn append_activity(&self, event: &ActivityEvent) -> Result<(), StorageError>;

    /// A user's events in append order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn activity_for_user(&self, user_id: &UserId) -> Result<Vec<ActivityEvent>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    mastery: Arc<Mutex<HashMap<(UserId, AreaCode), MasteryRecord>>>,
    activity: Arc<Mutex<Vec<ActivityEvent>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Backend(e.to_string()))
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        Ok(lock(&self.sessions)?.get(&id).cloned())
    }

    async fn put_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = lock(&self.sessions)?;
        if session.is_in_progress() {
            let clash = guard.values().any(|other| {
                other.id() != session.id()
                    && other.is_in_progress()
                    && other.user_id() == session.user_id()
                    && other.section() == session.section()
            });
            if clash {
                return Err(StorageError::Conflict(format!(
                    "user {} already has an in-progress {} session",
                    session.user_id(),
                    session.section()
                )));
            }
        }
        tracing::debug!(session = %session.id(), status = session.status().as_str(), "session stored");
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn active_session(
        &self,
        user_id: &UserId,
        section: Section,
    ) -> Result<Option<Session>, StorageError> {
        let guard = lock(&self.sessions)?;
        Ok(guard
            .values()
            .find(|s| s.is_in_progress() && s.user_id() == user_id && s.section() == section)
            .cloned())
    }

    async fn recent_submitted(
        &self,
        user_id: &UserId,
        section: Section,
        limit: usize,
    ) -> Result<Vec<Session>, StorageError> {
        let guard = lock(&self.sessions)?;
        let mut submitted: Vec<Session> = guard
            .values()
            .filter(|s| {
                s.status() == prep_core::model::SessionStatus::Submitted
                    && s.user_id() == user_id
                    && s.section() == section
            })
            .cloned()
            .collect();
        submitted.sort_by(|a, b| b.closed_at().cmp(&a.closed_at()));
        submitted.truncate(limit);
        Ok(submitted)
    }
}

#[async_trait]
impl MasteryRepository for InMemoryRepository {
    async fn get_mastery(
        &self,
        user_id: &UserId,
        area: &AreaCode,
    ) -> Result<Option<MasteryRecord>, StorageError> {
        let guard = lock(&self.mastery)?;
        Ok(guard.get(&(user_id.clone(), area.clone())).cloned())
    }

    async fn put_mastery(&self, record: &MasteryRecord) -> Result<(), StorageError> {
        let mut guard = lock(&self.mastery)?;
        let key = (record.user_id().clone(), record.area().clone());
        if let Some(stored) = guard.get(&key) {
            if stored.last_updated() > record.last_updated() {
                return Err(StorageError::Conflict(format!(
                    "stored mastery for {} is newer",
                    record.area()
                )));
            }
        }
        guard.insert(key, record.clone());
        Ok(())
    }

    async fn list_mastery(&self, user_id: &UserId) -> Result<Vec<MasteryRecord>, StorageError> {
        let guard = lock(&self.mastery)?;
        Ok(guard
            .values()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ActivityLogRepository for InMemoryRepository {
    async fn append_activity(&self, event: &ActivityEvent) -> Result<(), StorageError> {
        lock(&self.activity)?.push(event.clone());
        Ok(())
    }

    async fn activity_for_user(&self, user_id: &UserId) -> Result<Vec<ActivityEvent>, StorageError> {
        let guard = lock(&self.activity)?;
        Ok(guard
            .iter()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub mastery: Arc<dyn MasteryRepository>,
    pub activity: Arc<dyn ActivityLogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    /// Use one backend for every repository.
    #[must_use]
    pub fn from_backend<R>(repo: R) -> Self
    where
        R: SessionRepository + MasteryRepository + ActivityLogRepository + Clone + 'static,
    {
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let mastery: Arc<dyn MasteryRepository> = Arc::new(repo.clone());
        let activity: Arc<dyn ActivityLogRepository> = Arc::new(repo);
        Self {
            sessions,
            mastery,
            activity,
        }
    }
}
