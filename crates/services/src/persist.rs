use std::collections::HashMap;
use std::sync::Arc;

use prep_core::mastery::MasteryRecord;
use prep_core::model::{AreaCode, Section, Session, SessionId, UserId};
use storage::repository::{Storage, StorageError};

use crate::fallback::{FallbackCache, PendingWrite};
use crate::retry::RetryPolicy;

/// Outcome of replaying unsaved writes.
#[derive(Debug, Default)]
pub struct FlushReport {
    pub written: usize,
    /// Writes storage refused permanently, with the reason.
    pub rejected: Vec<(PendingWrite, StorageError)>,
}

/// Storage access shared by the services: retried calls plus the in-memory
/// fallback for writes that still fail.
#[derive(Clone)]
pub struct Persistence {
    storage: Storage,
    retry: RetryPolicy,
    fallback: Arc<FallbackCache>,
}

impl Persistence {
    #[must_use]
    pub fn new(storage: Storage, retry: RetryPolicy) -> Self {
        Self {
            storage,
            retry,
            fallback: Arc::new(FallbackCache::new()),
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn fallback(&self) -> &FallbackCache {
        &self.fallback
    }

    async fn write(&self, write: &PendingWrite) -> Result<(), StorageError> {
        match write {
            PendingWrite::Session(session) => {
                self.retry
                    .run("put_session", || self.storage.sessions.put_session(session))
                    .await
            }
            PendingWrite::Mastery(record) => {
                self.retry
                    .run("put_mastery", || self.storage.mastery.put_mastery(record))
                    .await
            }
            PendingWrite::Activity(event) => {
                self.retry
                    .run("append_activity", || self.storage.activity.append_activity(event))
                    .await
            }
        }
    }

    /// Write through to storage. Transient failures keep the write in the
    /// fallback; permanent ones are only reported.
    ///
    /// # Errors
    ///
    /// Returns the storage error after retries.
    pub async fn save(&self, write: PendingWrite) -> Result<(), StorageError> {
        match self.write(&write).await {
            Ok(()) => {
                self.fallback.supersede(&write);
                Ok(())
            }
            Err(err) if err.is_transient() => {
                tracing::error!(error = %err, "write failed, holding progress in memory");
                self.fallback.push(write);
                Err(err)
            }
            Err(err) => {
                tracing::error!(error = %err, "write rejected by storage");
                Err(err)
            }
        }
    }

    /// Save every write, even after one fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub async fn save_all(
        &self,
        writes: impl IntoIterator<Item = PendingWrite>,
    ) -> Result<(), StorageError> {
        let mut first_err = None;
        for write in writes {
            if let Err(err) = self.save(write).await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Replay unsaved writes in order.
    ///
    /// A transient failure stops the replay and keeps the failed write and
    /// everything after it queued. Writes storage rejects outright are dropped
    /// from the queue and returned in the report.
    ///
    /// # Errors
    ///
    /// Returns the transient failure that stopped the replay.
    pub async fn flush(&self) -> Result<FlushReport, StorageError> {
        let mut pending = self.fallback.drain().into_iter();
        let mut report = FlushReport::default();
        while let Some(write) = pending.next() {
            match self.write(&write).await {
                Ok(()) => report.written += 1,
                Err(err) if err.is_transient() => {
                    let mut remaining = vec![write];
                    remaining.extend(pending);
                    self.fallback.restore(remaining);
                    return Err(err);
                }
                Err(err) => {
                    tracing::error!(error = %err, "unsaved write rejected, dropping it");
                    report.rejected.push((write, err));
                }
            }
        }
        if report.written > 0 {
            tracing::info!(written = report.written, "unsaved progress written");
        }
        Ok(report)
    }

    /// Session by id, preferring an unsaved version.
    ///
    /// # Errors
    ///
    /// Returns the storage error after retries.
    pub async fn load_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        if let Some(session) = self.fallback.session(id) {
            return Ok(Some(session));
        }
        self.retry
            .run("get_session", || self.storage.sessions.get_session(id))
            .await
    }

    /// Every in-progress session of a user in a section, stored or unsaved.
    ///
    /// Normally at most one; more can only appear while writes are queued.
    ///
    /// # Errors
    ///
    /// Returns the storage error after retries.
    pub async fn active_sessions(
        &self,
        user_id: &UserId,
        section: Section,
    ) -> Result<Vec<Session>, StorageError> {
        let stored = self
            .retry
            .run("active_session", || {
                self.storage.sessions.active_session(user_id, section)
            })
            .await?;
        let mut active = self.fallback.active_sessions(user_id, section);
        if let Some(stored) = stored {
            // an unsaved newer version may already be closed
            if self.fallback.session(stored.id()).is_none() {
                active.insert(0, stored);
            }
        }
        Ok(active)
    }

    /// # Errors
    ///
    /// Returns the storage error after retries.
    pub async fn recent_submitted(
        &self,
        user_id: &UserId,
        section: Section,
        limit: usize,
    ) -> Result<Vec<Session>, StorageError> {
        self.retry
            .run("recent_submitted", || {
                self.storage.sessions.recent_submitted(user_id, section, limit)
            })
            .await
    }

    /// All of a user's mastery records, unsaved versions taking precedence.
    ///
    /// # Errors
    ///
    /// Returns the storage error after retries.
    pub async fn load_mastery(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<AreaCode, MasteryRecord>, StorageError> {
        let stored = self
            .retry
            .run("list_mastery", || self.storage.mastery.list_mastery(user_id))
            .await?;
        let mut records: HashMap<AreaCode, MasteryRecord> = stored
            .into_iter()
            .map(|r| (r.area().clone(), r))
            .collect();
        for unsaved in self.fallback.mastery_for(user_id) {
            let newer = records
                .get(unsaved.area())
                .is_none_or(|r| r.last_updated() <= unsaved.last_updated());
            if newer {
                records.insert(unsaved.area().clone(), unsaved);
            }
        }
        Ok(records)
    }

    /// One mastery record, unsaved version taking precedence.
    ///
    /// # Errors
    ///
    /// Returns the storage error after retries.
    pub async fn load_mastery_record(
        &self,
        user_id: &UserId,
        area: &AreaCode,
    ) -> Result<Option<MasteryRecord>, StorageError> {
        let unsaved = self
            .fallback
            .mastery_for(user_id)
            .into_iter()
            .filter(|r| r.area() == area)
            .max_by_key(MasteryRecord::last_updated);
        if unsaved.is_some() {
            return Ok(unsaved);
        }
        self.retry
            .run("get_mastery", || self.storage.mastery.get_mastery(user_id, area))
            .await
    }
}
