use std::sync::{Mutex, MutexGuard, PoisonError};

use prep_core::mastery::MasteryRecord;
use prep_core::model::{ActivityEvent, Section, Session, SessionId, UserId};

/// A write that could not reach storage.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    Session(Session),
    Mastery(MasteryRecord),
    Activity(ActivityEvent),
}

impl PendingWrite {
    /// True if storing `self` makes `older` obsolete.
    fn supersedes(&self, older: &PendingWrite) -> bool {
        match (self, older) {
            (PendingWrite::Session(new), PendingWrite::Session(old)) => new.id() == old.id(),
            (PendingWrite::Mastery(new), PendingWrite::Mastery(old)) => {
                new.user_id() == old.user_id()
                    && new.area() == old.area()
                    && new.last_updated() >= old.last_updated()
            }
            _ => false,
        }
    }
}

/// Unsaved progress held in memory until storage recovers.
///
/// Writes are kept in the order they failed so a flush replays them faithfully.
#[derive(Debug, Default)]
pub struct FallbackCache {
    pending: Mutex<Vec<PendingWrite>>,
}

impl FallbackCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<PendingWrite>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, write: PendingWrite) {
        self.guard().push(write);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Drop pending writes made obsolete by a successful `write`.
    pub fn supersede(&self, write: &PendingWrite) {
        self.guard().retain(|pending| !write.supersedes(pending));
    }

    /// Take everything pending, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<PendingWrite> {
        std::mem::take(&mut *self.guard())
    }

    /// Put back writes that still failed, ahead of anything queued meanwhile.
    pub fn restore(&self, writes: Vec<PendingWrite>) {
        let mut guard = self.guard();
        let newer = std::mem::replace(&mut *guard, writes);
        guard.extend(newer);
    }

    /// Latest unsaved version of a session.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.guard().iter().rev().find_map(|write| match write {
            PendingWrite::Session(session) if session.id() == id => Some(session.clone()),
            _ => None,
        })
    }

    /// Unsaved sessions of `user_id` in `section` whose latest version is still in progress.
    #[must_use]
    pub fn active_sessions(&self, user_id: &UserId, section: Section) -> Vec<Session> {
        let guard = self.guard();
        let mut latest: Vec<&Session> = Vec::new();
        for write in guard.iter() {
            let PendingWrite::Session(session) = write else {
                continue;
            };
            if session.user_id() != user_id || session.section() != section {
                continue;
            }
            match latest.iter_mut().find(|s| s.id() == session.id()) {
                Some(slot) => *slot = session,
                None => latest.push(session),
            }
        }
        latest
            .into_iter()
            .filter(|s| s.is_in_progress())
            .cloned()
            .collect()
    }

    /// Unsaved mastery records of a user.
    #[must_use]
    pub fn mastery_for(&self, user_id: &UserId) -> Vec<MasteryRecord> {
        self.guard()
            .iter()
            .filter_map(|write| match write {
                PendingWrite::Mastery(record) if record.user_id() == user_id => Some(record.clone()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::mastery::{MasteryTracker, Outcome};
    use prep_core::model::{AreaCode, QuestionId};
    use prep_core::time::fixed_now;

    fn session() -> Session {
        Session::start(
            SessionId::generate(),
            UserId::new("u1"),
            Section::See2,
            vec![QuestionId::new("q1")],
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn newest_session_version_wins() {
        let cache = FallbackCache::new();
        let mut s = session();
        cache.push(PendingWrite::Session(s.clone()));
        s.record_answer(&QuestionId::new("q1"), 1, false, fixed_now())
            .unwrap();
        cache.push(PendingWrite::Session(s.clone()));

        assert_eq!(cache.session(s.id()), Some(s.clone()));
        assert!(cache.session(SessionId::generate()).is_none());

        cache.supersede(&PendingWrite::Session(s));
        assert!(cache.is_empty());
    }

    #[test]
    fn restore_keeps_original_order_ahead_of_new_writes() {
        let cache = FallbackCache::new();
        let a = session();
        let b = session();
        let c = session();
        cache.push(PendingWrite::Session(a.clone()));
        cache.push(PendingWrite::Session(b.clone()));

        let drained = cache.drain();
        assert!(cache.is_empty());
        cache.push(PendingWrite::Session(c.clone()));
        cache.restore(drained);

        let order: Vec<_> = cache
            .drain()
            .into_iter()
            .map(|w| match w {
                PendingWrite::Session(s) => s.id(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec![a.id(), b.id(), c.id()]);
    }

    #[test]
    fn active_sessions_follow_the_latest_version() {
        let cache = FallbackCache::new();
        let user = UserId::new("u1");
        let mut first = session();
        let second = session();
        cache.push(PendingWrite::Session(first.clone()));
        cache.push(PendingWrite::Session(second.clone()));
        assert_eq!(cache.active_sessions(&user, Section::See2).len(), 2);

        first.abandon(fixed_now()).unwrap();
        cache.push(PendingWrite::Session(first));
        let active = cache.active_sessions(&user, Section::See2);
        assert_eq!(active, vec![second]);
        assert!(cache.active_sessions(&user, Section::See1).is_empty());
        assert!(cache.active_sessions(&UserId::new("u2"), Section::See2).is_empty());
    }

    #[test]
    fn mastery_is_filtered_per_user() {
        let cache = FallbackCache::new();
        let tracker = MasteryTracker::default();
        for user in ["u1", "u2"] {
            let empty = MasteryRecord::empty(UserId::new(user), AreaCode::new("SEE2-1"), fixed_now());
            cache.push(PendingWrite::Mastery(tracker.apply_attempt(
                &empty,
                Outcome::Correct,
                fixed_now(),
            )));
        }
        assert_eq!(cache.mastery_for(&UserId::new("u1")).len(), 1);
        assert_eq!(cache.len(), 2);
    }
}
