use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::model::{AreaCode, UserId};
use crate::time::elapsed_days;

/// Value an unused estimate decays toward.
pub const DECAY_TARGET: f64 = 0.5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum MasteryError {
    #[error("mastery estimate must be in [0, 1], got {0}")]
    InvalidEstimate(f64),
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Proficiency estimate of one user in one blueprint area.
///
/// Records are created lazily on first evidence and only ever replaced by a
/// newer version; nothing deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    user_id: UserId,
    area: AreaCode,
    estimate: f64,
    last_updated: DateTime<Utc>,
    sample_count: u32,
}

impl MasteryRecord {
    /// A record with no evidence yet.
    #[must_use]
    pub fn empty(user_id: UserId, area: AreaCode, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            area,
            estimate: 0.0,
            last_updated: at,
            sample_count: 0,
        }
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `MasteryError::InvalidEstimate` if the estimate is outside `[0, 1]`.
    pub fn from_persisted(
        user_id: UserId,
        area: AreaCode,
        estimate: f64,
        last_updated: DateTime<Utc>,
        sample_count: u32,
    ) -> Result<Self, MasteryError> {
        if !(0.0..=1.0).contains(&estimate) {
            return Err(MasteryError::InvalidEstimate(estimate));
        }
        Ok(Self {
            user_id,
            area,
            estimate,
            last_updated,
            sample_count,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn area(&self) -> &AreaCode {
        &self.area
    }

    /// Stored estimate without decay.
    #[must_use]
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Number of scored question attempts; lesson credit does not count.
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

impl Outcome {
    #[must_use]
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        match self {
            Outcome::Correct => 1.0,
            Outcome::Incorrect => 0.0,
        }
    }
}

/// Decayed estimate plus the evidence behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryReading {
    pub estimate: f64,
    pub sample_count: u32,
}

impl MasteryReading {
    pub const UNSEEN: MasteryReading = MasteryReading {
        estimate: 0.0,
        sample_count: 0,
    };
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// Recency-weighted mastery estimation with lazy forgetting.
///
/// Each scored attempt moves the estimate toward the outcome by
/// `α = max(min_alpha, 1 / (samples + 1))`: the first answer sets the estimate
/// outright, later answers move it less and less until the floor is reached.
///
/// # Examples
///
/// ```
/// # use prep_core::mastery::{MasteryRecord, MasteryTracker, Outcome};
/// # use prep_core::model::{AreaCode, UserId};
/// let tracker = MasteryTracker::default();
/// let now = chrono::Utc::now();
/// let record = MasteryRecord::empty(UserId::new("u1"), AreaCode::new("SEE1-2"), now);
///
/// let record = tracker.apply_attempt(&record, Outcome::Correct, now);
/// assert_eq!(record.estimate(), 1.0);
///
/// let record = tracker.apply_attempt(&record, Outcome::Incorrect, now);
/// assert_eq!(record.estimate(), 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryTracker {
    min_alpha: f64,
    decay_per_day: f64,
    lesson_credit: f64,
}

impl MasteryTracker {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_alpha: config.min_alpha,
            decay_per_day: config.decay_per_day,
            lesson_credit: config.lesson_credit,
        }
    }

    /// Learning rate for a record that already holds `sample_count` attempts.
    #[must_use]
    pub fn alpha(&self, sample_count: u32) -> f64 {
        (1.0 / (f64::from(sample_count) + 1.0)).max(self.min_alpha)
    }

    /// Fold one scored attempt into the record, returning the new version.
    #[must_use]
    pub fn apply_attempt(
        &self,
        record: &MasteryRecord,
        outcome: Outcome,
        at: DateTime<Utc>,
    ) -> MasteryRecord {
        let alpha = self.alpha(record.sample_count);
        let estimate = record.estimate + alpha * (outcome.value() - record.estimate);
        MasteryRecord {
            user_id: record.user_id.clone(),
            area: record.area.clone(),
            estimate: estimate.clamp(0.0, 1.0),
            last_updated: at.max(record.last_updated),
            sample_count: record.sample_count.saturating_add(1),
        }
    }

    /// Partial credit for finishing a lesson; not counted as a sample.
    #[must_use]
    pub fn apply_lesson_credit(&self, record: &MasteryRecord, at: DateTime<Utc>) -> MasteryRecord {
        let estimate = record.estimate + self.lesson_credit * (1.0 - record.estimate);
        MasteryRecord {
            user_id: record.user_id.clone(),
            area: record.area.clone(),
            estimate: estimate.clamp(0.0, 1.0),
            last_updated: at.max(record.last_updated),
            sample_count: record.sample_count,
        }
    }

    /// Estimate as of `now`, drifted toward 0.5 by idle time. The record is untouched.
    #[must_use]
    pub fn decayed_estimate(&self, record: &MasteryRecord, now: DateTime<Utc>) -> f64 {
        let days = elapsed_days(record.last_updated, now);
        let fraction = (self.decay_per_day * days).min(1.0);
        let value = record.estimate + (DECAY_TARGET - record.estimate) * fraction;
        value.clamp(0.0, 1.0)
    }

    /// Read an optional record; missing records read as unseen.
    #[must_use]
    pub fn read(&self, record: Option<&MasteryRecord>, now: DateTime<Utc>) -> MasteryReading {
        match record {
            Some(record) => MasteryReading {
                estimate: self.decayed_estimate(record, now),
                sample_count: record.sample_count,
            },
            None => MasteryReading::UNSEEN,
        }
    }
}

impl Default for MasteryTracker {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn empty() -> MasteryRecord {
        MasteryRecord::empty(UserId::new("u1"), AreaCode::new("SEE1-1"), fixed_now())
    }

    #[test]
    fn alpha_starts_at_one_and_floors() {
        let t = MasteryTracker::default();
        assert_eq!(t.alpha(0), 1.0);
        assert_eq!(t.alpha(1), 0.5);
        assert_eq!(t.alpha(3), 0.25);
        assert_eq!(t.alpha(19), 0.05);
        assert_eq!(t.alpha(500), 0.05);
    }

    #[test]
    fn correct_stream_rises_monotonically_without_exceeding_one() {
        let t = MasteryTracker::default();
        let mut record = t.apply_attempt(&empty(), Outcome::Incorrect, fixed_now());
        let mut previous = record.estimate();
        for _ in 0..200 {
            record = t.apply_attempt(&record, Outcome::Correct, fixed_now());
            assert!(record.estimate() >= previous);
            assert!(record.estimate() <= 1.0);
            previous = record.estimate();
        }
        assert!(record.estimate() > 0.99);
    }

    #[test]
    fn incorrect_stream_falls_toward_zero() {
        let t = MasteryTracker::default();
        let mut record = t.apply_attempt(&empty(), Outcome::Correct, fixed_now());
        let mut previous = record.estimate();
        for _ in 0..200 {
            record = t.apply_attempt(&record, Outcome::Incorrect, fixed_now());
            assert!(record.estimate() <= previous);
            assert!(record.estimate() >= 0.0);
            previous = record.estimate();
        }
        assert!(record.estimate() < 0.01);
    }

    #[test]
    fn attempts_count_samples_and_lesson_credit_does_not() {
        let t = MasteryTracker::default();
        let record = t.apply_attempt(&empty(), Outcome::Correct, fixed_now());
        assert_eq!(record.sample_count(), 1);

        let credited = t.apply_lesson_credit(&empty(), fixed_now());
        assert_eq!(credited.sample_count(), 0);
        assert!(credited.estimate() > 0.0);
        assert!(credited.estimate() < t.alpha(u32::MAX));
    }

    #[test]
    fn decay_is_lazy_and_moves_toward_half() {
        let t = MasteryTracker::default();
        let record = t.apply_attempt(&empty(), Outcome::Correct, fixed_now());

        let later = fixed_now() + Duration::days(10);
        let decayed = t.decayed_estimate(&record, later);
        assert!((decayed - 0.95).abs() < 1e-9);
        assert_eq!(record.estimate(), 1.0);

        let far = fixed_now() + Duration::days(1000);
        assert!((t.decayed_estimate(&record, far) - DECAY_TARGET).abs() < 1e-9);
    }

    #[test]
    fn low_estimates_decay_upward() {
        let t = MasteryTracker::default();
        let record = t.apply_attempt(&empty(), Outcome::Incorrect, fixed_now());
        let decayed = t.decayed_estimate(&record, fixed_now() + Duration::days(20));
        assert!((decayed - 0.1).abs() < 1e-9);
    }

    #[test]
    fn missing_record_reads_as_unseen() {
        let t = MasteryTracker::default();
        assert_eq!(t.read(None, fixed_now()), MasteryReading::UNSEEN);
    }

    #[test]
    fn from_persisted_rejects_out_of_range() {
        let err = MasteryRecord::from_persisted(
            UserId::new("u1"),
            AreaCode::new("SEE1-1"),
            1.5,
            fixed_now(),
            3,
        )
        .unwrap_err();
        assert_eq!(err, MasteryError::InvalidEstimate(1.5));
    }
}
