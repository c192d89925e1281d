use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::blueprint::BlueprintRegistry;
use crate::config::EngineConfig;
use crate::error::RequestError;
use crate::mastery::{MasteryRecord, MasteryTracker};
use crate::model::{AreaCode, Section, UserId};

//
// ─── LEVELS ────────────────────────────────────────────────────────────────────
//

/// Band of a readiness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessLevel {
    NotReady,
    GettingClose,
    Ready,
    WellPrepared,
}

impl ReadinessLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReadinessLevel::NotReady => "not-ready",
            ReadinessLevel::GettingClose => "getting-close",
            ReadinessLevel::Ready => "ready",
            ReadinessLevel::WellPrepared => "well-prepared",
        }
    }
}

impl fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Label for one area's mastery, gated on how much evidence backs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    Novice,
    Developing,
    Proficient,
    Expert,
}

impl MasteryLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MasteryLevel::Novice => "novice",
            MasteryLevel::Developing => "developing",
            MasteryLevel::Proficient => "proficient",
            MasteryLevel::Expert => "expert",
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LevelThresholds {
    getting_close: f64,
    ready: f64,
    well_prepared: f64,
    min_samples: u32,
    full_samples: u32,
    developing: f64,
    proficient: f64,
    expert: f64,
}

impl LevelThresholds {
    fn from_config(config: &EngineConfig) -> Self {
        Self {
            getting_close: config.readiness_getting_close,
            ready: config.readiness_ready,
            well_prepared: config.readiness_well_prepared,
            min_samples: config.mastery_level_min_samples,
            full_samples: config.mastery_level_full_samples,
            developing: config.developing_mastery,
            proficient: config.proficient_mastery,
            expert: config.expert_mastery,
        }
    }

    fn readiness(&self, score: f64) -> ReadinessLevel {
        if score >= self.well_prepared {
            ReadinessLevel::WellPrepared
        } else if score >= self.ready {
            ReadinessLevel::Ready
        } else if score >= self.getting_close {
            ReadinessLevel::GettingClose
        } else {
            ReadinessLevel::NotReady
        }
    }

    fn mastery(&self, mastery: f64, samples: u32) -> MasteryLevel {
        if samples < self.min_samples {
            return MasteryLevel::Novice;
        }
        if samples < self.full_samples || mastery < self.proficient {
            return if mastery >= self.developing {
                MasteryLevel::Developing
            } else {
                MasteryLevel::Novice
            };
        }
        if mastery >= self.expert {
            MasteryLevel::Expert
        } else {
            MasteryLevel::Proficient
        }
    }
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// One blueprint area's share of a readiness score.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaReadiness {
    pub area: AreaCode,
    pub label: String,
    /// Fraction of the section, summing to 1 across areas.
    pub weight: f64,
    /// Decayed estimate before the coverage cap.
    pub mastery: f64,
    /// Estimate actually credited toward the score.
    pub effective_mastery: f64,
    pub sample_count: u32,
    /// Points (out of 100) this area adds to the score.
    pub contribution: f64,
    pub level: MasteryLevel,
}

/// Derived exam-readiness snapshot. Never persisted as a source of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessScore {
    pub user_id: UserId,
    pub section: Section,
    pub score: f64,
    pub level: ReadinessLevel,
    pub areas: Vec<AreaReadiness>,
    /// Lowest `weight × mastery` first.
    pub weak_areas: Vec<AreaCode>,
    pub computed_at: DateTime<Utc>,
}

impl ReadinessScore {
    /// Score rounded to a whole percentage for display.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rounded(&self) -> u8 {
        self.score.round().clamp(0.0, 100.0) as u8
    }
}

/// Aggregates mastery and blueprint weights into a 0–100 score.
#[derive(Debug, Clone)]
pub struct ReadinessEstimator<'a> {
    registry: &'a BlueprintRegistry,
    tracker: MasteryTracker,
    min_samples: u32,
    thin_evidence_cap: f64,
    weak_area_count: usize,
    levels: LevelThresholds,
}

impl<'a> ReadinessEstimator<'a> {
    #[must_use]
    pub fn new(registry: &'a BlueprintRegistry, config: &EngineConfig) -> Self {
        Self {
            registry,
            tracker: MasteryTracker::new(config),
            min_samples: config.min_samples_for_mastery,
            thin_evidence_cap: config.thin_evidence_cap,
            weak_area_count: config.weak_area_count,
            levels: LevelThresholds::from_config(config),
        }
    }

    /// Band for a readiness score.
    #[must_use]
    pub fn readiness_level(&self, score: f64) -> ReadinessLevel {
        self.levels.readiness(score)
    }

    /// Label for an area's mastery given its sample count.
    #[must_use]
    pub fn mastery_level(&self, mastery: f64, sample_count: u32) -> MasteryLevel {
        self.levels.mastery(mastery, sample_count)
    }

    /// Score `section` from the user's records; records of other sections are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::UnknownSection` if the registry has no such section.
    pub fn estimate(
        &self,
        user_id: &UserId,
        section: Section,
        records: &[MasteryRecord],
        now: DateTime<Utc>,
    ) -> Result<ReadinessScore, RequestError> {
        let areas = self
            .registry
            .areas(section)
            .ok_or_else(|| RequestError::UnknownSection(section.to_string()))?;
        let total_weight = self.registry.midpoint_sum(section);
        let by_area: HashMap<&AreaCode, &MasteryRecord> =
            records.iter().map(|r| (r.area(), r)).collect();

        let mut breakdown = Vec::with_capacity(areas.len());
        for area in areas {
            let weight = area.midpoint() / total_weight;
            let reading = self
                .tracker
                .read(by_area.get(&area.code).copied(), now);
            let mastery = reading.estimate.clamp(0.0, 1.0);
            let effective_mastery = if reading.sample_count == 0 {
                0.0
            } else if reading.sample_count < self.min_samples {
                mastery.min(self.thin_evidence_cap)
            } else {
                mastery
            };
            breakdown.push(AreaReadiness {
                area: area.code.clone(),
                label: area.label.clone(),
                weight,
                mastery,
                effective_mastery,
                sample_count: reading.sample_count,
                contribution: 100.0 * weight * effective_mastery,
                level: self.levels.mastery(mastery, reading.sample_count),
            });
        }

        let score = breakdown
            .iter()
            .map(|a| a.contribution)
            .sum::<f64>()
            .clamp(0.0, 100.0);

        let mut ranked: Vec<&AreaReadiness> = breakdown.iter().collect();
        // stable sort keeps registry order among equal products
        ranked.sort_by(|a, b| {
            (a.weight * a.effective_mastery).total_cmp(&(b.weight * b.effective_mastery))
        });
        let weak_areas = ranked
            .into_iter()
            .take(self.weak_area_count)
            .map(|a| a.area.clone())
            .collect();

        Ok(ReadinessScore {
            user_id: user_id.clone(),
            section,
            score,
            level: self.levels.readiness(score),
            areas: breakdown,
            weak_areas,
            computed_at: now,
        })
    }
}
