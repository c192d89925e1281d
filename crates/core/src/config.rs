//! Tunable engine constants.
//!
//! Every field has a default, so a TOML file only needs the keys it overrides:
//!
//! ```toml
//! recent_session_window = 5
//! decay_per_day = 0.02
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(String),

    #[error("invalid engine config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Questions answered correctly in this many recent submitted sessions are held back.
    pub recent_session_window: usize,
    /// Floor of the mastery learning rate.
    pub min_alpha: f64,
    /// Share of the distance to 0.5 that an estimate loses per idle day.
    pub decay_per_day: f64,
    /// Areas with fewer samples than this are capped in readiness.
    pub min_samples_for_mastery: u32,
    pub thin_evidence_cap: f64,
    /// Learning rate applied when a lesson is completed; must stay below `min_alpha`.
    pub lesson_credit: f64,
    pub weak_area_count: usize,
    /// Scroll percentage at which a lesson becomes completable.
    pub completable_percent: u8,
    pub idle_timeout_hours: i64,
    /// Longest allowed run of consecutive questions from one blueprint area.
    pub max_area_run: usize,
    pub persistence_retries: u32,
    pub retry_base_delay_ms: u64,
    pub scroll_throttle_ms: i64,
    /// Readiness score bands: getting close, ready, well prepared.
    pub readiness_getting_close: f64,
    pub readiness_ready: f64,
    pub readiness_well_prepared: f64,
    /// Samples an area needs before it can rank above novice.
    pub mastery_level_min_samples: u32,
    /// Samples an area needs before proficient and expert are reachable.
    pub mastery_level_full_samples: u32,
    pub developing_mastery: f64,
    pub proficient_mastery: f64,
    pub expert_mastery: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recent_session_window: 3,
            min_alpha: 0.05,
            decay_per_day: 0.01,
            min_samples_for_mastery: 5,
            thin_evidence_cap: 0.5,
            lesson_credit: 0.03,
            weak_area_count: 3,
            completable_percent: 90,
            idle_timeout_hours: 24,
            max_area_run: 2,
            persistence_retries: 3,
            retry_base_delay_ms: 50,
            scroll_throttle_ms: 16,
            readiness_getting_close: 45.0,
            readiness_ready: 65.0,
            readiness_well_prepared: 80.0,
            mastery_level_min_samples: 10,
            mastery_level_full_samples: 20,
            developing_mastery: 0.60,
            proficient_mastery: 0.75,
            expert_mastery: 0.85,
        }
    }
}

impl EngineConfig {
    /// Parse overrides from TOML and validate the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed TOML and `ConfigError::Invalid`
    /// when a value is out of range.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_alpha > 0.0 && self.min_alpha <= 1.0) {
            return Err(ConfigError::Invalid("min_alpha must be in (0, 1]"));
        }
        if !(self.decay_per_day >= 0.0 && self.decay_per_day.is_finite()) {
            return Err(ConfigError::Invalid("decay_per_day must be >= 0"));
        }
        if !(self.lesson_credit > 0.0 && self.lesson_credit < self.min_alpha) {
            return Err(ConfigError::Invalid(
                "lesson_credit must be positive and below min_alpha",
            ));
        }
        if !(0.0..=1.0).contains(&self.thin_evidence_cap) {
            return Err(ConfigError::Invalid("thin_evidence_cap must be in [0, 1]"));
        }
        if self.completable_percent == 0 || self.completable_percent > 100 {
            return Err(ConfigError::Invalid("completable_percent must be in 1..=100"));
        }
        if self.idle_timeout_hours <= 0 {
            return Err(ConfigError::Invalid("idle_timeout_hours must be > 0"));
        }
        if self.max_area_run == 0 {
            return Err(ConfigError::Invalid("max_area_run must be > 0"));
        }
        if self.scroll_throttle_ms < 0 {
            return Err(ConfigError::Invalid("scroll_throttle_ms must be >= 0"));
        }
        if !(0.0 < self.readiness_getting_close
            && self.readiness_getting_close < self.readiness_ready
            && self.readiness_ready < self.readiness_well_prepared
            && self.readiness_well_prepared <= 100.0)
        {
            return Err(ConfigError::Invalid(
                "readiness bands must ascend within (0, 100]",
            ));
        }
        if !(0.0 < self.developing_mastery
            && self.developing_mastery < self.proficient_mastery
            && self.proficient_mastery < self.expert_mastery
            && self.expert_mastery <= 1.0)
        {
            return Err(ConfigError::Invalid("mastery levels must ascend within (0, 1]"));
        }
        if self.mastery_level_min_samples > self.mastery_level_full_samples {
            return Err(ConfigError::Invalid(
                "mastery_level_min_samples must not exceed mastery_level_full_samples",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recent_session_window, 3);
        assert_eq!(config.min_samples_for_mastery, 5);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("decay_per_day = 0.02\n").unwrap();
        assert!((config.decay_per_day - 0.02).abs() < f64::EPSILON);
        assert_eq!(config.recent_session_window, 3);
    }

    #[test]
    fn lesson_credit_must_stay_below_question_credit() {
        let err = EngineConfig::from_toml_str("lesson_credit = 0.2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("min_alpha = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn readiness_bands_must_ascend() {
        let err = EngineConfig::from_toml_str("readiness_ready = 90\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = EngineConfig::from_toml_str("expert_mastery = 0.7\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
