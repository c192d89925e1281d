use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::ValidationError;
use crate::model::{AreaCode, Section};

/// Allowed deviation of a section's midpoint total from 100.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1.0;

//
// ─── BLUEPRINT AREA ────────────────────────────────────────────────────────────
//

/// Official exam sub-domain with its published weight range, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintArea {
    pub code: AreaCode,
    pub section: Section,
    pub label: String,
    pub weight_min: f64,
    pub weight_max: f64,
}

impl BlueprintArea {
    #[must_use]
    pub fn new(
        code: impl Into<AreaCode>,
        section: Section,
        label: impl Into<String>,
        weight_min: f64,
        weight_max: f64,
    ) -> Self {
        Self {
            code: code.into(),
            section,
            label: label.into(),
            weight_min,
            weight_max,
        }
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.weight_min + self.weight_max) / 2.0
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let in_range = |w: f64| w.is_finite() && (0.0..=100.0).contains(&w);
        if !in_range(self.weight_min)
            || !in_range(self.weight_max)
            || self.weight_min > self.weight_max
            || self.weight_max <= 0.0
        {
            return Err(ValidationError::InvalidWeightRange {
                code: self.code.clone(),
                min: self.weight_min,
                max: self.weight_max,
            });
        }
        if self.label.trim().is_empty() {
            return Err(ValidationError::EmptyLabel {
                code: self.code.clone(),
            });
        }
        Ok(())
    }
}

//
// ─── REGISTRY ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct RegistryFile {
    areas: Vec<BlueprintArea>,
}

/// Per-section ordered blueprint areas. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintRegistry {
    sections: BTreeMap<Section, Vec<BlueprintArea>>,
}

impl BlueprintRegistry {
    /// Build a registry, keeping areas in the order given.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for duplicate codes, bad weight ranges, or a
    /// section whose midpoints do not sum to 100 ± 1.
    pub fn new(areas: Vec<BlueprintArea>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        let mut sections: BTreeMap<Section, Vec<BlueprintArea>> = BTreeMap::new();
        for area in areas {
            area.validate()?;
            if !seen.insert(area.code.clone()) {
                return Err(ValidationError::DuplicateArea(area.code));
            }
            sections.entry(area.section).or_default().push(area);
        }

        let registry = Self { sections };
        for section in registry.sections() {
            let sum = registry.midpoint_sum(section);
            if (sum - 100.0).abs() > WEIGHT_SUM_TOLERANCE + f64::EPSILON {
                return Err(ValidationError::WeightSum { section, sum });
            }
        }
        tracing::debug!(
            sections = registry.sections.len(),
            areas = seen.len(),
            "blueprint registry validated"
        );
        Ok(registry)
    }

    /// Parse `[[areas]]` tables from TOML.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Parse` for malformed TOML, otherwise the
    /// errors of [`BlueprintRegistry::new`].
    pub fn from_toml_str(input: &str) -> Result<Self, ValidationError> {
        let file: RegistryFile = toml::from_str(input).map_err(|e| ValidationError::Parse {
            what: "blueprint registry",
            message: e.to_string(),
        })?;
        Self::new(file.areas)
    }

    /// The Enrolled Agent Special Enrollment Examination blueprint.
    #[must_use]
    pub fn enrolled_agent() -> Self {
        let see1 = [
            ("SEE1-1", "Preliminary Work and Taxpayer Data", 15.0, 19.0),
            ("SEE1-2", "Income and Assets", 20.0, 24.0),
            ("SEE1-3", "Deductions and Adjustments", 19.0, 23.0),
            ("SEE1-4", "Taxation and Advice", 15.0, 19.0),
            ("SEE1-5", "Credits", 13.0, 17.0),
            ("SEE1-6", "Specialized Returns", 6.0, 10.0),
        ];
        let see2 = [
            ("SEE2-1", "Business Entities", 26.0, 30.0),
            ("SEE2-2", "Business Income and Expenses", 25.0, 29.0),
            ("SEE2-3", "Specific Types of Business Taxes", 8.0, 12.0),
            ("SEE2-4", "Business Assets", 18.0, 22.0),
            ("SEE2-5", "Trusts, Estates, and Tax-Exempt Organizations", 6.0, 10.0),
            ("SEE2-6", "Retirement Plans for Small Business", 5.0, 9.0),
        ];
        let see3 = [
            ("SEE3-1", "Practices and Procedures", 23.0, 27.0),
            ("SEE3-2", "Representation Before the IRS", 18.0, 22.0),
            ("SEE3-3", "Circular 230", 23.0, 27.0),
            ("SEE3-4", "Completion of the Filing Process", 15.0, 19.0),
            ("SEE3-5", "Preparer Responsibilities", 11.0, 15.0),
        ];

        let mut sections = BTreeMap::new();
        for (section, rows) in [
            (Section::See1, &see1[..]),
            (Section::See2, &see2[..]),
            (Section::See3, &see3[..]),
        ] {
            let areas = rows
                .iter()
                .map(|&(code, label, min, max)| BlueprintArea::new(code, section, label, min, max))
                .collect();
            sections.insert(section, areas);
        }
        Self { sections }
    }

    /// Sections that have at least one area, in canonical order.
    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.sections.keys().copied()
    }

    /// Ordered areas of a section, or `None` if the section is not registered.
    #[must_use]
    pub fn areas(&self, section: Section) -> Option<&[BlueprintArea]> {
        self.sections.get(&section).map(Vec::as_slice)
    }

    #[must_use]
    pub fn area(&self, code: &AreaCode) -> Option<&BlueprintArea> {
        self.sections
            .values()
            .flat_map(|areas| areas.iter())
            .find(|a| &a.code == code)
    }

    #[must_use]
    pub fn contains(&self, section: Section, code: &AreaCode) -> bool {
        self.areas(section)
            .is_some_and(|areas| areas.iter().any(|a| &a.code == code))
    }

    #[must_use]
    pub fn midpoint_sum(&self, section: Section) -> f64 {
        self.areas(section)
            .map(|areas| areas.iter().map(BlueprintArea::midpoint).sum())
            .unwrap_or(0.0)
    }

    /// Midpoint of `code` as a fraction of its section total (sums to 1 per section).
    #[must_use]
    pub fn weight_fraction(&self, code: &AreaCode) -> Option<f64> {
        let area = self.area(code)?;
        let total = self.midpoint_sum(area.section);
        (total > 0.0).then(|| area.midpoint() / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrolled_agent_blueprint_is_valid() {
        let builtin = BlueprintRegistry::enrolled_agent();
        let areas: Vec<_> = Section::ALL
            .iter()
            .flat_map(|s| builtin.areas(*s).unwrap().to_vec())
            .collect();
        let rebuilt = BlueprintRegistry::new(areas).unwrap();
        assert_eq!(rebuilt, builtin);
    }

    #[test]
    fn every_section_midpoint_sum_is_hundred() {
        let registry = BlueprintRegistry::enrolled_agent();
        for section in registry.sections() {
            let sum = registry.midpoint_sum(section);
            assert!((sum - 100.0).abs() <= WEIGHT_SUM_TOLERANCE, "{section}: {sum}");
        }
    }

    #[test]
    fn weight_fractions_sum_to_one() {
        let registry = BlueprintRegistry::enrolled_agent();
        let total: f64 = registry
            .areas(Section::See3)
            .unwrap()
            .iter()
            .map(|a| registry.weight_fraction(&a.code).unwrap())
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_midpoint_sum() {
        let err = BlueprintRegistry::new(vec![
            BlueprintArea::new("SEE1-1", Section::See1, "One", 15.0, 20.0),
            BlueprintArea::new("SEE1-2", Section::See1, "Two", 20.0, 25.0),
        ])
        .unwrap_err();
        assert!(matches!(err, ValidationError::WeightSum { section: Section::See1, .. }));
    }

    #[test]
    fn tolerates_rounding_within_one_point() {
        let registry = BlueprintRegistry::new(vec![
            BlueprintArea::new("SEE1-1", Section::See1, "One", 33.0, 34.0),
            BlueprintArea::new("SEE1-2", Section::See1, "Two", 33.0, 34.0),
            BlueprintArea::new("SEE1-3", Section::See1, "Three", 32.0, 33.0),
        ]);
        assert!(registry.is_ok());
    }

    #[test]
    fn rejects_duplicate_codes_and_inverted_ranges() {
        let dup = BlueprintRegistry::new(vec![
            BlueprintArea::new("SEE1-1", Section::See1, "One", 50.0, 50.0),
            BlueprintArea::new("SEE1-1", Section::See1, "Again", 50.0, 50.0),
        ])
        .unwrap_err();
        assert!(matches!(dup, ValidationError::DuplicateArea(_)));

        let inverted = BlueprintRegistry::new(vec![BlueprintArea::new(
            "SEE1-1",
            Section::See1,
            "One",
            60.0,
            40.0,
        )])
        .unwrap_err();
        assert!(matches!(inverted, ValidationError::InvalidWeightRange { .. }));
    }

    #[test]
    fn parses_toml_registry() {
        let toml = r#"
            [[areas]]
            code = "SEE3-1"
            section = "SEE3"
            label = "Practices"
            weight_min = 45
            weight_max = 55

            [[areas]]
            code = "SEE3-2"
            section = "SEE3"
            label = "Representation"
            weight_min = 45.0
            weight_max = 55.0
        "#;
        let registry = BlueprintRegistry::from_toml_str(toml).unwrap();
        assert_eq!(registry.areas(Section::See3).unwrap().len(), 2);
        assert!(registry.areas(Section::See1).is_none());
        assert!(registry.contains(Section::See3, &AreaCode::new("SEE3-2")));
        assert!(!registry.contains(Section::See1, &AreaCode::new("SEE3-2")));
    }
}
