use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::ValidationError;
use crate::model::ids::{AreaCode, QuestionId};

/// Every question in the corpus offers exactly this many choices.
pub const OPTION_COUNT: usize = 4;

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// Exam part a question or blueprint area belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "SEE1")]
    See1,
    #[serde(rename = "SEE2")]
    See2,
    #[serde(rename = "SEE3")]
    See3,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::See1, Section::See2, Section::See3];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Section::See1 => "SEE1",
            Section::See2 => "SEE2",
            Section::See3 => "SEE3",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown section: {0}")]
pub struct ParseSectionError(pub String);

impl FromStr for Section {
    type Err = ParseSectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SEE1" => Ok(Section::See1),
            "SEE2" => Ok(Section::See2),
            "SEE3" => Ok(Section::See3),
            _ => Err(ParseSectionError(s.to_owned())),
        }
    }
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown difficulty: {0}")]
pub struct ParseDifficultyError(pub String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ParseDifficultyError(s.to_owned())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice item from the authored corpus.
///
/// Field names follow the corpus JSON (`camelCase`); the authored text field
/// `question` is accepted as an alias of `prompt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub course_id: String,
    pub section: Section,
    pub blueprint_area: AreaCode,
    pub topic: String,
    #[serde(default)]
    pub subtopic: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub skill_level: String,
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
    #[serde(default)]
    pub reference: String,
}

impl Question {
    /// Checks the record in isolation; registry membership is checked by the bank.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyField {
                id: self.id.clone(),
                field: "id",
            });
        }
        for (field, value) in [
            ("prompt", &self.prompt),
            ("topic", &self.topic),
            ("explanation", &self.explanation),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField {
                    id: self.id.clone(),
                    field,
                });
            }
        }

        if self.options.len() != OPTION_COUNT {
            return Err(ValidationError::OptionCount {
                id: self.id.clone(),
                found: self.options.len(),
            });
        }
        let mut seen = HashSet::with_capacity(OPTION_COUNT);
        for option in &self.options {
            let normalized = option.trim();
            if normalized.is_empty() {
                return Err(ValidationError::EmptyField {
                    id: self.id.clone(),
                    field: "option",
                });
            }
            // identical texts would make more than one index correct
            if !seen.insert(normalized) {
                return Err(ValidationError::DuplicateOption { id: self.id.clone() });
            }
        }

        if self.correct_answer >= OPTION_COUNT {
            return Err(ValidationError::CorrectAnswerOutOfRange {
                id: self.id.clone(),
                index: self.correct_answer,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_answer
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Question {
        Question {
            id: QuestionId::new("see1-001"),
            course_id: "ea".into(),
            section: Section::See1,
            blueprint_area: AreaCode::new("SEE1-1"),
            topic: "Filing Requirements".into(),
            subtopic: "Who Must File".into(),
            difficulty: Difficulty::Easy,
            skill_level: "Remembering and Understanding".into(),
            prompt: "Which threshold applies?".into(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: 1,
            explanation: "Because B.".into(),
            reference: "IRC 6012".into(),
        }
    }

    #[test]
    fn valid_question_passes() {
        assert!(sample().validate().is_ok());
        assert!(sample().is_correct(1));
        assert!(!sample().is_correct(0));
    }

    #[test]
    fn rejects_wrong_option_count() {
        let mut q = sample();
        q.options.pop();
        assert!(matches!(
            q.validate(),
            Err(ValidationError::OptionCount { found: 3, .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_answer() {
        let mut q = sample();
        q.correct_answer = 4;
        assert!(matches!(
            q.validate(),
            Err(ValidationError::CorrectAnswerOutOfRange { index: 4, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_option_text() {
        let mut q = sample();
        q.options[3] = " B ".into();
        assert!(matches!(
            q.validate(),
            Err(ValidationError::DuplicateOption { .. })
        ));
    }

    #[test]
    fn rejects_blank_prompt() {
        let mut q = sample();
        q.prompt = "  ".into();
        assert!(matches!(
            q.validate(),
            Err(ValidationError::EmptyField { field: "prompt", .. })
        ));
    }

    #[test]
    fn deserializes_corpus_shape() {
        let json = r#"{
            "id": "see1-002",
            "courseId": "ea",
            "section": "SEE1",
            "blueprintArea": "SEE1-1",
            "topic": "Filing Status",
            "subtopic": "Head of Household",
            "difficulty": "medium",
            "skillLevel": "Application",
            "question": "What is the filing status?",
            "options": ["Single", "Head of Household", "QSS", "MFS"],
            "correctAnswer": 1,
            "explanation": "HOH applies.",
            "reference": "IRC 2(b)"
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.section, Section::See1);
        assert_eq!(q.difficulty, Difficulty::Medium);
        assert_eq!(q.prompt, "What is the filing status?");
        assert!(q.validate().is_ok());
    }

    #[test]
    fn section_and_difficulty_parse() {
        assert_eq!("see2".parse::<Section>().unwrap(), Section::See2);
        assert!("SEE4".parse::<Section>().is_err());
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
    }
}
