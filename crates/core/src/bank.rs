use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::blueprint::BlueprintRegistry;
use crate::error::ValidationError;
use crate::model::{AreaCode, Difficulty, Question, QuestionId, Section};

//
// ─── CORPUS FILE ───────────────────────────────────────────────────────────────
//

/// A named group of questions for one section. Batches are organizational only.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBatch {
    pub name: String,
    pub section: Section,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct CorpusFile {
    batches: Vec<QuestionBatch>,
}

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DifficultyCounts {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl DifficultyCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }

    fn add(&mut self, difficulty: Difficulty) {
        match difficulty {
            Difficulty::Easy => self.easy += 1,
            Difficulty::Medium => self.medium += 1,
            Difficulty::Hard => self.hard += 1,
        }
    }
}

/// Corpus coverage per section and blueprint area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub total: usize,
    pub per_section: BTreeMap<Section, usize>,
    pub per_area: BTreeMap<AreaCode, DifficultyCounts>,
}

//
// ─── QUESTION BANK ─────────────────────────────────────────────────────────────
//

/// Validated, immutable question corpus indexed by id and blueprint area.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
    by_id: HashMap<QuestionId, usize>,
    by_area: HashMap<AreaCode, Vec<usize>>,
}

impl QuestionBank {
    /// Validate every question against itself and the registry.
    ///
    /// # Errors
    ///
    /// Aborts on the first invalid record or duplicate id.
    pub fn new(
        questions: Vec<Question>,
        registry: &BlueprintRegistry,
    ) -> Result<Self, ValidationError> {
        let mut by_id = HashMap::with_capacity(questions.len());
        let mut by_area: HashMap<AreaCode, Vec<usize>> = HashMap::new();

        for (idx, question) in questions.iter().enumerate() {
            question.validate()?;
            if !registry.contains(question.section, &question.blueprint_area) {
                return Err(ValidationError::UnknownArea {
                    id: question.id.clone(),
                    area: question.blueprint_area.clone(),
                    section: question.section,
                });
            }
            if by_id.insert(question.id.clone(), idx).is_some() {
                return Err(ValidationError::DuplicateQuestion(question.id.clone()));
            }
            by_area
                .entry(question.blueprint_area.clone())
                .or_default()
                .push(idx);
        }

        for section in registry.sections() {
            for area in registry.areas(section).unwrap_or_default() {
                if !by_area.contains_key(&area.code) {
                    tracing::warn!(area = %area.code, "blueprint area has no questions");
                }
            }
        }
        tracing::info!(questions = questions.len(), "question bank loaded");

        Ok(Self {
            questions,
            by_id,
            by_area,
        })
    }

    /// Flatten batches, checking that each question sits in its batch's section.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::BatchSectionMismatch` or any error of [`QuestionBank::new`].
    pub fn from_batches(
        batches: Vec<QuestionBatch>,
        registry: &BlueprintRegistry,
    ) -> Result<Self, ValidationError> {
        let mut questions = Vec::new();
        for batch in batches {
            for question in batch.questions {
                if question.section != batch.section {
                    return Err(ValidationError::BatchSectionMismatch {
                        batch: batch.name,
                        id: question.id,
                        expected: batch.section,
                        found: question.section,
                    });
                }
                questions.push(question);
            }
        }
        Self::new(questions, registry)
    }

    /// Load a corpus document of the form `{"batches": [{name, section, questions}]}`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Parse` for malformed JSON, otherwise the
    /// errors of [`QuestionBank::from_batches`].
    pub fn from_json_str(input: &str, registry: &BlueprintRegistry) -> Result<Self, ValidationError> {
        let corpus: CorpusFile = serde_json::from_str(input).map_err(|e| ValidationError::Parse {
            what: "question corpus",
            message: e.to_string(),
        })?;
        Self::from_batches(corpus.batches, registry)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.by_id.get(id).map(|&idx| &self.questions[idx])
    }

    /// Questions tagged with `area`, in corpus order.
    pub fn area_questions<'a>(
        &'a self,
        area: &AreaCode,
    ) -> impl Iterator<Item = &'a Question> + use<'a> {
        self.by_area
            .get(area)
            .into_iter()
            .flatten()
            .map(|&idx| &self.questions[idx])
    }

    pub fn section_questions(&self, section: Section) -> impl Iterator<Item = &Question> + '_ {
        self.questions.iter().filter(move |q| q.section == section)
    }

    #[must_use]
    pub fn stats(&self) -> CorpusStats {
        let mut stats = CorpusStats {
            total: self.questions.len(),
            ..CorpusStats::default()
        };
        for q in &self.questions {
            *stats.per_section.entry(q.section).or_default() += 1;
            stats
                .per_area
                .entry(q.blueprint_area.clone())
                .or_default()
                .add(q.difficulty);
        }
        stats
    }
}
