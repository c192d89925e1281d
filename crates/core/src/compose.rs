//! Blueprint-weighted session composition.
//!
//! A session of `N` questions is split across the section's blueprint areas by
//! largest-remainder apportionment of the weight midpoints, filled per area
//! with a difficulty bias driven by the learner's mastery, then shuffled and
//! interleaved so no area appears more than `max_run` times in a row.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use crate::bank::QuestionBank;
use crate::blueprint::{BlueprintArea, BlueprintRegistry};
use crate::error::{ComposeError, RequestError};
use crate::model::{AreaCode, Difficulty, Question, QuestionId, Section};

/// Optional narrowing of a composition request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    /// Only draw questions of this difficulty.
    pub difficulty: Option<Difficulty>,
    /// Never draw these questions.
    pub exclude: HashSet<QuestionId>,
    /// Restrict the session to these areas (practice links); empty means all.
    pub areas: Vec<AreaCode>,
    /// Fixed seed for reproducible sessions.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionRequest {
    pub section: Section,
    pub count: usize,
    pub constraints: Constraints,
}

impl CompositionRequest {
    #[must_use]
    pub fn new(section: Section, count: usize) -> Self {
        Self {
            section,
            count,
            constraints: Constraints::default(),
        }
    }

    #[must_use]
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }
}

/// What the composer knows about the learner.
#[derive(Debug, Clone, Default)]
pub struct LearnerContext {
    /// Questions answered correctly in the recent submitted sessions.
    pub recently_correct: HashSet<QuestionId>,
    /// Current (decayed) mastery per area; missing areas count as 0.
    pub mastery: HashMap<AreaCode, f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaAllocation {
    pub area: AreaCode,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedSession {
    pub section: Section,
    pub question_ids: Vec<QuestionId>,
    pub allocation: Vec<AreaAllocation>,
}

//
// ─── ALLOCATION ────────────────────────────────────────────────────────────────
//

/// Split `count` across `weights` by the largest-remainder method.
///
/// Each share gets the floor of its exact quota; leftover units go to the
/// largest fractional parts, earlier entries winning ties. The result always
/// sums to `count` when any weight is positive.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn allocate(weights: &[f64], count: usize) -> Vec<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 {
        return vec![0; weights.len()];
    }

    let quotas: Vec<f64> = weights
        .iter()
        .map(|w| count as f64 * w.max(0.0) / total)
        .collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = quotas[a] - quotas[a].floor();
        let fb = quotas[b] - quotas[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    for &idx in order.iter().take(count.saturating_sub(assigned)) {
        counts[idx] += 1;
    }
    counts
}

/// Difficulties favoured for a given mastery estimate.
#[must_use]
pub fn difficulty_band(mastery: f64) -> &'static [Difficulty] {
    if mastery < 0.4 {
        &[Difficulty::Easy, Difficulty::Medium]
    } else if mastery <= 0.7 {
        &[Difficulty::Medium]
    } else {
        &[Difficulty::Medium, Difficulty::Hard]
    }
}

//
// ─── INTERLEAVING ──────────────────────────────────────────────────────────────
//

fn run_exceeded<T, K: PartialEq>(items: &[T], key: &impl Fn(&T) -> &K, i: usize, max_run: usize) -> bool {
    i >= max_run && (1..=max_run).all(|k| key(&items[i - k]) == key(&items[i]))
}

/// Break runs longer than `max_run` by swapping the offending item with the
/// next later item of another key. Returns false if some run could not be broken.
pub(crate) fn swap_forward<T, K: PartialEq>(
    items: &mut [T],
    key: impl Fn(&T) -> &K,
    max_run: usize,
) -> bool {
    for i in max_run..items.len() {
        if !run_exceeded(items, &key, i, max_run) {
            continue;
        }
        let replacement = (i + 1..items.len()).find(|&j| key(&items[j]) != key(&items[i]));
        match replacement {
            Some(j) => items.swap(i, j),
            None => return false,
        }
    }
    true
}

/// Rebuild an order greedily: always take the key with the most items left
/// among those that would not extend a full run. Earlier-seen keys win ties.
pub(crate) fn rebuild_order<T, K: Eq + Hash + Clone>(
    items: Vec<T>,
    key: impl Fn(&T) -> &K,
    max_run: usize,
) -> Vec<T> {
    let total = items.len();
    let mut groups: Vec<(K, VecDeque<T>)> = Vec::new();
    for item in items {
        let k = key(&item).clone();
        match groups.iter_mut().find(|(g, _)| *g == k) {
            Some((_, queue)) => queue.push_back(item),
            None => groups.push((k, VecDeque::from([item]))),
        }
    }

    let mut out = Vec::with_capacity(total);
    let mut last: Option<usize> = None;
    let mut run = 0;
    while out.len() < total {
        let blocked = if run >= max_run { last } else { None };
        let pick = groups
            .iter()
            .enumerate()
            .filter(|(i, (_, queue))| !queue.is_empty() && Some(*i) != blocked)
            .max_by(|(ia, (_, a)), (ib, (_, b))| a.len().cmp(&b.len()).then(ib.cmp(ia)))
            .map(|(i, _)| i)
            // only the blocked key is left: the run cannot be avoided
            .or(blocked);
        let Some(i) = pick else { break };
        let Some(item) = groups[i].1.pop_front() else { break };
        out.push(item);
        if last == Some(i) {
            run += 1;
        } else {
            last = Some(i);
            run = 1;
        }
    }
    out
}

//
// ─── COMPOSER ──────────────────────────────────────────────────────────────────
//

/// Builds practice and mock-exam sessions from an injected bank and registry.
#[derive(Debug, Clone, Copy)]
pub struct SessionComposer<'a> {
    bank: &'a QuestionBank,
    registry: &'a BlueprintRegistry,
    max_run: usize,
}

impl<'a> SessionComposer<'a> {
    #[must_use]
    pub fn new(bank: &'a QuestionBank, registry: &'a BlueprintRegistry) -> Self {
        Self {
            bank,
            registry,
            max_run: 2,
        }
    }

    #[must_use]
    pub fn with_max_run(mut self, max_run: usize) -> Self {
        self.max_run = max_run.max(1);
        self
    }

    /// Compose a session, seeded from the request or from the thread RNG.
    ///
    /// # Errors
    ///
    /// See [`SessionComposer::compose_with_rng`].
    pub fn compose(
        &self,
        request: &CompositionRequest,
        learner: &LearnerContext,
    ) -> Result<ComposedSession, ComposeError> {
        let mut rng = match request.constraints.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        self.compose_with_rng(request, learner, &mut rng)
    }

    /// Compose a session drawing randomness from `rng`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for a zero count, an unknown section, or a
    ///   restricted area outside the section.
    /// - `PoolExhausted` when an area cannot supply its share.
    pub fn compose_with_rng<R: Rng + ?Sized>(
        &self,
        request: &CompositionRequest,
        learner: &LearnerContext,
        rng: &mut R,
    ) -> Result<ComposedSession, ComposeError> {
        if request.count == 0 {
            return Err(RequestError::InvalidCount.into());
        }
        let section_areas = self
            .registry
            .areas(request.section)
            .ok_or_else(|| RequestError::UnknownSection(request.section.to_string()))?;
        let areas = select_areas(section_areas, request)?;

        let weights: Vec<f64> = areas.iter().map(|a| a.midpoint()).collect();
        let counts = allocate(&weights, request.count);

        let mut picked: Vec<&'a Question> = Vec::with_capacity(request.count);
        for (area, &target) in areas.iter().zip(&counts) {
            if target > 0 {
                picked.extend(self.sample_area(area, target, &request.constraints, learner, rng)?);
            }
        }

        picked.shuffle(rng);
        if areas.len() > 1 && !swap_forward(&mut picked, |q| &q.blueprint_area, self.max_run) {
            picked = rebuild_order(picked, |q| &q.blueprint_area, self.max_run);
        }

        let allocation = areas
            .iter()
            .zip(counts)
            .map(|(area, count)| AreaAllocation {
                area: area.code.clone(),
                count,
            })
            .collect();
        tracing::debug!(
            section = %request.section,
            count = picked.len(),
            "session composed"
        );

        Ok(ComposedSession {
            section: request.section,
            question_ids: picked.into_iter().map(|q| q.id.clone()).collect(),
            allocation,
        })
    }

    fn sample_area<R: Rng + ?Sized>(
        &self,
        area: &BlueprintArea,
        target: usize,
        constraints: &Constraints,
        learner: &LearnerContext,
        rng: &mut R,
    ) -> Result<Vec<&'a Question>, ComposeError> {
        let pool: Vec<&'a Question> = self
            .bank
            .area_questions(&area.code)
            .filter(|q| constraints.difficulty.is_none_or(|d| q.difficulty == d))
            .filter(|q| !constraints.exclude.contains(&q.id))
            .collect();
        if pool.len() < target {
            return Err(ComposeError::PoolExhausted {
                area: area.code.clone(),
                required: target,
                available: pool.len(),
            });
        }

        let fresh: Vec<&'a Question> = pool
            .iter()
            .copied()
            .filter(|q| !learner.recently_correct.contains(&q.id))
            .collect();
        let candidates = if fresh.len() >= target {
            fresh
        } else {
            tracing::debug!(area = %area.code, "recency exclusion relaxed to fill area");
            pool
        };

        let mastery = learner.mastery.get(&area.code).copied().unwrap_or(0.0);
        let band = difficulty_band(mastery);
        let (mut preferred, mut rest): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|q| band.contains(&q.difficulty));
        preferred.shuffle(rng);
        rest.shuffle(rng);

        let mut chosen: Vec<&'a Question> = preferred.into_iter().take(target).collect();
        let short = target - chosen.len();
        chosen.extend(rest.into_iter().take(short));
        Ok(chosen)
    }
}

fn select_areas<'r>(
    section_areas: &'r [BlueprintArea],
    request: &CompositionRequest,
) -> Result<Vec<&'r BlueprintArea>, RequestError> {
    let wanted = &request.constraints.areas;
    if wanted.is_empty() {
        return Ok(section_areas.iter().collect());
    }
    if let Some(missing) = wanted
        .iter()
        .find(|code| !section_areas.iter().any(|a| &a.code == *code))
    {
        return Err(RequestError::UnknownArea {
            area: missing.clone(),
            section: request.section.to_string(),
        });
    }
    Ok(section_areas
        .iter()
        .filter(|a| wanted.contains(&a.code))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::BlueprintArea;
    use proptest::prelude::*;

    fn question(id: String, section: Section, area: &AreaCode, difficulty: Difficulty) -> Question {
        Question {
            prompt: format!("Prompt {id}"),
            id: QuestionId::new(id),
            course_id: "ea".into(),
            section,
            blueprint_area: area.clone(),
            topic: "Topic".into(),
            subtopic: String::new(),
            difficulty,
            skill_level: String::new(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: 0,
            explanation: "Because.".into(),
            reference: String::new(),
        }
    }

    /// `per_area` questions in every SEE1 area, cycling easy/medium/hard.
    fn see1_bank(registry: &BlueprintRegistry, per_area: usize) -> QuestionBank {
        let mut questions = Vec::new();
        for area in registry.areas(Section::See1).unwrap() {
            for i in 0..per_area {
                let difficulty = Difficulty::ALL[i % 3];
                questions.push(question(
                    format!("{}-{i}", area.code),
                    Section::See1,
                    &area.code,
                    difficulty,
                ));
            }
        }
        QuestionBank::new(questions, registry).unwrap()
    }

    fn area_counts(bank: &QuestionBank, ids: &[QuestionId]) -> HashMap<AreaCode, usize> {
        let mut counts = HashMap::new();
        for id in ids {
            *counts
                .entry(bank.get(id).unwrap().blueprint_area.clone())
                .or_insert(0) += 1;
        }
        counts
    }

    fn longest_run(bank: &QuestionBank, ids: &[QuestionId]) -> usize {
        let mut longest = 0;
        let mut run = 0;
        let mut last: Option<&AreaCode> = None;
        for id in ids {
            let area = &bank.get(id).unwrap().blueprint_area;
            if last == Some(area) {
                run += 1;
            } else {
                run = 1;
                last = Some(area);
            }
            longest = longest.max(run);
        }
        longest
    }

    fn seeded(section: Section, count: usize, seed: u64) -> CompositionRequest {
        CompositionRequest::new(section, count).with_constraints(Constraints {
            seed: Some(seed),
            ..Constraints::default()
        })
    }

    #[test]
    fn allocation_matches_largest_remainder() {
        let counts = allocate(&[17.5, 22.5, 22.5, 17.5, 17.5, 12.5], 20);
        assert_eq!(counts, vec![3, 4, 4, 3, 3, 3]);
        assert_eq!(counts.iter().sum::<usize>(), 20);
    }

    #[test]
    fn allocation_ties_go_to_earlier_areas() {
        assert_eq!(allocate(&[1.0, 1.0, 1.0], 2), vec![1, 1, 0]);
        assert_eq!(allocate(&[25.0, 25.0, 25.0, 25.0], 4), vec![1, 1, 1, 1]);
    }

    #[test]
    fn allocation_without_weight_is_empty() {
        assert_eq!(allocate(&[0.0, 0.0], 5), vec![0, 0]);
        assert!(allocate(&[], 5).is_empty());
    }

    #[test]
    fn composes_exact_weighted_session() {
        let registry = BlueprintRegistry::enrolled_agent();
        let bank = see1_bank(&registry, 8);
        let composer = SessionComposer::new(&bank, &registry);

        let session = composer
            .compose(&seeded(Section::See1, 20, 7), &LearnerContext::default())
            .unwrap();

        assert_eq!(session.question_ids.len(), 20);
        let unique: HashSet<_> = session.question_ids.iter().collect();
        assert_eq!(unique.len(), 20);

        let counts = area_counts(&bank, &session.question_ids);
        for allocation in &session.allocation {
            assert_eq!(
                counts.get(&allocation.area).copied().unwrap_or(0),
                allocation.count
            );
        }
        let expected: Vec<_> = registry
            .areas(Section::See1)
            .unwrap()
            .iter()
            .map(BlueprintArea::midpoint)
            .collect();
        let expected = allocate(&expected, 20);
        let actual: Vec<_> = session.allocation.iter().map(|a| a.count).collect();
        assert_eq!(actual, expected);
        assert!(longest_run(&bank, &session.question_ids) <= 2);
    }

    #[test]
    fn same_seed_same_session() {
        let registry = BlueprintRegistry::enrolled_agent();
        let bank = see1_bank(&registry, 8);
        let composer = SessionComposer::new(&bank, &registry);
        let learner = LearnerContext::default();

        let a = composer.compose(&seeded(Section::See1, 20, 42), &learner).unwrap();
        let b = composer.compose(&seeded(Section::See1, 20, 42), &learner).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_count_and_unknown_section_are_invalid() {
        let registry = BlueprintRegistry::new(vec![BlueprintArea::new(
            "SEE1-1",
            Section::See1,
            "Everything",
            100.0,
            100.0,
        )])
        .unwrap();
        let bank = QuestionBank::new(Vec::new(), &registry).unwrap();
        let composer = SessionComposer::new(&bank, &registry);
        let learner = LearnerContext::default();

        let err = composer
            .compose(&CompositionRequest::new(Section::See1, 0), &learner)
            .unwrap_err();
        assert_eq!(err, ComposeError::InvalidRequest(RequestError::InvalidCount));

        let err = composer
            .compose(&CompositionRequest::new(Section::See2, 5), &learner)
            .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::InvalidRequest(RequestError::UnknownSection(_))
        ));
    }

    #[test]
    fn empty_area_pool_names_the_area() {
        let registry = BlueprintRegistry::enrolled_agent();
        let mut questions = Vec::new();
        for area in registry.areas(Section::See1).unwrap() {
            if area.code.as_str() == "SEE1-4" {
                continue;
            }
            for i in 0..5 {
                questions.push(question(
                    format!("{}-{i}", area.code),
                    Section::See1,
                    &area.code,
                    Difficulty::Medium,
                ));
            }
        }
        let bank = QuestionBank::new(questions, &registry).unwrap();
        let composer = SessionComposer::new(&bank, &registry);

        let err = composer
            .compose(&seeded(Section::See1, 10, 1), &LearnerContext::default())
            .unwrap_err();
        assert_eq!(
            err,
            ComposeError::PoolExhausted {
                area: AreaCode::new("SEE1-4"),
                required: 2,
                available: 0,
            }
        );
    }

    #[test]
    fn recently_correct_questions_are_held_back_when_possible() {
        let registry = BlueprintRegistry::enrolled_agent();
        let bank = see1_bank(&registry, 8);
        let composer = SessionComposer::new(&bank, &registry);

        let recent: HashSet<QuestionId> = (0..4)
            .map(|i| QuestionId::new(format!("SEE1-2-{i}")))
            .collect();
        let learner = LearnerContext {
            recently_correct: recent.clone(),
            ..LearnerContext::default()
        };
        // SEE1-2 needs 2 of 20 → 4 fresh questions are enough
        let session = composer.compose(&seeded(Section::See1, 10, 3), &learner).unwrap();
        assert!(session.question_ids.iter().all(|id| !recent.contains(id)));
    }

    #[test]
    fn recency_exclusion_falls_back_instead_of_underfilling() {
        let registry = BlueprintRegistry::enrolled_agent();
        let bank = see1_bank(&registry, 3);
        let composer = SessionComposer::new(&bank, &registry);

        let every_question: HashSet<QuestionId> = bank
            .section_questions(Section::See1)
            .map(|q| q.id.clone())
            .collect();
        let learner = LearnerContext {
            recently_correct: every_question,
            ..LearnerContext::default()
        };
        let session = composer.compose(&seeded(Section::See1, 12, 9), &learner).unwrap();
        assert_eq!(session.question_ids.len(), 12);
    }

    #[test]
    fn difficulty_follows_mastery() {
        let registry = BlueprintRegistry::enrolled_agent();
        let bank = see1_bank(&registry, 9);
        let composer = SessionComposer::new(&bank, &registry);
        let only_area = Constraints {
            areas: vec![AreaCode::new("SEE1-3")],
            seed: Some(11),
            ..Constraints::default()
        };
        let request = CompositionRequest::new(Section::See1, 6).with_constraints(only_area);

        let strong = LearnerContext {
            mastery: HashMap::from([(AreaCode::new("SEE1-3"), 0.9)]),
            ..LearnerContext::default()
        };
        let session = composer.compose(&request, &strong).unwrap();
        assert!(session.question_ids.iter().all(|id| {
            bank.get(id).unwrap().difficulty != Difficulty::Easy
        }));

        let weak = LearnerContext::default();
        let session = composer.compose(&request, &weak).unwrap();
        assert!(session.question_ids.iter().all(|id| {
            bank.get(id).unwrap().difficulty != Difficulty::Hard
        }));
    }

    #[test]
    fn empty_preferred_bucket_falls_back_to_remaining_pool() {
        let registry = BlueprintRegistry::enrolled_agent();
        let area = AreaCode::new("SEE1-1");
        let questions = (0..4)
            .map(|i| question(format!("hard-{i}"), Section::See1, &area, Difficulty::Hard))
            .collect();
        let bank = QuestionBank::new(questions, &registry).unwrap();
        let composer = SessionComposer::new(&bank, &registry);
        let request = CompositionRequest::new(Section::See1, 3).with_constraints(Constraints {
            areas: vec![area],
            seed: Some(5),
            ..Constraints::default()
        });

        let session = composer.compose(&request, &LearnerContext::default()).unwrap();
        assert_eq!(session.question_ids.len(), 3);
    }

    #[test]
    fn explicit_constraints_can_exhaust_an_area() {
        let registry = BlueprintRegistry::enrolled_agent();
        let bank = see1_bank(&registry, 3);
        let composer = SessionComposer::new(&bank, &registry);
        let request = CompositionRequest::new(Section::See1, 12).with_constraints(Constraints {
            difficulty: Some(Difficulty::Hard),
            seed: Some(2),
            ..Constraints::default()
        });

        let err = composer.compose(&request, &LearnerContext::default()).unwrap_err();
        assert!(matches!(err, ComposeError::PoolExhausted { available: 1, .. }));
    }

    #[test]
    fn restricting_to_foreign_area_is_invalid() {
        let registry = BlueprintRegistry::enrolled_agent();
        let bank = see1_bank(&registry, 3);
        let composer = SessionComposer::new(&bank, &registry);
        let request = CompositionRequest::new(Section::See1, 2).with_constraints(Constraints {
            areas: vec![AreaCode::new("SEE2-1")],
            ..Constraints::default()
        });
        let err = composer.compose(&request, &LearnerContext::default()).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::InvalidRequest(RequestError::UnknownArea { .. })
        ));
    }

    #[test]
    fn swap_forward_breaks_runs() {
        let mut items = vec!['a', 'a', 'a', 'b', 'b', 'c'];
        assert!(swap_forward(&mut items, |c| c, 2));
        assert!(items.windows(3).all(|w| !(w[0] == w[1] && w[1] == w[2])));
    }

    #[test]
    fn rebuild_rescues_a_stuck_tail() {
        let mut items = vec!['a', 'a', 'b', 'b', 'b'];
        assert!(!swap_forward(&mut items, |c| c, 2));

        let rebuilt = rebuild_order(vec!['a', 'a', 'b', 'b', 'b'], |c| c, 2);
        assert_eq!(rebuilt.len(), 5);
        assert!(rebuilt.windows(3).all(|w| !(w[0] == w[1] && w[1] == w[2])));
    }

    #[test]
    fn rebuild_keeps_everything_when_a_run_is_unavoidable() {
        let rebuilt = rebuild_order(vec!['a', 'a', 'a', 'a', 'b'], |c| c, 2);
        assert_eq!(rebuilt.len(), 5);
        assert_eq!(rebuilt.iter().filter(|c| **c == 'a').count(), 4);
    }

    proptest! {
        #[test]
        fn allocation_always_sums_to_count(
            weights in prop::collection::vec(0.5f64..50.0, 1..8),
            count in 1usize..200,
        ) {
            let counts = allocate(&weights, count);
            prop_assert_eq!(counts.iter().sum::<usize>(), count);
            let total: f64 = weights.iter().sum();
            for (w, c) in weights.iter().zip(&counts) {
                #[allow(clippy::cast_precision_loss)]
                let quota = count as f64 * w / total;
                #[allow(clippy::cast_precision_loss)]
                let c = *c as f64;
                prop_assert!(c >= quota.floor() - 1e-9 && c <= quota.ceil() + 1e-9);
            }
        }

        #[test]
        fn composed_sessions_are_exact_unique_and_interleaved(
            count in 1usize..=40,
            seed in any::<u64>(),
        ) {
            let registry = BlueprintRegistry::enrolled_agent();
            let bank = see1_bank(&registry, 12);
            let composer = SessionComposer::new(&bank, &registry);
            let session = composer
                .compose(&seeded(Section::See1, count, seed), &LearnerContext::default())
                .unwrap();

            prop_assert_eq!(session.question_ids.len(), count);
            let unique: HashSet<_> = session.question_ids.iter().collect();
            prop_assert_eq!(unique.len(), count);
            let counts = area_counts(&bank, &session.question_ids);
            for allocation in &session.allocation {
                prop_assert_eq!(counts.get(&allocation.area).copied().unwrap_or(0), allocation.count);
            }
            prop_assert!(longest_run(&bank, &session.question_ids) <= 2);
        }
    }
}
