use prep_core::bank::QuestionBank;
use prep_core::blueprint::BlueprintRegistry;
use prep_core::compose::{CompositionRequest, LearnerContext, SessionComposer};
use prep_core::config::EngineConfig;
use prep_core::model::{AreaCode, Section};
use std::collections::HashSet;

const QUESTIONS: &str = include_str!("../../../data/see1_questions.json");
const BLUEPRINT: &str = include_str!("../../../data/blueprint.toml");
const ENGINE: &str = include_str!("../../../data/engine.toml");

#[test]
fn shipped_blueprint_matches_builtin() {
    let parsed = BlueprintRegistry::from_toml_str(BLUEPRINT).unwrap();
    assert_eq!(parsed, BlueprintRegistry::enrolled_agent());
}

#[test]
fn shipped_engine_config_is_the_default() {
    assert_eq!(EngineConfig::from_toml_str(ENGINE).unwrap(), EngineConfig::default());
}

#[test]
fn shipped_corpus_covers_every_see1_area() {
    let registry = BlueprintRegistry::enrolled_agent();
    let bank = QuestionBank::from_json_str(QUESTIONS, &registry).unwrap();
    let stats = bank.stats();

    assert_eq!(stats.total, 185);
    assert_eq!(stats.per_section.get(&Section::See1), Some(&185));
    for area in registry.areas(Section::See1).unwrap() {
        let counts = &stats.per_area[&area.code];
        assert!(counts.total() >= 15, "{} is thin", area.code);
    }
}

#[test]
fn full_mock_exam_composes_from_shipped_corpus() {
    let registry = BlueprintRegistry::enrolled_agent();
    let bank = QuestionBank::from_json_str(QUESTIONS, &registry).unwrap();
    let request = CompositionRequest::new(Section::See1, 100);

    let composed = SessionComposer::new(&bank, &registry)
        .compose(&request, &LearnerContext::default())
        .unwrap();

    assert_eq!(composed.question_ids.len(), 100);
    let unique: HashSet<_> = composed.question_ids.iter().collect();
    assert_eq!(unique.len(), 100);

    let areas: Vec<&AreaCode> = composed
        .question_ids
        .iter()
        .map(|id| &bank.get(id).unwrap().blueprint_area)
        .collect();
    assert!(areas.windows(3).all(|w| !(w[0] == w[1] && w[1] == w[2])));
}
