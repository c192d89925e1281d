use anyhow::Result;
use prep_core::compose::{CompositionRequest, Constraints, LearnerContext, SessionComposer};
use prep_core::model::{AreaCode, Difficulty, Section};

use crate::load::Sources;

pub fn execute(
    sources: &Sources,
    section: Section,
    count: usize,
    seed: Option<u64>,
    areas: Vec<String>,
    difficulty: Option<Difficulty>,
) -> Result<()> {
    let loaded = sources.load()?;
    let request = CompositionRequest::new(section, count).with_constraints(Constraints {
        difficulty,
        areas: areas.into_iter().map(AreaCode::new).collect(),
        seed,
        ..Constraints::default()
    });

    let composed = SessionComposer::new(&loaded.bank, &loaded.registry)
        .with_max_run(loaded.config.max_area_run)
        .compose(&request, &LearnerContext::default())?;

    for allocation in &composed.allocation {
        println!("# {:<8} {}", allocation.area, allocation.count);
    }
    for (position, id) in composed.question_ids.iter().enumerate() {
        if let Some(question) = loaded.bank.get(id) {
            println!(
                "{:>3}. {:<16} {:<8} {:<6} {}",
                position + 1,
                id,
                question.blueprint_area,
                question.difficulty,
                question.topic,
            );
        }
    }
    Ok(())
}
