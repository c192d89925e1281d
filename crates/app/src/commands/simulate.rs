use std::sync::Arc;

use anyhow::{Context, Result, bail};
use prep_core::Clock;
use prep_core::compose::{CompositionRequest, Constraints};
use prep_core::model::{Section, UserId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use services::{PrepServices, SubmittedAnswer};

use crate::load::Sources;

/// Answer `sessions` composed sessions with a fixed hit rate and report readiness.
pub async fn execute(
    sources: &Sources,
    section: Section,
    count: usize,
    sessions: usize,
    accuracy: f64,
    seed: u64,
    user: String,
) -> Result<()> {
    if !(0.0..=1.0).contains(&accuracy) {
        bail!("accuracy must be between 0 and 1, got {accuracy}");
    }
    let loaded = sources.load()?;
    let bank = Arc::new(loaded.bank);
    let services = PrepServices::in_memory(
        Clock::default(),
        loaded.config,
        Arc::clone(&bank),
        Arc::new(loaded.registry),
    );
    let practice = services.practice();
    let user_id = UserId::new(user);
    let mut rng = StdRng::seed_from_u64(seed);

    for round in 0..sessions {
        let request = CompositionRequest::new(section, count).with_constraints(Constraints {
            seed: Some(seed.wrapping_add(round as u64)),
            ..Constraints::default()
        });
        let session = practice.start_session(&user_id, &request).await?;

        let mut answers = Vec::with_capacity(session.question_ids().len());
        for id in session.question_ids() {
            let question = bank
                .get(id)
                .with_context(|| format!("composed unknown question {id}"))?;
            let choice = if rng.random_bool(accuracy) {
                question.correct_answer
            } else {
                (question.correct_answer + 1) % question.options.len()
            };
            answers.push(SubmittedAnswer::new(id.clone(), choice));
        }

        let outcome = practice.submit_answers(session.id(), &answers).await?;
        println!(
            "session {:>2}: {}/{} correct ({:.0}%), readiness {} ({})",
            round + 1,
            outcome.summary.correct,
            outcome.summary.total,
            outcome.summary.accuracy_percent,
            outcome.readiness.rounded(),
            outcome.readiness.level,
        );
    }

    let readiness = practice.readiness(&user_id, section).await?;
    println!(
        "\n{section} readiness: {:.1} ({})",
        readiness.score, readiness.level
    );
    for area in &readiness.areas {
        println!(
            "  {:<8} mastery {:.2} (n={:<3}) {:<10} +{:>5.2}  {}",
            area.area, area.mastery, area.sample_count, area.level, area.contribution, area.label,
        );
    }
    let weak: Vec<&str> = readiness.weak_areas.iter().map(|a| a.as_str()).collect();
    println!("weak areas: {}", weak.join(", "));
    Ok(())
}
