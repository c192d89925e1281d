//! Resolving and loading the engine inputs.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use prep_core::bank::QuestionBank;
use prep_core::blueprint::BlueprintRegistry;
use prep_core::config::EngineConfig;

#[derive(Debug, Args)]
pub struct Sources {
    /// Question corpus JSON (`{"batches": [...]}`)
    #[arg(long, global = true, env = "PREP_QUESTIONS", default_value = "data/see1_questions.json")]
    pub questions: PathBuf,

    /// Blueprint TOML; the built-in Enrolled Agent blueprint when omitted
    #[arg(long, global = true, env = "PREP_BLUEPRINT")]
    pub blueprint: Option<PathBuf>,

    /// Engine tuning TOML; defaults when omitted
    #[arg(long, global = true, env = "PREP_CONFIG")]
    pub config: Option<PathBuf>,
}

pub struct Loaded {
    pub registry: BlueprintRegistry,
    pub bank: QuestionBank,
    pub config: EngineConfig,
}

impl Sources {
    pub fn registry(&self) -> Result<BlueprintRegistry> {
        match &self.blueprint {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading blueprint {}", path.display()))?;
                BlueprintRegistry::from_toml_str(&raw)
                    .with_context(|| format!("invalid blueprint {}", path.display()))
            }
            None => Ok(BlueprintRegistry::enrolled_agent()),
        }
    }

    pub fn config(&self) -> Result<EngineConfig> {
        match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                EngineConfig::from_toml_str(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))
            }
            None => Ok(EngineConfig::default()),
        }
    }

    pub fn load(&self) -> Result<Loaded> {
        let registry = self.registry()?;
        let raw = fs::read_to_string(&self.questions)
            .with_context(|| format!("reading questions {}", self.questions.display()))?;
        let bank = QuestionBank::from_json_str(&raw, &registry)
            .with_context(|| format!("invalid question corpus {}", self.questions.display()))?;
        let config = self.config()?;
        tracing::debug!(questions = bank.len(), "inputs loaded");
        Ok(Loaded {
            registry,
            bank,
            config,
        })
    }
}
