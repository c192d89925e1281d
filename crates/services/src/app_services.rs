use std::sync::Arc;

use prep_core::bank::QuestionBank;
use prep_core::blueprint::BlueprintRegistry;
use prep_core::config::EngineConfig;
use storage::repository::Storage;

use crate::Clock;
use crate::persist::Persistence;
use crate::practice::PracticeService;
use crate::retry::RetryPolicy;
use crate::study::StudyProgressCoordinator;

/// Assembles the practice and study services over one storage and one fallback cache.
#[derive(Clone)]
pub struct PrepServices {
    practice: Arc<PracticeService>,
    study: Arc<StudyProgressCoordinator>,
}

impl PrepServices {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: EngineConfig,
        bank: Arc<QuestionBank>,
        registry: Arc<BlueprintRegistry>,
        storage: Storage,
    ) -> Self {
        let persistence = Persistence::new(storage, RetryPolicy::from_config(&config));
        let practice = Arc::new(PracticeService::new(
            clock,
            config.clone(),
            bank,
            Arc::clone(&registry),
            persistence.clone(),
        ));
        let study = Arc::new(StudyProgressCoordinator::new(
            clock,
            config,
            registry,
            persistence,
        ));
        tracing::debug!("prep services assembled");
        Self { practice, study }
    }

    /// Build services backed by in-memory storage.
    #[must_use]
    pub fn in_memory(
        clock: Clock,
        config: EngineConfig,
        bank: Arc<QuestionBank>,
        registry: Arc<BlueprintRegistry>,
    ) -> Self {
        Self::new(clock, config, bank, registry, Storage::in_memory())
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn study(&self) -> Arc<StudyProgressCoordinator> {
        Arc::clone(&self.study)
    }
}
