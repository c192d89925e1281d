#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    ActivityLogRepository, InMemoryRepository, MasteryRepository, SessionRepository, Storage,
    StorageError,
};
