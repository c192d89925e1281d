#![forbid(unsafe_code)]

pub mod bank;
pub mod blueprint;
pub mod compose;
pub mod config;
pub mod error;
pub mod lesson;
pub mod mastery;
pub mod model;
pub mod readiness;
pub mod time;

pub use time::Clock;
