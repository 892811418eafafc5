// crates/server/src/jobs/mod.rs
//! Background job system for detached dbt executions.
//!
//! Provides:
//! - `JobRunner`: bounded worker pool that owns every spawned execution
//! - `ActiveJob`: snapshot of an in-flight execution
//! - `JobEvent`: completion notification

pub mod runner;
pub mod types;

pub use runner::JobRunner;
pub use types::{ActiveJob, JobEvent, RunnerClosed};
