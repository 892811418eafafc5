// crates/db/src/queries/mod.rs
// Ledger queries for the dbt-jobs SQLite database.

pub mod jobs;
