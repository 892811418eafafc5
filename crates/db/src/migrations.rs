/// Inline SQL migrations for the job ledger schema.
///
/// We use simple inline migrations rather than sqlx migration files
/// because the schema is small and self-contained.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: job ledger
    r#"
CREATE TABLE IF NOT EXISTS dbt_jobs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id      TEXT NOT NULL UNIQUE,
    model_name  TEXT NOT NULL,
    operation   TEXT NOT NULL CHECK (operation IN ('run', 'test')),
    status      TEXT NOT NULL CHECK (status IN ('started', 'success', 'failed')),
    created_at  INTEGER NOT NULL
);
"#,
    // Migration 2: dedup lookup walks (model, operation) newest-first
    r#"
CREATE INDEX IF NOT EXISTS idx_dbt_jobs_lookup ON dbt_jobs(model_name, operation, created_at DESC);
"#,
];
