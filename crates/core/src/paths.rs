//! Centralized path functions for app storage locations.

use std::path::PathBuf;

/// App cache root: `~/Library/Caches/dbt-jobs/` (macOS) or `~/.cache/dbt-jobs/` (Linux).
pub fn app_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("dbt-jobs"))
}

/// SQLite ledger file: `<app_cache_dir>/dbt-jobs.db`.
pub fn db_path() -> Option<PathBuf> {
    app_cache_dir().map(|d| d.join("dbt-jobs.db"))
}
