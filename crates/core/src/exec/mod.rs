// crates/core/src/exec/mod.rs
//! dbt execution: the `DbtExecutor` seam and its implementations.

pub mod callback;
pub mod config;
pub mod executor;
pub mod factory;
pub mod local;
pub mod token;
pub mod types;

pub use callback::CallbackExecutor;
pub use config::{ExecutionMode, ExecutorConfig};
pub use executor::DbtExecutor;
pub use factory::{create_executor, create_local_executor};
pub use local::LocalDbtExecutor;
pub use token::{IdentityTokenSource, MetadataTokenSource, StaticTokenSource, TokenError};
pub use types::{ExecError, ExecOutput};
