// crates/core/src/lib.rs
pub mod command;
pub mod exec;
pub mod paths;
pub mod types;

pub use command::*;
pub use types::*;
