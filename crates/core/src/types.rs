// crates/core/src/types.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a ledger job (UUID v4, hyphenated).
pub type JobId = String;

/// Which dbt operation a job performs against a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Run,
    Test,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Run => "run",
            OperationKind::Test => "test",
        }
    }
}

/// Status of a ledger job.
///
/// `Started` is the only non-terminal state; a job moves to `Success` or
/// `Failed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Started,
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Started)
    }
}

/// Error returned when stored or user-supplied text is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for OperationKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(OperationKind::Run),
            "test" => Ok(OperationKind::Test),
            other => Err(UnknownVariant {
                kind: "operation",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for JobStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(JobStatus::Started),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownVariant {
                kind: "job status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
