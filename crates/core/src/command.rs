// crates/core/src/command.rs
//! Capability-scoped dbt invocations.
//!
//! Callers never hand a raw command line to the process layer. A command is
//! one verb from a fixed set plus an optional list of node selectors, and
//! the argument vector is rebuilt from that structure.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::types::OperationKind;

/// dbt sub-commands the service is allowed to invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbtVerb {
    Run,
    Test,
    Build,
    Seed,
    Snapshot,
    Compile,
    Deps,
    Debug,
}

impl DbtVerb {
    pub const ALL: [DbtVerb; 8] = [
        DbtVerb::Run,
        DbtVerb::Test,
        DbtVerb::Build,
        DbtVerb::Seed,
        DbtVerb::Snapshot,
        DbtVerb::Compile,
        DbtVerb::Deps,
        DbtVerb::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DbtVerb::Run => "run",
            DbtVerb::Test => "test",
            DbtVerb::Build => "build",
            DbtVerb::Seed => "seed",
            DbtVerb::Snapshot => "snapshot",
            DbtVerb::Compile => "compile",
            DbtVerb::Deps => "deps",
            DbtVerb::Debug => "debug",
        }
    }

    /// `deps` and `debug` operate on the whole project and take no selector.
    pub fn accepts_selector(&self) -> bool {
        !matches!(self, DbtVerb::Deps | DbtVerb::Debug)
    }
}

impl From<OperationKind> for DbtVerb {
    fn from(op: OperationKind) -> Self {
        match op {
            OperationKind::Run => DbtVerb::Run,
            OperationKind::Test => DbtVerb::Test,
        }
    }
}

impl FromStr for DbtVerb {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DbtVerb::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| CommandError::UnknownVerb(s.to_string()))
    }
}

/// Reasons a command string is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unsupported dbt command '{0}'")]
    UnknownVerb(String),

    #[error("Unsupported argument '{0}'")]
    UnknownArgument(String),

    #[error("'{0}' does not take a selector")]
    SelectorNotAllowed(&'static str),

    #[error("--select requires at least one selector")]
    MissingSelector,

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
}

/// A validated dbt invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbtCommand {
    verb: DbtVerb,
    select: Vec<String>,
}

impl DbtCommand {
    /// `dbt <run|test> --select <model>`.
    pub fn for_model(operation: OperationKind, model_name: &str) -> Result<Self, CommandError> {
        validate_selector(model_name)?;
        Ok(Self {
            verb: operation.into(),
            select: vec![model_name.to_string()],
        })
    }

    /// Parse `<verb> [--select|-s <selector>...]`.
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let mut tokens = input.split_whitespace();
        let verb: DbtVerb = tokens.next().ok_or(CommandError::Empty)?.parse()?;

        let mut select = Vec::new();
        let mut in_select = false;
        for token in tokens {
            match token {
                "--select" | "-s" => {
                    if !verb.accepts_selector() {
                        return Err(CommandError::SelectorNotAllowed(verb.as_str()));
                    }
                    in_select = true;
                }
                t if t.starts_with('-') => {
                    return Err(CommandError::UnknownArgument(t.to_string()));
                }
                t if in_select => {
                    validate_selector(t)?;
                    select.push(t.to_string());
                }
                t => return Err(CommandError::UnknownArgument(t.to_string())),
            }
        }

        if in_select && select.is_empty() {
            return Err(CommandError::MissingSelector);
        }

        Ok(Self { verb, select })
    }

    pub fn verb(&self) -> DbtVerb {
        self.verb
    }

    pub fn selectors(&self) -> &[String] {
        &self.select
    }

    /// Argument vector passed to the dbt binary (without the binary itself).
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.verb.as_str().to_string()];
        if !self.select.is_empty() {
            args.push("--select".to_string());
            args.extend(self.select.iter().cloned());
        }
        args
    }
}

impl fmt::Display for DbtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_args().join(" "))
    }
}

/// Node selector syntax: names, paths, tags, graph operators and globs.
fn validate_selector(selector: &str) -> Result<(), CommandError> {
    let valid = !selector.is_empty()
        && !selector.starts_with('-')
        && selector
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_.:+@*/,-".contains(c));
    if valid {
        Ok(())
    } else {
        Err(CommandError::InvalidSelector(selector.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_for_model_builds_select_args() {
        let cmd = DbtCommand::for_model(OperationKind::Run, "wine_list").unwrap();
        assert_eq!(cmd.to_args(), vec!["run", "--select", "wine_list"]);
        assert_eq!(cmd.to_string(), "run --select wine_list");

        let cmd = DbtCommand::for_model(OperationKind::Test, "wine_list").unwrap();
        assert_eq!(cmd.verb(), DbtVerb::Test);
    }

    #[test]
    fn test_for_model_rejects_shell_metacharacters() {
        let err = DbtCommand::for_model(OperationKind::Run, "x; rm -rf /").unwrap_err();
        assert!(matches!(err, CommandError::InvalidSelector(_)));

        let err = DbtCommand::for_model(OperationKind::Run, "").unwrap_err();
        assert!(matches!(err, CommandError::InvalidSelector(_)));
    }

    #[test]
    fn test_parse_with_selectors() {
        let cmd = DbtCommand::parse("run --select wine_list tag:nightly +orders").unwrap();
        assert_eq!(cmd.verb(), DbtVerb::Run);
        assert_eq!(cmd.selectors(), ["wine_list", "tag:nightly", "+orders"]);

        let cmd = DbtCommand::parse("  test   -s path:models/staging  ").unwrap();
        assert_eq!(cmd.to_string(), "test --select path:models/staging");
    }

    #[test]
    fn test_parse_bare_verb() {
        let cmd = DbtCommand::parse("deps").unwrap();
        assert_eq!(cmd.to_args(), vec!["deps"]);
    }

    #[test]
    fn test_parse_rejections() {
        assert_eq!(DbtCommand::parse("   ").unwrap_err(), CommandError::Empty);
        assert_eq!(
            DbtCommand::parse("run-operation drop_all").unwrap_err(),
            CommandError::UnknownVerb("run-operation".into())
        );
        assert_eq!(
            DbtCommand::parse("run --vars {a:1}").unwrap_err(),
            CommandError::UnknownArgument("--vars".into())
        );
        assert_eq!(
            DbtCommand::parse("run wine_list").unwrap_err(),
            CommandError::UnknownArgument("wine_list".into())
        );
        assert_eq!(
            DbtCommand::parse("run --select").unwrap_err(),
            CommandError::MissingSelector
        );
        assert_eq!(
            DbtCommand::parse("deps --select x").unwrap_err(),
            CommandError::SelectorNotAllowed("deps")
        );
        assert!(matches!(
            DbtCommand::parse("run --select a&&b").unwrap_err(),
            CommandError::InvalidSelector(_)
        ));
    }
}
