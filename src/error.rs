//! Error types for every stage of a dispatch.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::event::Category;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("syntax error: {0}")]
    Parse(String),

    #[error("{0}")]
    Compile(String),

    #[error("{0}")]
    Runtime(String),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid event JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("event payload must be a JSON object")]
    NotAnObject,

    #[error("unknown event category '{0}'")]
    UnknownCategory(String),

    #[error("no event category given and input has no hook_event_name")]
    MissingCategory,

    #[error("input hook_event_name '{found}' does not match {expected}")]
    Mismatch { expected: Category, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("condition '{kind}' is not supported for {category} hooks")]
    Unsupported {
        kind: &'static str,
        category: Category,
    },

    #[error("invalid value for condition '{kind}': {reason}")]
    InvalidValue { kind: &'static str, reason: String },

    #[error("condition '{kind}' could not be evaluated: {reason}")]
    Probe { kind: &'static str, reason: String },
}

/// Failure of the subprocess primitive itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("failed to spawn command: {0}")]
    Spawn(String),

    #[error("command I/O error: {0}")]
    Io(String),

    #[error("command timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("command failed with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    #[error("command is empty after interpolation")]
    EmptyCommand,

    #[error("output message is empty after interpolation")]
    EmptyMessage,

    #[error("invalid {category} output: {reason}")]
    InvalidOutput { category: Category, reason: String },
}

impl ActionError {
    pub fn invalid(category: Category, reason: impl Into<String>) -> Self {
        ActionError::InvalidOutput {
            category,
            reason: reason.into(),
        }
    }

    pub fn exit(code: Option<i32>, stderr: &str) -> Self {
        let status = match code {
            Some(code) => format!("exit code {code}"),
            None => "no exit code (killed by signal)".to_string(),
        };
        let stderr = match stderr.trim() {
            "" => "(no stderr)".to_string(),
            text => text.to_string(),
        };
        ActionError::NonZeroExit { status, stderr }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),
}

/// A condition that errored, skipping its rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    /// 1-based rule position within the category.
    pub rule: usize,
    pub error: ConditionError,
}

/// An action that failed and was replaced by the fail-safe verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    /// 1-based rule position within the category.
    pub rule: usize,
    /// 1-based action position within the rule.
    pub action: usize,
    pub error: ActionError,
}

impl fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule #{}: {}", self.rule, self.error)
    }
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule #{} action #{}: {}",
            self.rule, self.action, self.error
        )
    }
}

/// Every error recorded during one dispatch. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    pub conditions: Vec<RuleFailure>,
    pub actions: Vec<ActionFailure>,
}

impl DispatchError {
    /// `None` when nothing went wrong.
    pub fn collect(conditions: Vec<RuleFailure>, actions: Vec<ActionFailure>) -> Option<Self> {
        if conditions.is_empty() && actions.is_empty() {
            None
        } else {
            Some(Self {
                conditions,
                actions,
            })
        }
    }

    /// One line per recorded error, conditions first.
    pub fn lines(&self) -> Vec<String> {
        self.conditions
            .iter()
            .map(ToString::to_string)
            .chain(self.actions.iter().map(ToString::to_string))
            .collect()
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

impl std::error::Error for DispatchError {}
