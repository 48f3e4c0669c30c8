//! Rule actions and their execution.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ActionError;
use crate::event::{Category, Event};
use crate::output::CommandResponse;
use crate::policy::{CategoryPolicy, Verdict, VerdictField};
use crate::query::QueryCache;
use crate::result::{ActionResult, ExitOverride};
use crate::runner::CommandRunner;
use crate::template::interpolate;

/// One configured action: `{type: command, ...}` or `{type: output, ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Command(CommandAction),
    Output(OutputAction),
}

/// Run a shell command; its stdout is the category's JSON output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandAction {
    pub command: String,
    /// Feed the event JSON to the command's stdin.
    #[serde(default)]
    pub use_stdin: bool,
    /// Seconds; overrides `settings.command_timeout`.
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Emit a templated message with optional verdict overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputAction {
    pub message: String,
    /// PreToolUse: allow, deny or ask. Required there.
    #[serde(default)]
    pub permission_decision: Option<String>,
    /// PermissionRequest: allow or deny. Required there.
    #[serde(default)]
    pub behavior: Option<String>,
    /// PostToolUse, Stop, SubagentStop, UserPromptSubmit: "block" or empty.
    #[serde(default)]
    pub decision: Option<String>,
    /// Verdict reason; defaults to the message.
    #[serde(default)]
    pub reason: Option<String>,
    /// PermissionRequest deny only.
    #[serde(default)]
    pub interrupt: Option<bool>,
    #[serde(default, rename = "continue")]
    pub proceed: Option<bool>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Legacy mode exit code.
    #[serde(default)]
    pub exit_status: Option<i32>,
}

impl Action {
    /// Static checks against the category the action is configured under.
    pub fn validate(&self, category: Category) -> Result<(), String> {
        match self {
            Action::Command(command) if command.command.trim().is_empty() => {
                Err("command action has an empty command".to_string())
            }
            Action::Command(_) => Ok(()),
            Action::Output(output) => output.validate(&category.policy()),
        }
    }
}

impl OutputAction {
    /// Verdict override fields must exist for the category and hold legal
    /// values.
    pub fn validate(&self, policy: &CategoryPolicy) -> Result<(), String> {
        let overrides = [
            (
                "permission_decision",
                &self.permission_decision,
                VerdictField::PermissionDecision,
            ),
            ("behavior", &self.behavior, VerdictField::Behavior),
            ("decision", &self.decision, VerdictField::Decision),
        ];
        for (name, value, field) in overrides {
            let Some(value) = value else {
                continue;
            };
            if policy.verdict_field != field {
                return Err(format!("`{name}` is not valid for {} actions", policy.category));
            }
            policy.parse_verdict(value)?;
        }
        if self.interrupt.is_some() && policy.verdict_field != VerdictField::Behavior {
            return Err(format!("`interrupt` is not valid for {} actions", policy.category));
        }
        if self.message.trim().is_empty() {
            return Err("output action has an empty message".to_string());
        }
        Ok(())
    }

    /// Build the result for an already-interpolated, non-empty message.
    pub fn to_result(
        &self,
        policy: &CategoryPolicy,
        message: String,
    ) -> Result<ActionResult, ActionError> {
        let invalid = |reason: String| ActionError::invalid(policy.category, reason);
        self.validate(policy).map_err(invalid)?;

        let mut result = ActionResult {
            proceed: self.proceed,
            stop_reason: self.stop_reason.clone().unwrap_or_default(),
            exit_override: self.exit_status.map(|code| ExitOverride {
                code,
                message: message.clone(),
            }),
            ..ActionResult::default()
        };
        let reason = self.reason.clone().unwrap_or_else(|| message.clone());

        match policy.verdict_field {
            VerdictField::PermissionDecision => {
                let raw = self.permission_decision.as_deref().ok_or_else(|| {
                    invalid("permission_decision is required for PreToolUse output actions".into())
                })?;
                result.verdict = Some(policy.parse_verdict(raw).map_err(invalid)?);
                result.reason = reason;
            }
            VerdictField::Behavior => {
                let raw = self.behavior.as_deref().ok_or_else(|| {
                    invalid("behavior is required for PermissionRequest output actions".into())
                })?;
                let verdict = policy.parse_verdict(raw).map_err(invalid)?;
                if verdict == Verdict::Deny {
                    result.reason = reason;
                    result.interrupt = self.interrupt;
                } else {
                    if self.interrupt.is_some() {
                        return Err(invalid("interrupt is only valid with behavior deny".into()));
                    }
                    result.route_message(policy, message);
                }
                result.verdict = Some(verdict);
            }
            VerdictField::Decision => {
                let verdict = policy
                    .parse_verdict(self.decision.as_deref().unwrap_or_default())
                    .map_err(invalid)?;
                if verdict == Verdict::Block {
                    result.reason = reason;
                } else {
                    result.route_message(policy, message);
                }
                result.verdict = Some(verdict);
            }
            VerdictField::None => result.route_message(policy, message),
        }
        Ok(result)
    }
}

/// Executes actions against one event.
pub struct ActionExecutor {
    queries: Arc<QueryCache>,
    runner: Box<dyn CommandRunner>,
    default_timeout: Option<Duration>,
}

impl ActionExecutor {
    pub fn new(queries: Arc<QueryCache>, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            queries,
            runner,
            default_timeout: None,
        }
    }

    /// Timeout for commands that do not set their own.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn execute(&self, action: &Action, event: &Event) -> Result<ActionResult, ActionError> {
        match action {
            Action::Output(output) => self.emit(output, event),
            Action::Command(command) => self.run(command, event),
        }
    }

    fn emit(&self, action: &OutputAction, event: &Event) -> Result<ActionResult, ActionError> {
        let message = interpolate(&self.queries, &action.message, event.raw());
        if message.trim().is_empty() {
            return Err(ActionError::EmptyMessage);
        }
        action.to_result(&event.category().policy(), message)
    }

    fn run(&self, action: &CommandAction, event: &Event) -> Result<ActionResult, ActionError> {
        let command = interpolate(&self.queries, &action.command, event.raw());
        if command.trim().is_empty() {
            return Err(ActionError::EmptyCommand);
        }
        let stdin = action.use_stdin.then(|| event.raw().to_string());
        let timeout = action
            .timeout
            .map(Duration::from_secs)
            .or(self.default_timeout);

        let output = self.runner.run(&command, stdin.as_deref(), timeout)?;
        if !output.success() {
            return Err(ActionError::exit(output.status, &output.stderr));
        }

        let stdout = output.stdout.trim();
        if stdout.is_empty() {
            // Nothing to say: the host decides (PreToolUse, PermissionRequest)
            // or the event is allowed (decision categories).
            return Ok(ActionResult::default());
        }
        CommandResponse::parse(stdout, &event.category().policy())
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("queries", &self.queries)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
