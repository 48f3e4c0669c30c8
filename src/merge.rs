//! Folding action results into one Final Output.

use serde_json::Value;

use crate::output::{HookOutput, HookSpecificOutput, PermissionRequestDecision};
use crate::policy::{CategoryPolicy, Verdict, VerdictField};
use crate::result::{ActionResult, ExitOverride};

/// Whether the dispatcher may run the next action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Accumulated state of one dispatch.
#[derive(Clone, Debug)]
pub struct MergeState {
    policy: CategoryPolicy,
    proceed: bool,
    verdict: Option<Verdict>,
    reason: String,
    additional_context: String,
    system_message: String,
    stop_reason: String,
    suppress_output: Option<bool>,
    hook_event_name: Option<String>,
    updated_input: Option<Value>,
    updated_output: Option<Value>,
    interrupt: Option<bool>,
    exit_override: Option<ExitOverride>,
}

impl MergeState {
    pub fn new(policy: CategoryPolicy) -> Self {
        Self {
            policy,
            proceed: true,
            verdict: None,
            reason: String::new(),
            additional_context: String::new(),
            system_message: String::new(),
            stop_reason: String::new(),
            suppress_output: None,
            hook_event_name: None,
            updated_input: None,
            updated_output: None,
            interrupt: None,
            exit_override: None,
        }
    }

    /// Fold one result in. Returns [`Flow::Stop`] once the blocking verdict
    /// has been reached.
    pub fn apply(&mut self, result: ActionResult) -> Flow {
        if let Some(verdict) = result.verdict {
            if self.verdict == Some(verdict) {
                append_line(&mut self.reason, &result.reason);
            } else {
                self.verdict = Some(verdict);
                self.reason = result.reason;
            }
        }
        append_line(&mut self.additional_context, &result.additional_context);
        append_line(&mut self.system_message, &result.system_message);
        if !result.stop_reason.is_empty() {
            self.stop_reason = result.stop_reason;
        }
        if result.suppress_output.is_some() {
            self.suppress_output = result.suppress_output;
        }
        if self.hook_event_name.is_none() {
            self.hook_event_name = result.hook_event_name.filter(|name| !name.is_empty());
        }
        if result.updated_input.is_some() {
            self.updated_input = result.updated_input;
        }
        if result.updated_output.is_some() {
            self.updated_output = result.updated_output;
        }
        if result.interrupt.is_some() {
            self.interrupt = result.interrupt;
        }
        if self.exit_override.is_none() {
            self.exit_override = result.exit_override;
        }
        if result.proceed == Some(false) && self.policy.can_block() {
            self.proceed = false;
        }

        if self.is_blocked() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    /// Force the fail-safe verdict after errors and record them in the
    /// system message.
    pub fn fail(&mut self, errors: &str) {
        if let Some(fail_safe) = self.policy.fail_safe {
            if self.verdict != Some(fail_safe) {
                self.verdict = Some(fail_safe);
                self.reason = errors.to_string();
            }
        }
        append_line(&mut self.system_message, errors);
    }

    pub fn policy(&self) -> &CategoryPolicy {
        &self.policy
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_blocked(&self) -> bool {
        self.policy.is_blocking(self.verdict)
    }

    pub fn exit_override(&self) -> Option<&ExitOverride> {
        self.exit_override.as_ref()
    }

    /// Render the category-shaped output. Updated payloads are dropped when
    /// the final verdict blocks.
    pub fn finish(&self) -> HookOutput {
        let policy = &self.policy;
        let blocked = self.is_blocked();
        let reason = non_empty(&self.reason);

        let mut output = HookOutput {
            proceed: !policy.can_block() || self.proceed,
            stop_reason: non_empty(&self.stop_reason),
            suppress_output: self.suppress_output,
            system_message: non_empty(&self.system_message),
            ..HookOutput::default()
        };

        if policy.verdict_field == VerdictField::Decision && blocked {
            output.decision = Some(Verdict::Block.as_str().to_string());
            output.reason = reason.clone();
        }

        if policy.hook_specific {
            let mut specific = HookSpecificOutput {
                hook_event_name: self
                    .hook_event_name
                    .clone()
                    .unwrap_or_else(|| policy.category.name().to_string()),
                ..HookSpecificOutput::default()
            };
            match (policy.verdict_field, self.verdict) {
                (VerdictField::PermissionDecision, Some(verdict)) => {
                    specific.permission_decision = Some(verdict.as_str().to_string());
                    specific.permission_decision_reason = reason;
                    if !blocked {
                        specific.updated_input = self.updated_input.clone();
                    }
                }
                (VerdictField::Behavior, Some(verdict)) => {
                    specific.decision = Some(if blocked {
                        PermissionRequestDecision {
                            behavior: verdict.as_str().to_string(),
                            updated_input: None,
                            message: reason,
                            interrupt: self.interrupt,
                        }
                    } else {
                        PermissionRequestDecision {
                            behavior: verdict.as_str().to_string(),
                            updated_input: self.updated_input.clone(),
                            message: None,
                            interrupt: None,
                        }
                    });
                }
                _ => {}
            }
            if policy.additional_context {
                specific.additional_context = non_empty(&self.additional_context);
            }
            if policy.updated_output && !blocked {
                specific.updated_mcp_tool_output = self.updated_output.clone();
            }
            output.hook_specific_output = Some(specific);
        }

        output
    }
}

fn append_line(acc: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !acc.is_empty() {
        acc.push('\n');
    }
    acc.push_str(text);
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
