//! Per-category strategy table.
//!
//! Every category-dependent decision the engine makes (which verdict field
//! exists, which value blocks, what the fail-safe is, where free-form text is
//! routed, what the matcher looks at) is read from a [`CategoryPolicy`] so the
//! dispatch and merge code stays category-agnostic.

use crate::event::Category;

/// Name of the verdict field a category carries on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerdictField {
    /// `hookSpecificOutput.permissionDecision`
    PermissionDecision,
    /// `hookSpecificOutput.decision.behavior`
    Behavior,
    /// top-level `decision`
    Decision,
    /// Category cannot block.
    None,
}

/// A category verdict value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
    Ask,
    Block,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Allow => "allow",
            Verdict::Deny => "deny",
            Verdict::Ask => "ask",
            Verdict::Block => "block",
        }
    }
}

/// Where free-form message text goes when it is not a verdict reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageRoute {
    AdditionalContext,
    SystemMessage,
}

/// Event field a rule's matcher is compared against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subject {
    ToolName,
    NotificationType,
    Source,
    Reason,
    Trigger,
    AgentType,
    None,
}

/// Category-specific group of condition kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Tool,
    Prompt,
    Stop,
    SessionStart,
    SessionEnd,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CategoryPolicy {
    pub category: Category,
    pub verdict_field: VerdictField,
    /// The blocking verdict, which is also the fail-safe. `None` for
    /// categories that cannot block.
    pub fail_safe: Option<Verdict>,
    pub message_route: MessageRoute,
    pub subject: Subject,
    pub scope: Scope,
    /// Emits a `hookSpecificOutput` object.
    pub hook_specific: bool,
    pub additional_context: bool,
    pub updated_input: bool,
    pub updated_output: bool,
}

impl CategoryPolicy {
    pub fn can_block(&self) -> bool {
        self.fail_safe.is_some()
    }

    pub fn is_blocking(&self, verdict: Option<Verdict>) -> bool {
        verdict.is_some() && verdict == self.fail_safe
    }

    /// Parse a verdict value as written in config or command output.
    /// For `decision` categories an empty string means allow.
    pub fn parse_verdict(&self, raw: &str) -> Result<Verdict, String> {
        let verdict = match (self.verdict_field, raw) {
            (VerdictField::PermissionDecision, "allow") => Verdict::Allow,
            (VerdictField::PermissionDecision, "deny") => Verdict::Deny,
            (VerdictField::PermissionDecision, "ask") => Verdict::Ask,
            (VerdictField::Behavior, "allow") => Verdict::Allow,
            (VerdictField::Behavior, "deny") => Verdict::Deny,
            (VerdictField::Decision, "block") => Verdict::Block,
            (VerdictField::Decision, "") => Verdict::Allow,
            (VerdictField::None, _) => {
                return Err(format!("{} hooks do not take a verdict", self.category));
            }
            (field, other) => {
                return Err(format!(
                    "invalid {} value '{}' for {} (expected {})",
                    field_name(field),
                    other,
                    self.category,
                    expected_values(field)
                ));
            }
        };
        Ok(verdict)
    }
}

fn field_name(field: VerdictField) -> &'static str {
    match field {
        VerdictField::PermissionDecision => "permissionDecision",
        VerdictField::Behavior => "behavior",
        VerdictField::Decision => "decision",
        VerdictField::None => "verdict",
    }
}

fn expected_values(field: VerdictField) -> &'static str {
    match field {
        VerdictField::PermissionDecision => "allow, deny or ask",
        VerdictField::Behavior => "allow or deny",
        VerdictField::Decision => "\"block\" or empty",
        VerdictField::None => "nothing",
    }
}

/// The strategy table.
pub fn policy(category: Category) -> CategoryPolicy {
    let base = CategoryPolicy {
        category,
        verdict_field: VerdictField::None,
        fail_safe: None,
        message_route: MessageRoute::SystemMessage,
        subject: Subject::None,
        scope: Scope::Other,
        hook_specific: false,
        additional_context: false,
        updated_input: false,
        updated_output: false,
    };
    match category {
        Category::PreToolUse => CategoryPolicy {
            verdict_field: VerdictField::PermissionDecision,
            fail_safe: Some(Verdict::Deny),
            message_route: MessageRoute::AdditionalContext,
            subject: Subject::ToolName,
            scope: Scope::Tool,
            hook_specific: true,
            additional_context: true,
            updated_input: true,
            ..base
        },
        Category::PermissionRequest => CategoryPolicy {
            verdict_field: VerdictField::Behavior,
            fail_safe: Some(Verdict::Deny),
            subject: Subject::ToolName,
            scope: Scope::Tool,
            hook_specific: true,
            updated_input: true,
            ..base
        },
        Category::PostToolUse => CategoryPolicy {
            verdict_field: VerdictField::Decision,
            fail_safe: Some(Verdict::Block),
            message_route: MessageRoute::AdditionalContext,
            subject: Subject::ToolName,
            scope: Scope::Tool,
            hook_specific: true,
            additional_context: true,
            updated_output: true,
            ..base
        },
        Category::Stop => CategoryPolicy {
            verdict_field: VerdictField::Decision,
            fail_safe: Some(Verdict::Block),
            scope: Scope::Stop,
            ..base
        },
        Category::SubagentStop => CategoryPolicy {
            verdict_field: VerdictField::Decision,
            fail_safe: Some(Verdict::Block),
            subject: Subject::AgentType,
            scope: Scope::Stop,
            ..base
        },
        Category::UserPromptSubmit => CategoryPolicy {
            verdict_field: VerdictField::Decision,
            fail_safe: Some(Verdict::Block),
            message_route: MessageRoute::AdditionalContext,
            scope: Scope::Prompt,
            hook_specific: true,
            additional_context: true,
            ..base
        },
        Category::Notification => CategoryPolicy {
            subject: Subject::NotificationType,
            ..base
        },
        Category::SessionStart => CategoryPolicy {
            message_route: MessageRoute::AdditionalContext,
            subject: Subject::Source,
            scope: Scope::SessionStart,
            hook_specific: true,
            additional_context: true,
            ..base
        },
        Category::SessionEnd => CategoryPolicy {
            subject: Subject::Reason,
            scope: Scope::SessionEnd,
            ..base
        },
        Category::PreCompact => CategoryPolicy {
            subject: Subject::Trigger,
            ..base
        },
        Category::SubagentStart => CategoryPolicy {
            message_route: MessageRoute::AdditionalContext,
            subject: Subject::AgentType,
            hook_specific: true,
            additional_context: true,
            ..base
        },
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
