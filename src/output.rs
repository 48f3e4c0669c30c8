//! Wire shapes: the JSON a command prints and the JSON this hook prints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ActionError;
use crate::policy::{CategoryPolicy, Verdict, VerdictField};
use crate::result::ActionResult;

/// Final Output written to stdout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    #[serde(rename = "continue")]
    pub proceed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_output: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl Default for HookOutput {
    fn default() -> Self {
        Self {
            proceed: true,
            stop_reason: None,
            suppress_output: None,
            system_message: None,
            decision: None,
            reason: None,
            hook_specific_output: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<PermissionRequestDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(
        rename = "updatedMCPToolOutput",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_mcp_tool_output: Option<Value>,
}

/// PermissionRequest verdict object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequestDecision {
    pub behavior: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<bool>,
}

/// JSON printed by a `command` action. Every field is optional at the
/// serde level; which ones are required depends on the category and is
/// checked by [`CommandResponse::into_result`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    #[serde(rename = "continue")]
    pub proceed: Option<bool>,
    pub stop_reason: Option<String>,
    pub suppress_output: Option<bool>,
    pub system_message: Option<String>,
    pub decision: Option<String>,
    pub reason: Option<String>,
    pub hook_specific_output: Option<SpecificResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificResponse {
    pub hook_event_name: Option<String>,
    pub permission_decision: Option<String>,
    pub permission_decision_reason: Option<String>,
    pub updated_input: Option<Value>,
    pub decision: Option<PermissionResponse>,
    pub additional_context: Option<String>,
    #[serde(rename = "updatedMCPToolOutput")]
    pub updated_mcp_tool_output: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub behavior: String,
    pub updated_input: Option<Value>,
    pub message: Option<String>,
    pub interrupt: Option<bool>,
}

impl CommandResponse {
    /// Parse non-empty command stdout and validate it for the category.
    pub fn parse(stdout: &str, policy: &CategoryPolicy) -> Result<ActionResult, ActionError> {
        let response: CommandResponse = serde_json::from_str(stdout)
            .map_err(|e| ActionError::invalid(policy.category, format!("not valid JSON: {e}")))?;
        response.into_result(policy)
    }

    /// Map a parsed response onto an [`ActionResult`], rejecting anything the
    /// category does not allow.
    pub fn into_result(self, policy: &CategoryPolicy) -> Result<ActionResult, ActionError> {
        let category = policy.category;
        let invalid = |reason: &str| ActionError::invalid(category, reason);

        let mut result = ActionResult {
            proceed: self.proceed,
            stop_reason: self.stop_reason.unwrap_or_default(),
            suppress_output: self.suppress_output,
            system_message: self.system_message.unwrap_or_default(),
            ..ActionResult::default()
        };

        if policy.verdict_field != VerdictField::Decision
            && (self.decision.is_some() || self.reason.is_some())
        {
            return Err(invalid(
                "top-level decision/reason is not accepted for this event",
            ));
        }

        let specific = match self.hook_specific_output {
            Some(specific) => {
                if !policy.hook_specific {
                    return Err(invalid("hookSpecificOutput is not accepted for this event"));
                }
                match specific.hook_event_name.as_deref() {
                    Some(name) if name == category.name() => {}
                    Some(name) => {
                        return Err(invalid(&format!(
                            "hookSpecificOutput.hookEventName is '{name}', expected '{category}'"
                        )));
                    }
                    None => return Err(invalid("hookSpecificOutput.hookEventName is required")),
                }
                result.hook_event_name = specific.hook_event_name.clone();
                check_specific_fields(&specific, policy).map_err(|reason| invalid(&reason))?;
                Some(specific)
            }
            None => None,
        };

        match policy.verdict_field {
            VerdictField::PermissionDecision => {
                let specific = specific.ok_or_else(|| invalid("hookSpecificOutput is required"))?;
                let raw = specific
                    .permission_decision
                    .ok_or_else(|| invalid("hookSpecificOutput.permissionDecision is required"))?;
                let verdict = policy.parse_verdict(&raw).map_err(|e| invalid(&e))?;
                if verdict == Verdict::Deny && specific.updated_input.is_some() {
                    return Err(invalid("updatedInput cannot accompany a deny decision"));
                }
                result.verdict = Some(verdict);
                result.reason = specific.permission_decision_reason.unwrap_or_default();
                result.updated_input = specific.updated_input;
                result.additional_context = specific.additional_context.unwrap_or_default();
            }
            VerdictField::Behavior => {
                let decision = specific
                    .and_then(|specific| specific.decision)
                    .ok_or_else(|| invalid("hookSpecificOutput.decision is required"))?;
                let verdict = policy.parse_verdict(&decision.behavior).map_err(|e| invalid(&e))?;
                match verdict {
                    Verdict::Deny => {
                        if decision.updated_input.is_some() {
                            return Err(invalid("updatedInput cannot accompany a deny behavior"));
                        }
                        result.reason = decision.message.unwrap_or_default();
                        result.interrupt = decision.interrupt;
                    }
                    _ => {
                        if decision.message.as_deref().is_some_and(|m| !m.is_empty()) {
                            return Err(invalid("message is only valid with a deny behavior"));
                        }
                        if decision.interrupt.is_some() {
                            return Err(invalid("interrupt is only valid with a deny behavior"));
                        }
                        result.updated_input = decision.updated_input;
                    }
                }
                result.verdict = Some(verdict);
            }
            VerdictField::Decision => {
                let verdict = policy
                    .parse_verdict(self.decision.as_deref().unwrap_or_default())
                    .map_err(|e| invalid(&e))?;
                let reason = self.reason.unwrap_or_default();
                if verdict == Verdict::Block && reason.trim().is_empty() {
                    return Err(invalid("reason is required when decision is \"block\""));
                }
                if let Some(specific) = specific {
                    if verdict == Verdict::Block && specific.updated_mcp_tool_output.is_some() {
                        return Err(invalid(
                            "updatedMCPToolOutput cannot accompany a block decision",
                        ));
                    }
                    result.additional_context = specific.additional_context.unwrap_or_default();
                    result.updated_output = specific.updated_mcp_tool_output;
                }
                result.verdict = Some(verdict);
                result.reason = reason;
            }
            VerdictField::None => {
                if let Some(specific) = specific {
                    result.additional_context = specific.additional_context.unwrap_or_default();
                }
            }
        }

        Ok(result)
    }
}

/// Reject `hookSpecificOutput` fields that do not exist for the category.
fn check_specific_fields(
    specific: &SpecificResponse,
    policy: &CategoryPolicy,
) -> Result<(), String> {
    let present = [
        (
            "permissionDecision",
            specific.permission_decision.is_some() || specific.permission_decision_reason.is_some(),
            policy.verdict_field == VerdictField::PermissionDecision,
        ),
        (
            "decision",
            specific.decision.is_some(),
            policy.verdict_field == VerdictField::Behavior,
        ),
        (
            "updatedInput",
            specific.updated_input.is_some(),
            policy.verdict_field == VerdictField::PermissionDecision,
        ),
        (
            "additionalContext",
            specific.additional_context.is_some(),
            policy.additional_context,
        ),
        (
            "updatedMCPToolOutput",
            specific.updated_mcp_tool_output.is_some(),
            policy.updated_output,
        ),
    ];
    for (field, is_set, allowed) in present {
        if is_set && !allowed {
            return Err(format!(
                "hookSpecificOutput.{field} is not accepted for {}",
                policy.category
            ));
        }
    }
    if let Some(input) = specific
        .updated_input
        .as_ref()
        .or_else(|| specific.decision.as_ref().and_then(|d| d.updated_input.as_ref()))
    {
        if !input.is_object() {
            return Err("updatedInput must be a JSON object".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
