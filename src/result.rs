//! Normalized outcome of one action.

use serde_json::Value;

use crate::policy::{CategoryPolicy, MessageRoute, Verdict};

/// Exit code and message requested by an `output` action for legacy
/// (non-JSON) mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitOverride {
    pub code: i32,
    pub message: String,
}

/// What one action contributed. Empty strings and `None` mean "no opinion".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionResult {
    pub proceed: Option<bool>,
    pub verdict: Option<Verdict>,
    pub reason: String,
    pub additional_context: String,
    pub system_message: String,
    pub stop_reason: String,
    pub suppress_output: Option<bool>,
    pub updated_input: Option<Value>,
    pub updated_output: Option<Value>,
    pub hook_event_name: Option<String>,
    pub interrupt: Option<bool>,
    pub exit_override: Option<ExitOverride>,
}

impl ActionResult {
    pub fn verdict(verdict: Verdict, reason: impl Into<String>) -> Self {
        Self {
            verdict: Some(verdict),
            reason: reason.into(),
            ..Self::default()
        }
    }

    /// Result substituted for a failed action: the category's blocking
    /// verdict with the failure as its reason, or nothing for categories
    /// that cannot block.
    pub fn fail_safe(policy: &CategoryPolicy, reason: impl Into<String>) -> Self {
        match policy.fail_safe {
            Some(verdict) => Self::verdict(verdict, reason),
            None => Self::default(),
        }
    }

    /// Put free-form text where the category wants it.
    pub fn route_message(&mut self, policy: &CategoryPolicy, message: String) {
        match policy.message_route {
            MessageRoute::AdditionalContext => self.additional_context = message,
            MessageRoute::SystemMessage => self.system_message = message,
        }
    }
}
