//! Event categories and the typed event envelope read from stdin.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventError;
use crate::policy::{self, CategoryPolicy, Subject};
use crate::transcript::expand_path;

/// Lifecycle stage of the host that triggered this hook call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    PreToolUse,
    PostToolUse,
    PermissionRequest,
    Notification,
    Stop,
    SubagentStop,
    SubagentStart,
    PreCompact,
    SessionStart,
    SessionEnd,
    UserPromptSubmit,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::PreToolUse,
        Category::PostToolUse,
        Category::PermissionRequest,
        Category::Notification,
        Category::Stop,
        Category::SubagentStop,
        Category::SubagentStart,
        Category::PreCompact,
        Category::SessionStart,
        Category::SessionEnd,
        Category::UserPromptSubmit,
    ];

    /// Wire name, as used in `hook_event_name` and config keys.
    pub fn name(self) -> &'static str {
        match self {
            Category::PreToolUse => "PreToolUse",
            Category::PostToolUse => "PostToolUse",
            Category::PermissionRequest => "PermissionRequest",
            Category::Notification => "Notification",
            Category::Stop => "Stop",
            Category::SubagentStop => "SubagentStop",
            Category::SubagentStart => "SubagentStart",
            Category::PreCompact => "PreCompact",
            Category::SessionStart => "SessionStart",
            Category::SessionEnd => "SessionEnd",
            Category::UserPromptSubmit => "UserPromptSubmit",
        }
    }

    pub fn policy(self) -> CategoryPolicy {
        policy::policy(self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.name() == s)
            .ok_or_else(|| EventError::UnknownCategory(s.to_string()))
    }
}

/// Fields every event carries.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommonFields {
    #[serde(default)]
    pub session_id: String,
    pub transcript_path: Option<String>,
    pub cwd: Option<String>,
    pub permission_mode: Option<String>,
    pub hook_event_name: Option<String>,
}

/// PreToolUse, PostToolUse and PermissionRequest.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ToolFields {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Value,
    pub tool_response: Option<Value>,
    pub tool_use_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NotificationFields {
    #[serde(default)]
    pub message: String,
    pub title: Option<String>,
    pub notification_type: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PromptFields {
    #[serde(default)]
    pub prompt: String,
}

/// Stop and SubagentStop.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StopFields {
    #[serde(default)]
    pub stop_hook_active: bool,
    pub agent_id: Option<String>,
    pub agent_type: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SubagentFields {
    pub agent_id: Option<String>,
    pub agent_type: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CompactFields {
    pub trigger: Option<String>,
    pub custom_instructions: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionStartFields {
    pub source: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionEndFields {
    pub reason: Option<String>,
}

/// Category-specific part of the envelope.
#[derive(Clone, Debug)]
pub enum EventDetail {
    Tool(ToolFields),
    Notification(NotificationFields),
    Prompt(PromptFields),
    Stop(StopFields),
    SubagentStart(SubagentFields),
    Compact(CompactFields),
    SessionStart(SessionStartFields),
    SessionEnd(SessionEndFields),
}

/// One hook invocation's input. Immutable once parsed.
#[derive(Clone, Debug)]
pub struct Event {
    category: Category,
    common: CommonFields,
    detail: EventDetail,
    raw: Value,
}

impl Event {
    /// Parse stdin text. The category comes from `category` when given,
    /// otherwise from the payload's `hook_event_name`.
    pub fn parse(input: &str, category: Option<Category>) -> Result<Self, EventError> {
        let raw: Value = serde_json::from_str(input).map_err(EventError::Json)?;
        let category = match category {
            Some(category) => category,
            None => raw
                .get("hook_event_name")
                .and_then(Value::as_str)
                .ok_or(EventError::MissingCategory)?
                .parse()?,
        };
        Self::from_value(category, raw)
    }

    pub fn from_value(category: Category, raw: Value) -> Result<Self, EventError> {
        if !raw.is_object() {
            return Err(EventError::NotAnObject);
        }
        let common: CommonFields = decode(&raw)?;
        if let Some(name) = common.hook_event_name.as_deref() {
            if !name.is_empty() && name != category.name() {
                return Err(EventError::Mismatch {
                    expected: category,
                    found: name.to_string(),
                });
            }
        }
        let detail = match category {
            Category::PreToolUse | Category::PostToolUse | Category::PermissionRequest => {
                EventDetail::Tool(decode(&raw)?)
            }
            Category::Notification => EventDetail::Notification(decode(&raw)?),
            Category::UserPromptSubmit => EventDetail::Prompt(decode(&raw)?),
            Category::Stop | Category::SubagentStop => EventDetail::Stop(decode(&raw)?),
            Category::SubagentStart => EventDetail::SubagentStart(decode(&raw)?),
            Category::PreCompact => EventDetail::Compact(decode(&raw)?),
            Category::SessionStart => EventDetail::SessionStart(decode(&raw)?),
            Category::SessionEnd => EventDetail::SessionEnd(decode(&raw)?),
        };
        Ok(Self {
            category,
            common,
            detail,
            raw,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn common(&self) -> &CommonFields {
        &self.common
    }

    pub fn detail(&self) -> &EventDetail {
        &self.detail
    }

    /// The untouched JSON payload, used for queries and command stdin.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn tool(&self) -> Option<&ToolFields> {
        match &self.detail {
            EventDetail::Tool(tool) => Some(tool),
            _ => None,
        }
    }

    /// A string field of `tool_input`, if present.
    pub fn tool_input_str(&self, field: &str) -> Option<&str> {
        self.tool()?.tool_input.get(field)?.as_str()
    }

    pub fn prompt(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Prompt(prompt) => Some(prompt.prompt.as_str()),
            _ => None,
        }
    }

    /// Directory relative paths are resolved against: the event's cwd,
    /// else the process working directory.
    pub fn cwd(&self) -> PathBuf {
        match self.common.cwd.as_deref() {
            Some(cwd) if !cwd.is_empty() => expand_path(cwd),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn transcript_path(&self) -> Option<PathBuf> {
        self.common
            .transcript_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .map(expand_path)
    }

    /// The value a rule's matcher is compared against, if this category has one.
    pub fn subject(&self) -> Option<&str> {
        match (self.category.policy().subject, &self.detail) {
            (Subject::ToolName, EventDetail::Tool(tool)) => Some(tool.tool_name.as_str()),
            (Subject::NotificationType, EventDetail::Notification(n)) => {
                Some(n.notification_type.as_deref().unwrap_or_default())
            }
            (Subject::Source, EventDetail::SessionStart(s)) => {
                Some(s.source.as_deref().unwrap_or_default())
            }
            (Subject::Reason, EventDetail::SessionEnd(s)) => {
                Some(s.reason.as_deref().unwrap_or_default())
            }
            (Subject::Trigger, EventDetail::Compact(c)) => {
                Some(c.trigger.as_deref().unwrap_or_default())
            }
            (Subject::AgentType, EventDetail::Stop(s)) => {
                Some(s.agent_type.as_deref().unwrap_or_default())
            }
            (Subject::AgentType, EventDetail::SubagentStart(s)) => {
                Some(s.agent_type.as_deref().unwrap_or_default())
            }
            _ => None,
        }
    }
}

/// Best-effort category sniffing for inputs that fail to parse as a full event.
pub fn sniff_category(input: &str) -> Option<Category> {
    let raw: Value = serde_json::from_str(input).ok()?;
    raw.get("hook_event_name")?.as_str()?.parse().ok()
}

fn decode<T: serde::de::DeserializeOwned>(raw: &Value) -> Result<T, EventError> {
    T::deserialize(raw).map_err(EventError::Json)
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
