//! YAML rule configuration.
//!
//! ```yaml
//! settings:
//!   command_timeout: 30
//! PreToolUse:
//!   - matcher: "Write|Edit"
//!     conditions:
//!       - type: file_extension
//!         value: ".rs"
//!     actions:
//!       - type: command
//!         command: "rustfmt {.tool_input.file_path}"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::action::Action;
use crate::condition::Condition;
use crate::error::ConfigError;
use crate::event::Category;
use crate::runner::ShellRunner;

const APP_DIR: &str = "cc-hook-rules";
const CONFIG_FILE: &str = "config.yaml";

/// One matcher + conditions + actions block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookRule {
    /// Pipe-separated glob alternatives; empty matches everything.
    #[serde(default)]
    pub matcher: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Seconds a command may run. Unbounded when unset.
    pub command_timeout: Option<u64>,
    pub shell: String,
    /// `false` selects legacy exit-code mode.
    pub structured_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command_timeout: None,
            shell: ShellRunner::DEFAULT_SHELL.to_string(),
            structured_output: true,
        }
    }
}

impl Settings {
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout.map(Duration::from_secs)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "PreToolUse")]
    pre_tool_use: Vec<HookRule>,
    #[serde(default, rename = "PostToolUse")]
    post_tool_use: Vec<HookRule>,
    #[serde(default, rename = "PermissionRequest")]
    permission_request: Vec<HookRule>,
    #[serde(default, rename = "Notification")]
    notification: Vec<HookRule>,
    #[serde(default, rename = "Stop")]
    stop: Vec<HookRule>,
    #[serde(default, rename = "SubagentStop")]
    subagent_stop: Vec<HookRule>,
    #[serde(default, rename = "SubagentStart")]
    subagent_start: Vec<HookRule>,
    #[serde(default, rename = "PreCompact")]
    pre_compact: Vec<HookRule>,
    #[serde(default, rename = "SessionStart")]
    session_start: Vec<HookRule>,
    #[serde(default, rename = "SessionEnd")]
    session_end: Vec<HookRule>,
    #[serde(default, rename = "UserPromptSubmit")]
    user_prompt_submit: Vec<HookRule>,
}

impl Config {
    /// Read, parse and validate a config file.
    ///
    /// A bad condition only fails its own rule at dispatch, so it is logged
    /// here rather than rejected. `--check` reports it through [`Config::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut fatal = Vec::new();
        for (severity, problem) in config.problems() {
            match severity {
                Severity::Fatal => fatal.push(problem),
                Severity::SkipsRule => tracing::warn!(path = %path.display(), "{problem}"),
            }
        }
        if !fatal.is_empty() {
            return Err(ConfigError::Invalid(fatal));
        }
        tracing::debug!(path = %path.display(), rules = config.rule_count(), "loaded config");
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file is an empty config.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, no rules");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse without validating.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// `$XDG_CONFIG_HOME/cc-hook-rules/config.yaml`, else
    /// `~/.config/cc-hook-rules/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        let base = match std::env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs_next::home_dir()?.join(".config"),
        };
        Some(base.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn rules(&self, category: Category) -> &[HookRule] {
        match category {
            Category::PreToolUse => &self.pre_tool_use,
            Category::PostToolUse => &self.post_tool_use,
            Category::PermissionRequest => &self.permission_request,
            Category::Notification => &self.notification,
            Category::Stop => &self.stop,
            Category::SubagentStop => &self.subagent_stop,
            Category::SubagentStart => &self.subagent_start,
            Category::PreCompact => &self.pre_compact,
            Category::SessionStart => &self.session_start,
            Category::SessionEnd => &self.session_end,
            Category::UserPromptSubmit => &self.user_prompt_submit,
        }
    }

    pub fn rules_mut(&mut self, category: Category) -> &mut Vec<HookRule> {
        match category {
            Category::PreToolUse => &mut self.pre_tool_use,
            Category::PostToolUse => &mut self.post_tool_use,
            Category::PermissionRequest => &mut self.permission_request,
            Category::Notification => &mut self.notification,
            Category::Stop => &mut self.stop,
            Category::SubagentStop => &mut self.subagent_stop,
            Category::SubagentStart => &mut self.subagent_start,
            Category::PreCompact => &mut self.pre_compact,
            Category::SessionStart => &mut self.session_start,
            Category::SessionEnd => &mut self.session_end,
            Category::UserPromptSubmit => &mut self.user_prompt_submit,
        }
    }

    pub fn rule_count(&self) -> usize {
        Category::ALL
            .into_iter()
            .map(|category| self.rules(category).len())
            .sum()
    }

    /// Every problem found, one line each. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        self.problems()
            .into_iter()
            .map(|(_, problem)| problem)
            .collect()
    }

    fn problems(&self) -> Vec<(Severity, String)> {
        let mut problems = Vec::new();
        if self.settings.shell.trim().is_empty() {
            problems.push((Severity::Fatal, "settings.shell must not be empty".to_string()));
        }
        for category in Category::ALL {
            for (r, rule) in self.rules(category).iter().enumerate() {
                let at = format!("{category} rule #{}", r + 1);
                if rule.actions.is_empty() {
                    problems.push((Severity::Fatal, format!("{at}: no actions")));
                }
                for (c, condition) in rule.conditions.iter().enumerate() {
                    if let Err(e) = condition.validate(category) {
                        problems.push((
                            Severity::SkipsRule,
                            format!("{at} condition #{}: {e}", c + 1),
                        ));
                    }
                }
                for (a, action) in rule.actions.iter().enumerate() {
                    if let Err(e) = action.validate(category) {
                        problems.push((Severity::Fatal, format!("{at} action #{}: {e}", a + 1)));
                    }
                }
            }
        }
        problems
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Severity {
    /// The config cannot be used.
    Fatal,
    /// The owning rule is skipped when dispatched.
    SkipsRule,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
