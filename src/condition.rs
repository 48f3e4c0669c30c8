//! Rule conditions.
//!
//! Conditions form a closed vocabulary: common kinds apply to every category,
//! the rest only to the category group named by their [`Scope`]. Evaluating a
//! condition outside its scope is an error, never a silent `false`.
//!
//! Values are written as strings or YAML scalars (`value: 50` and
//! `value: "50"` are the same) and parsed once, when the config loads. A value
//! that does not parse is kept as [`Parsed::Invalid`] so only its rule fails.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::ConditionError;
use crate::event::{Category, Event, EventDetail};
use crate::policy::Scope;
use crate::transcript::{self, expand_path};

/// One condition as written in config: `{type: <kind>, value: <value>}`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Condition {
    FileExists(String),
    FileExistsRecursive(String),
    FileNotExists(String),
    FileNotExistsRecursive(String),
    DirExists(String),
    DirExistsRecursive(String),
    DirNotExists(String),
    DirNotExistsRecursive(String),
    CwdIs(String),
    CwdIsNot(String),
    CwdContains(String),
    CwdNotContains(String),
    PermissionModeIs(String),
    RandomChance(Parsed<Percent>),
    TranscriptContains(String),

    FileExtension(String),
    CommandContains(String),
    CommandStartsWith(String),
    UrlStartsWith(String),
    /// Pipe-separated sub-commands, e.g. `rm|mv`.
    GitTrackedFileOperation(Parsed<Operations>),

    PromptContains(String),
    PromptStartsWith(String),
    PromptEndsWith(String),
    PromptRegex(Parsed<PromptPattern>),
    EveryNPrompts(Parsed<Interval>),

    StopHookActive(Parsed<bool>),
    SourceIs(String),
    ReasonIs(String),
}

/// A value that must be parsed from its written form.
pub trait ConditionValue: Sized {
    fn parse(raw: &str) -> Result<Self, String>;
}

/// A condition value after parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Parsed<T> {
    Valid(T),
    Invalid { raw: String, reason: String },
}

impl<T: ConditionValue> From<&str> for Parsed<T> {
    fn from(raw: &str) -> Self {
        match T::parse(raw) {
            Ok(value) => Parsed::Valid(value),
            Err(reason) => Parsed::Invalid {
                raw: raw.to_string(),
                reason,
            },
        }
    }
}

impl<'de, T: ConditionValue> Deserialize<'de> for Parsed<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match Scalar::deserialize(deserializer)? {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Text(s) => s,
        };
        Ok(Parsed::from(raw.as_str()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Percentage, 0 to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Percent(pub u32);

impl ConditionValue for Percent {
    fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let percent: u32 = raw
            .parse()
            .map_err(|_| format!("'{raw}' is not a number"))?;
        if percent > 100 {
            return Err(format!("{percent} is not a percentage between 0 and 100"));
        }
        Ok(Percent(percent))
    }
}

/// Prompt interval N, at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval(pub usize);

impl ConditionValue for Interval {
    fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        match raw.parse::<usize>() {
            Ok(0) => Err("N must be at least 1".to_string()),
            Ok(n) => Ok(Interval(n)),
            Err(_) => Err(format!("'{raw}' is not a number")),
        }
    }
}

impl ConditionValue for bool {
    fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        raw.parse()
            .map_err(|_| format!("expected true or false, got '{raw}'"))
    }
}

/// Sub-command names from a pipe-separated list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operations(pub Vec<String>);

impl ConditionValue for Operations {
    fn parse(raw: &str) -> Result<Self, String> {
        let ops: Vec<String> = raw
            .split('|')
            .map(str::trim)
            .filter(|op| !op.is_empty())
            .map(str::to_string)
            .collect();
        if ops.is_empty() {
            return Err("expected sub-commands such as \"rm|mv\"".to_string());
        }
        Ok(Operations(ops))
    }
}

/// A prompt regex, compiled once.
#[derive(Clone, Debug)]
pub struct PromptPattern(pub Regex);

impl ConditionValue for PromptPattern {
    fn parse(raw: &str) -> Result<Self, String> {
        Regex::new(raw).map(PromptPattern).map_err(|e| e.to_string())
    }
}

impl PartialEq for PromptPattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Eq for PromptPattern {}

/// Which category group a condition kind belongs to. `None` means common.
fn kind_scope(condition: &Condition) -> Option<Scope> {
    use Condition::*;
    match condition {
        FileExtension(_)
        | CommandContains(_)
        | CommandStartsWith(_)
        | UrlStartsWith(_)
        | GitTrackedFileOperation(_) => Some(Scope::Tool),
        PromptContains(_)
        | PromptStartsWith(_)
        | PromptEndsWith(_)
        | PromptRegex(_)
        | EveryNPrompts(_) => Some(Scope::Prompt),
        StopHookActive(_) => Some(Scope::Stop),
        SourceIs(_) => Some(Scope::SessionStart),
        ReasonIs(_) => Some(Scope::SessionEnd),
        _ => None,
    }
}

impl Condition {
    /// Config tag of this condition.
    pub fn kind(&self) -> &'static str {
        use Condition::*;
        match self {
            FileExists(_) => "file_exists",
            FileExistsRecursive(_) => "file_exists_recursive",
            FileNotExists(_) => "file_not_exists",
            FileNotExistsRecursive(_) => "file_not_exists_recursive",
            DirExists(_) => "dir_exists",
            DirExistsRecursive(_) => "dir_exists_recursive",
            DirNotExists(_) => "dir_not_exists",
            DirNotExistsRecursive(_) => "dir_not_exists_recursive",
            CwdIs(_) => "cwd_is",
            CwdIsNot(_) => "cwd_is_not",
            CwdContains(_) => "cwd_contains",
            CwdNotContains(_) => "cwd_not_contains",
            PermissionModeIs(_) => "permission_mode_is",
            RandomChance(_) => "random_chance",
            TranscriptContains(_) => "transcript_contains",
            FileExtension(_) => "file_extension",
            CommandContains(_) => "command_contains",
            CommandStartsWith(_) => "command_starts_with",
            UrlStartsWith(_) => "url_starts_with",
            GitTrackedFileOperation(_) => "git_tracked_file_operation",
            PromptContains(_) => "prompt_contains",
            PromptStartsWith(_) => "prompt_starts_with",
            PromptEndsWith(_) => "prompt_ends_with",
            PromptRegex(_) => "prompt_regex",
            EveryNPrompts(_) => "every_n_prompts",
            StopHookActive(_) => "stop_hook_active",
            SourceIs(_) => "source_is",
            ReasonIs(_) => "reason_is",
        }
    }

    pub fn supports(&self, category: Category) -> bool {
        match kind_scope(self) {
            None => true,
            Some(scope) => category.policy().scope == scope,
        }
    }

    /// Static checks that do not need an event: scope and value shape.
    pub fn validate(&self, category: Category) -> Result<(), ConditionError> {
        self.check_scope(category)?;
        use Condition::*;
        match self {
            RandomChance(value) => self.value(value).map(drop),
            GitTrackedFileOperation(value) => self.value(value).map(drop),
            PromptRegex(value) => self.value(value).map(drop),
            EveryNPrompts(value) => self.value(value).map(drop),
            StopHookActive(value) => self.value(value).map(drop),
            _ => Ok(()),
        }
    }

    pub fn evaluate(&self, event: &Event) -> Result<bool, ConditionError> {
        self.check_scope(event.category())?;

        use Condition::*;
        let matched = match self {
            FileExists(path) => resolve(event, path).is_file(),
            FileNotExists(path) => !resolve(event, path).is_file(),
            DirExists(path) => resolve(event, path).is_dir(),
            DirNotExists(path) => !resolve(event, path).is_dir(),
            FileExistsRecursive(name) => self.find_below(event, name, Path::is_file)?,
            FileNotExistsRecursive(name) => !self.find_below(event, name, Path::is_file)?,
            DirExistsRecursive(name) => self.find_below(event, name, Path::is_dir)?,
            DirNotExistsRecursive(name) => !self.find_below(event, name, Path::is_dir)?,
            CwdIs(dir) => event.cwd() == expand_path(dir),
            CwdIsNot(dir) => event.cwd() != expand_path(dir),
            CwdContains(text) => event.cwd().to_string_lossy().contains(text.as_str()),
            CwdNotContains(text) => !event.cwd().to_string_lossy().contains(text.as_str()),
            PermissionModeIs(mode) => {
                event.common().permission_mode.as_deref() == Some(mode.as_str())
            }
            RandomChance(value) => {
                let Percent(percent) = *self.value(value)?;
                fastrand::u32(0..100) < percent
            }
            TranscriptContains(needle) => match event.transcript_path() {
                Some(path) => transcript::tail_contains(&path, needle)
                    .map_err(|e| self.probe(e.to_string()))?,
                None => false,
            },

            FileExtension(ext) => event
                .tool_input_str("file_path")
                .is_some_and(|path| path.ends_with(ext.as_str())),
            CommandContains(text) => event
                .tool_input_str("command")
                .is_some_and(|command| command.contains(text.as_str())),
            CommandStartsWith(prefix) => event
                .tool_input_str("command")
                .is_some_and(|command| command.starts_with(prefix.as_str())),
            UrlStartsWith(prefix) => event
                .tool_input_str("url")
                .is_some_and(|url| url.starts_with(prefix.as_str())),
            GitTrackedFileOperation(value) => {
                let ops = self.value(value)?;
                match event.tool_input_str("command") {
                    Some(command) => self.touches_tracked_file(event, command, ops)?,
                    None => false,
                }
            }

            PromptContains(text) => event.prompt().is_some_and(|p| p.contains(text.as_str())),
            PromptStartsWith(prefix) => event
                .prompt()
                .is_some_and(|p| p.starts_with(prefix.as_str())),
            PromptEndsWith(suffix) => event
                .prompt()
                .is_some_and(|p| p.ends_with(suffix.as_str())),
            PromptRegex(value) => {
                let PromptPattern(re) = self.value(value)?;
                event.prompt().is_some_and(|p| re.is_match(p))
            }
            EveryNPrompts(value) => {
                let Interval(n) = *self.value(value)?;
                let previous = match event.transcript_path() {
                    Some(path) => transcript::count_user_prompts(&path)
                        .map_err(|e| self.probe(e.to_string()))?,
                    None => 0,
                };
                (previous + 1) % n == 0
            }

            StopHookActive(value) => {
                let expected = *self.value(value)?;
                match event.detail() {
                    EventDetail::Stop(stop) => stop.stop_hook_active == expected,
                    _ => false,
                }
            }
            SourceIs(source) => match event.detail() {
                EventDetail::SessionStart(start) => {
                    start.source.as_deref() == Some(source.as_str())
                }
                _ => false,
            },
            ReasonIs(reason) => match event.detail() {
                EventDetail::SessionEnd(end) => end.reason.as_deref() == Some(reason.as_str()),
                _ => false,
            },
        };
        tracing::trace!(kind = self.kind(), matched, "evaluated condition");
        Ok(matched)
    }

    fn check_scope(&self, category: Category) -> Result<(), ConditionError> {
        if self.supports(category) {
            Ok(())
        } else {
            Err(ConditionError::Unsupported {
                kind: self.kind(),
                category,
            })
        }
    }

    fn value<'a, T>(&self, parsed: &'a Parsed<T>) -> Result<&'a T, ConditionError> {
        match parsed {
            Parsed::Valid(value) => Ok(value),
            Parsed::Invalid { reason, .. } => Err(self.invalid(reason.as_str())),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ConditionError {
        ConditionError::InvalidValue {
            kind: self.kind(),
            reason: reason.into(),
        }
    }

    fn probe(&self, reason: impl Into<String>) -> ConditionError {
        ConditionError::Probe {
            kind: self.kind(),
            reason: reason.into(),
        }
    }

    /// Is there an entry called `name` anywhere below the event's cwd?
    fn find_below(
        &self,
        event: &Event,
        name: &str,
        keep: fn(&Path) -> bool,
    ) -> Result<bool, ConditionError> {
        let root = event.cwd();
        let pattern = format!(
            "{}/**/{}",
            glob::Pattern::escape(&root.to_string_lossy()),
            glob::Pattern::escape(name)
        );
        let paths = glob::glob(&pattern).map_err(|e| self.invalid(e.to_string()))?;
        Ok(paths.flatten().any(|path| keep(&path)))
    }

    fn touches_tracked_file(
        &self,
        event: &Event,
        command: &str,
        ops: &Operations,
    ) -> Result<bool, ConditionError> {
        let cwd = event.cwd();
        for file in operated_files(command, &ops.0) {
            if is_git_tracked(&cwd, &file).map_err(|e| self.probe(e))? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn resolve(event: &Event, path: &str) -> PathBuf {
    event.cwd().join(expand_path(path))
}

/// File operands of every simple command in `command` whose program is one
/// of `ops`. `git rm` and friends do not count: the program is `git`.
fn operated_files(command: &str, ops: &[String]) -> Vec<String> {
    let mut files = Vec::new();
    for segment in command.split(['&', '|', ';', '\n']) {
        let mut words = segment
            .split_whitespace()
            .skip_while(|word| is_env_assignment(word) || *word == "sudo");
        let Some(program) = words.next() else {
            continue;
        };
        if !ops.iter().any(|op| op == program) {
            continue;
        }
        files.extend(
            words
                .filter(|word| !word.starts_with('-'))
                .map(|word| word.trim_matches(|c| c == '"' || c == '\'').to_string())
                .filter(|word| !word.is_empty()),
        );
    }
    files
}

fn is_env_assignment(word: &str) -> bool {
    word.split_once('=').is_some_and(|(name, _)| {
        !name.is_empty() && name.chars().all(|c| c == '_' || c.is_ascii_alphanumeric())
    })
}

fn is_git_tracked(cwd: &Path, file: &str) -> Result<bool, String> {
    let status = Command::new("git")
        .arg("-C")
        .arg(cwd)
        .args(["ls-files", "--error-unmatch", "--"])
        .arg(file)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| format!("failed to run git: {e}"))?;
    Ok(status.success())
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
