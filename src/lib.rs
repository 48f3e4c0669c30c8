//! Claude Code hook rule engine.
//!
//! One process run handles one hook event: the event is read from stdin,
//! matched against the YAML rules configured for its category, the matching
//! rules' actions run in order, and their results fold into a single
//! category-shaped verdict on stdout. Failures never produce an empty or
//! permissive answer where the category can block; they produce its
//! fail-safe verdict instead.

pub mod action;
pub mod cli;
pub mod condition;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod merge;
pub mod output;
pub mod policy;
pub mod query;
pub mod result;
pub mod runner;
pub mod template;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use action::{Action, ActionExecutor, CommandAction, OutputAction};
pub use condition::Condition;
pub use config::{Config, HookRule, Settings};
pub use dispatch::{matcher_matches, Dispatch, Dispatcher};
pub use error::{ActionError, ConditionError, ConfigError, DispatchError, EventError, QueryError};
pub use event::{Category, Event};
pub use merge::{Flow, MergeState};
pub use output::HookOutput;
pub use policy::{CategoryPolicy, Verdict};
pub use query::QueryCache;
pub use result::ActionResult;
pub use runner::{CommandOutput, CommandRunner, ShellRunner};
