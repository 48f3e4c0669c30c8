//! Command line interface.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::Config;
use crate::event::Category;
use crate::transcript::expand_path;

#[derive(Parser, Debug)]
#[command(name = "cc-hook-rules", version, about = "Claude Code hook rule engine")]
pub struct Cli {
    /// Hook event category (defaults to the input's hook_event_name)
    #[arg(short, long, env = "CC_HOOK_RULES_EVENT", value_parser = parse_category)]
    pub event: Option<Category>,

    /// Rules file [default: $XDG_CONFIG_HOME/cc-hook-rules/config.yaml]
    #[arg(short, long, env = "CC_HOOK_RULES_CONFIG")]
    pub config: Option<String>,

    /// Validate the rules file and exit
    #[arg(long)]
    pub check: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The config path to use and whether it was asked for explicitly.
    pub fn config_path(&self) -> Option<(PathBuf, bool)> {
        match self.config.as_deref() {
            Some(path) => Some((expand_path(path), true)),
            None => Config::default_path().map(|path| (path, false)),
        }
    }

    /// Default tracing filter directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn parse_category(raw: &str) -> Result<Category, String> {
    raw.parse().map_err(|e: crate::error::EventError| e.to_string())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
