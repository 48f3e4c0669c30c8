//! Test doubles shared by the unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::RunError;
use crate::runner::{CommandOutput, CommandRunner};

/// One recorded `run` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub command: String,
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
}

/// Replays canned outcomes in order and records every call. Running out of
/// outcomes yields an empty successful output.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    outcomes: Arc<Mutex<VecDeque<Result<CommandOutput, RunError>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command that exits 0 printing `stdout`.
    pub fn prints(self, stdout: &str) -> Self {
        self.push(Ok(CommandOutput {
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }))
    }

    /// Queue a command that exits with `code` and `stderr`.
    pub fn exits(self, code: i32, stderr: &str) -> Self {
        self.push(Ok(CommandOutput {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }))
    }

    pub fn fails(self, error: RunError) -> Self {
        self.push(Err(error))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.command).collect()
    }

    fn push(self, outcome: Result<CommandOutput, RunError>) -> Self {
        self.outcomes.lock().push_back(outcome);
        self
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        command: &str,
        stdin: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, RunError> {
        self.calls.lock().push(Call {
            command: command.to_string(),
            stdin: stdin.map(str::to_string),
            timeout,
        });
        self.outcomes.lock().pop_front().unwrap_or_else(|| {
            Ok(CommandOutput {
                status: Some(0),
                ..CommandOutput::default()
            })
        })
    }
}
