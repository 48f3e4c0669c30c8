//! Rule dispatch for one event.

use crate::action::ActionExecutor;
use crate::config::HookRule;
use crate::error::{ActionFailure, DispatchError, RuleFailure};
use crate::event::Event;
use crate::merge::{Flow, MergeState};
use crate::output::HookOutput;
use crate::policy::CategoryPolicy;
use crate::result::{ActionResult, ExitOverride};

/// Outcome of one dispatch. `output` is always complete, even when `error`
/// is set.
#[derive(Clone, Debug)]
pub struct Dispatch {
    pub output: HookOutput,
    pub error: Option<DispatchError>,
    /// The final verdict is the category's blocking one.
    pub blocked: bool,
    /// Final verdict reason, for legacy mode.
    pub reason: String,
    pub exit_override: Option<ExitOverride>,
}

impl Dispatch {
    /// The category's fail-safe answer for a run that could not dispatch at
    /// all, e.g. because the config or the event did not load.
    pub fn fail_safe(policy: CategoryPolicy, error: &str) -> Self {
        let mut state = MergeState::new(policy);
        state.fail(error);
        Self {
            output: state.finish(),
            error: None,
            blocked: state.is_blocked(),
            reason: state.reason().to_string(),
            exit_override: None,
        }
    }
}

/// Does `matcher` select `subject`?
///
/// The matcher is a `|`-separated list of alternatives, each either `*`, an
/// exact name, or a glob pattern. An empty matcher selects everything, as
/// does any matcher for categories without a subject.
pub fn matcher_matches(matcher: &str, subject: Option<&str>) -> bool {
    let Some(subject) = subject else {
        return true;
    };
    if matcher.trim().is_empty() {
        return true;
    }
    matcher.split('|').map(str::trim).any(|alternative| {
        alternative == "*"
            || alternative == subject
            || glob::Pattern::new(alternative).is_ok_and(|pattern| pattern.matches(subject))
    })
}

/// Runs a category's rules, in order, against one event.
pub struct Dispatcher<'a> {
    rules: &'a [HookRule],
    executor: &'a ActionExecutor,
}

impl<'a> Dispatcher<'a> {
    pub fn new(rules: &'a [HookRule], executor: &'a ActionExecutor) -> Self {
        Self { rules, executor }
    }

    pub fn dispatch(&self, event: &Event) -> Dispatch {
        let policy = event.category().policy();
        let subject = event.subject();
        let mut state = MergeState::new(policy);
        let mut condition_errors = Vec::new();
        let mut action_errors = Vec::new();

        'rules: for (index, rule) in self.rules.iter().enumerate() {
            let rule_no = index + 1;
            if !matcher_matches(&rule.matcher, subject) {
                tracing::trace!(rule = rule_no, matcher = %rule.matcher, ?subject, "matcher skipped rule");
                continue;
            }

            let mut matched = true;
            for condition in &rule.conditions {
                match condition.evaluate(event) {
                    Ok(true) => {}
                    Ok(false) => {
                        matched = false;
                        break;
                    }
                    Err(error) => {
                        tracing::warn!(rule = rule_no, %error, "condition failed, skipping rule");
                        condition_errors.push(RuleFailure {
                            rule: rule_no,
                            error,
                        });
                        matched = false;
                        break;
                    }
                }
            }
            if !matched {
                tracing::debug!(rule = rule_no, "conditions not met");
                continue;
            }

            tracing::debug!(rule = rule_no, actions = rule.actions.len(), "rule matched");
            for (a, action) in rule.actions.iter().enumerate() {
                let result = match self.executor.execute(action, event) {
                    Ok(result) => result,
                    Err(error) => {
                        let failure = ActionFailure {
                            rule: rule_no,
                            action: a + 1,
                            error,
                        };
                        tracing::warn!(%failure, "action failed, applying fail-safe");
                        let result = ActionResult::fail_safe(&policy, failure.to_string());
                        action_errors.push(failure);
                        result
                    }
                };
                if state.apply(result) == Flow::Stop {
                    tracing::debug!(
                        rule = rule_no,
                        action = a + 1,
                        "blocking verdict reached, stopping dispatch"
                    );
                    break 'rules;
                }
            }
        }

        if !action_errors.is_empty() {
            let joined = action_errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            state.fail(&joined);
        }

        Dispatch {
            output: state.finish(),
            error: DispatchError::collect(condition_errors, action_errors),
            blocked: state.is_blocked(),
            reason: state.reason().to_string(),
            exit_override: state.exit_override().cloned(),
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
