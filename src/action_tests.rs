#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::error::RunError;
use crate::testing::ScriptedRunner;
use rstest::rstest;
use serde_json::json;

fn executor(runner: &ScriptedRunner) -> ActionExecutor {
    ActionExecutor::new(Arc::new(QueryCache::new()), Box::new(runner.clone()))
}

fn event(category: Category, raw: serde_json::Value) -> Event {
    Event::from_value(category, raw).unwrap()
}

fn output(yaml: &str) -> Action {
    serde_yaml::from_str(yaml).unwrap()
}

fn command(command: &str) -> Action {
    Action::Command(CommandAction {
        command: command.to_string(),
        ..CommandAction::default()
    })
}

#[test]
fn test_parse_actions_from_yaml() {
    let actions: Vec<Action> = serde_yaml::from_str(
        r#"
- type: command
  command: "make lint"
  use_stdin: true
  timeout: 5
- type: output
  message: "no"
  permission_decision: deny
"#,
    )
    .unwrap();
    assert_eq!(
        actions[0],
        Action::Command(CommandAction {
            command: "make lint".into(),
            use_stdin: true,
            timeout: Some(5),
        })
    );
    assert_eq!(
        actions[1],
        Action::Output(OutputAction {
            message: "no".into(),
            permission_decision: Some("deny".into()),
            ..OutputAction::default()
        })
    );
}

#[test]
fn test_unknown_action_fields_are_rejected() {
    let result: Result<Action, _> = serde_yaml::from_str("type: command\ncommand: ls\nstdin: true");
    assert!(result.is_err());
    let result: Result<Action, _> = serde_yaml::from_str("type: notify\nmessage: hi");
    assert!(result.is_err());
}

#[rstest]
#[case(Category::PreToolUse, "message: m\nbehavior: allow")]
#[case(Category::PermissionRequest, "message: m\ndecision: block")]
#[case(Category::Stop, "message: m\npermission_decision: allow")]
#[case(Category::Notification, "message: m\ndecision: block")]
#[case(Category::PreToolUse, "message: m\npermission_decision: block")]
#[case(Category::Stop, "message: m\ninterrupt: true")]
#[case(Category::Stop, "message: '  '")]
fn test_validate_rejects(#[case] category: Category, #[case] body: &str) {
    let action = output(&format!("type: output\n{body}"));
    assert!(action.validate(category).is_err());
}

#[test]
fn test_validate_rejects_empty_command() {
    assert!(command(" ").validate(Category::Stop).is_err());
    assert!(command("ls").validate(Category::Stop).is_ok());
}

#[test]
fn test_pre_tool_use_output_requires_permission_decision() {
    let runner = ScriptedRunner::new();
    let action = output("type: output\nmessage: careful");
    let err = executor(&runner)
        .execute(&action, &event(Category::PreToolUse, json!({"tool_name": "Bash"})))
        .unwrap_err();
    assert!(err.to_string().contains("permission_decision is required"), "{err}");
}

#[test]
fn test_pre_tool_use_output_interpolates_reason() {
    let runner = ScriptedRunner::new();
    let action = output(
        "type: output\nmessage: \"no writes to {.tool_input.file_path}\"\npermission_decision: deny",
    );
    let result = executor(&runner)
        .execute(
            &action,
            &event(
                Category::PreToolUse,
                json!({"tool_name": "Write", "tool_input": {"file_path": "/etc/hosts"}}),
            ),
        )
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Deny));
    assert_eq!(result.reason, "no writes to /etc/hosts");
}

#[test]
fn test_permission_request_allow_routes_message_to_system_message() {
    let runner = ScriptedRunner::new();
    let action = output("type: output\nmessage: approved\nbehavior: allow");
    let result = executor(&runner)
        .execute(&action, &event(Category::PermissionRequest, json!({})))
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Allow));
    assert_eq!(result.reason, "");
    assert_eq!(result.system_message, "approved");
}

#[test]
fn test_permission_request_deny_carries_interrupt() {
    let runner = ScriptedRunner::new();
    let action = output("type: output\nmessage: stop\nbehavior: deny\ninterrupt: true");
    let result = executor(&runner)
        .execute(&action, &event(Category::PermissionRequest, json!({})))
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Deny));
    assert_eq!(result.reason, "stop");
    assert_eq!(result.interrupt, Some(true));
}

#[test]
fn test_block_prefers_explicit_reason() {
    let runner = ScriptedRunner::new();
    let action = output("type: output\nmessage: msg\ndecision: block\nreason: why");
    let result = executor(&runner)
        .execute(&action, &event(Category::Stop, json!({})))
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Block));
    assert_eq!(result.reason, "why");
}

#[rstest]
#[case(Category::PostToolUse, "", "msg")]
#[case(Category::UserPromptSubmit, "", "msg")]
#[case(Category::SessionStart, "", "msg")]
#[case(Category::SubagentStart, "", "msg")]
#[case(Category::Stop, "msg", "")]
#[case(Category::Notification, "msg", "")]
#[case(Category::SessionEnd, "msg", "")]
#[case(Category::PreCompact, "msg", "")]
fn test_message_routing(
    #[case] category: Category,
    #[case] system_message: &str,
    #[case] additional_context: &str,
) {
    let runner = ScriptedRunner::new();
    let action = output("type: output\nmessage: msg");
    let result = executor(&runner)
        .execute(&action, &event(category, json!({})))
        .unwrap();
    assert_eq!(result.system_message, system_message);
    assert_eq!(result.additional_context, additional_context);
    assert_ne!(result.verdict, Some(Verdict::Block));
}

#[test]
fn test_output_passes_continue_and_exit_status() {
    let runner = ScriptedRunner::new();
    let action = output(
        "type: output\nmessage: bye\ncontinue: false\nstop_reason: done\nexit_status: 2",
    );
    let result = executor(&runner)
        .execute(&action, &event(Category::Stop, json!({})))
        .unwrap();
    assert_eq!(result.proceed, Some(false));
    assert_eq!(result.stop_reason, "done");
    assert_eq!(
        result.exit_override,
        Some(ExitOverride {
            code: 2,
            message: "bye".into()
        })
    );
}

#[test]
fn test_message_empty_after_interpolation() {
    let runner = ScriptedRunner::new();
    let action = output("type: output\nmessage: \"{.missing}\"");
    let err = executor(&runner)
        .execute(&action, &event(Category::Notification, json!({})))
        .unwrap_err();
    assert_eq!(err, ActionError::EmptyMessage);
}

#[test]
fn test_command_is_interpolated_and_gets_stdin() {
    let runner = ScriptedRunner::new();
    let action = Action::Command(CommandAction {
        command: "check {.tool_input.file_path}".into(),
        use_stdin: true,
        timeout: Some(7),
    });
    let ev = event(
        Category::PostToolUse,
        json!({"tool_name": "Write", "tool_input": {"file_path": "a.rs"}}),
    );
    executor(&runner).execute(&action, &ev).unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command, "check a.rs");
    assert_eq!(calls[0].timeout, Some(Duration::from_secs(7)));
    let stdin: serde_json::Value = serde_json::from_str(calls[0].stdin.as_deref().unwrap()).unwrap();
    assert_eq!(&stdin, ev.raw());
}

#[test]
fn test_default_timeout_applies_when_action_has_none() {
    let runner = ScriptedRunner::new();
    let exec = executor(&runner).with_default_timeout(Some(Duration::from_secs(30)));
    exec.execute(&command("ls"), &event(Category::Stop, json!({})))
        .unwrap();
    assert_eq!(runner.calls()[0].timeout, Some(Duration::from_secs(30)));
    assert_eq!(runner.calls()[0].stdin, None);
}

#[test]
fn test_empty_stdout_is_no_opinion() {
    let runner = ScriptedRunner::new().prints("  \n");
    let result = executor(&runner)
        .execute(&command("true"), &event(Category::PreToolUse, json!({})))
        .unwrap();
    assert_eq!(result, ActionResult::default());
}

#[test]
fn test_command_output_is_parsed() {
    let runner = ScriptedRunner::new()
        .prints(r#"{"continue":true,"decision":"block","reason":"tests running"}"#);
    let result = executor(&runner)
        .execute(&command("run-tests"), &event(Category::Stop, json!({})))
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Block));
    assert_eq!(result.reason, "tests running");
}

#[test]
fn test_non_zero_exit_is_an_error() {
    let runner = ScriptedRunner::new().exits(1, "lint failed\n");
    let err = executor(&runner)
        .execute(&command("lint"), &event(Category::Stop, json!({})))
        .unwrap_err();
    assert_eq!(err.to_string(), "command failed with exit code 1: lint failed");
}

#[test]
fn test_runner_failure_is_an_error() {
    let runner = ScriptedRunner::new().fails(RunError::Timeout(Duration::from_secs(3)));
    let err = executor(&runner)
        .execute(&command("slow"), &event(Category::Stop, json!({})))
        .unwrap_err();
    assert_eq!(err, ActionError::Run(RunError::Timeout(Duration::from_secs(3))));
    assert_eq!(err.to_string(), "command timed out after 3s");
}

#[test]
fn test_empty_command_after_interpolation() {
    let runner = ScriptedRunner::new();
    let err = executor(&runner)
        .execute(&command("{.nothing}"), &event(Category::Stop, json!({})))
        .unwrap_err();
    assert_eq!(err, ActionError::EmptyCommand);
    assert!(runner.calls().is_empty());
}
