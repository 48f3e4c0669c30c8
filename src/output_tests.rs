#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::event::Category;
use rstest::rstest;
use serde_json::json;

fn parse(category: Category, stdout: &str) -> Result<ActionResult, ActionError> {
    CommandResponse::parse(stdout, &category.policy())
}

fn reason_of(err: ActionError) -> String {
    match err {
        ActionError::InvalidOutput { reason, .. } => reason,
        other => panic!("expected InvalidOutput, got {other:?}"),
    }
}

#[test]
fn test_default_output_serializes_continue_only() {
    let text = serde_json::to_string(&HookOutput::default()).unwrap();
    assert_eq!(text, r#"{"continue":true}"#);
}

#[test]
fn test_output_uses_host_field_names() {
    let output = HookOutput {
        stop_reason: Some("s".into()),
        suppress_output: Some(true),
        hook_specific_output: Some(HookSpecificOutput {
            hook_event_name: "PostToolUse".into(),
            updated_mcp_tool_output: Some(json!({"ok": true})),
            ..HookSpecificOutput::default()
        }),
        ..HookOutput::default()
    };
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(
        value,
        json!({
            "continue": true,
            "stopReason": "s",
            "suppressOutput": true,
            "hookSpecificOutput": {
                "hookEventName": "PostToolUse",
                "updatedMCPToolOutput": {"ok": true}
            }
        })
    );
}

#[test]
fn test_stop_block_with_reason() {
    let result = parse(
        Category::Stop,
        r#"{"continue":true,"decision":"block","reason":"tests running"}"#,
    )
    .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Block));
    assert_eq!(result.reason, "tests running");
    assert_eq!(result.proceed, Some(true));
}

#[test]
fn test_block_without_reason_is_invalid() {
    let err = parse(Category::Stop, r#"{"decision":"block"}"#).unwrap_err();
    assert!(reason_of(err).contains("reason is required"));
}

#[test]
fn test_decision_category_without_decision_allows() {
    let result = parse(Category::SubagentStop, r#"{"systemMessage":"fyi"}"#).unwrap();
    assert_eq!(result.verdict, Some(Verdict::Allow));
    assert_eq!(result.system_message, "fyi");
}

#[test]
fn test_pre_tool_use_full_response() {
    let result = parse(
        Category::PreToolUse,
        r#"{"hookSpecificOutput":{
            "hookEventName":"PreToolUse",
            "permissionDecision":"allow",
            "permissionDecisionReason":"safe",
            "updatedInput":{"command":"ls"},
            "additionalContext":"ctx"
        }}"#,
    )
    .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Allow));
    assert_eq!(result.reason, "safe");
    assert_eq!(result.updated_input, Some(json!({"command": "ls"})));
    assert_eq!(result.additional_context, "ctx");
    assert_eq!(result.hook_event_name.as_deref(), Some("PreToolUse"));
}

#[test]
fn test_permission_request_deny() {
    let result = parse(
        Category::PermissionRequest,
        r#"{"hookSpecificOutput":{"hookEventName":"PermissionRequest",
            "decision":{"behavior":"deny","message":"no","interrupt":true}}}"#,
    )
    .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Deny));
    assert_eq!(result.reason, "no");
    assert_eq!(result.interrupt, Some(true));
}

#[test]
fn test_post_tool_use_updated_output() {
    let result = parse(
        Category::PostToolUse,
        r#"{"hookSpecificOutput":{"hookEventName":"PostToolUse",
            "additionalContext":"lint ok","updatedMCPToolOutput":[1]}}"#,
    )
    .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Allow));
    assert_eq!(result.additional_context, "lint ok");
    assert_eq!(result.updated_output, Some(json!([1])));
}

#[test]
fn test_session_start_context() {
    let result = parse(
        Category::SessionStart,
        r#"{"hookSpecificOutput":{"hookEventName":"SessionStart","additionalContext":"hello"}}"#,
    )
    .unwrap();
    assert_eq!(result.verdict, None);
    assert_eq!(result.additional_context, "hello");
}

#[rstest]
#[case(Category::PreToolUse, "not json", "not valid JSON")]
#[case(Category::PreToolUse, r#"{"continue":true}"#, "hookSpecificOutput is required")]
#[case(
    Category::PreToolUse,
    r#"{"hookSpecificOutput":{"hookEventName":"PreToolUse"}}"#,
    "permissionDecision is required"
)]
#[case(
    Category::PreToolUse,
    r#"{"hookSpecificOutput":{"permissionDecision":"allow"}}"#,
    "hookEventName is required"
)]
#[case(
    Category::PreToolUse,
    r#"{"hookSpecificOutput":{"hookEventName":"PostToolUse","permissionDecision":"allow"}}"#,
    "expected 'PreToolUse'"
)]
#[case(
    Category::PreToolUse,
    r#"{"hookSpecificOutput":{"hookEventName":"PreToolUse","permissionDecision":"maybe"}}"#,
    "invalid permissionDecision"
)]
#[case(
    Category::PreToolUse,
    r#"{"hookSpecificOutput":{"hookEventName":"PreToolUse","permissionDecision":"deny","updatedInput":{}}}"#,
    "cannot accompany a deny"
)]
#[case(
    Category::PreToolUse,
    r#"{"decision":"block","reason":"x"}"#,
    "top-level decision/reason"
)]
#[case(
    Category::PermissionRequest,
    r#"{"hookSpecificOutput":{"hookEventName":"PermissionRequest"}}"#,
    "decision is required"
)]
#[case(
    Category::PermissionRequest,
    r#"{"hookSpecificOutput":{"hookEventName":"PermissionRequest","decision":{"behavior":"allow","message":"m"}}}"#,
    "message is only valid"
)]
#[case(
    Category::PermissionRequest,
    r#"{"hookSpecificOutput":{"hookEventName":"PermissionRequest","decision":{"behavior":"allow","interrupt":false}}}"#,
    "interrupt is only valid"
)]
#[case(
    Category::PermissionRequest,
    r#"{"hookSpecificOutput":{"hookEventName":"PermissionRequest","decision":{"behavior":"deny","updatedInput":{}}}}"#,
    "cannot accompany a deny"
)]
#[case(
    Category::PostToolUse,
    r#"{"decision":"block","reason":"r","hookSpecificOutput":{"hookEventName":"PostToolUse","updatedMCPToolOutput":1}}"#,
    "cannot accompany a block"
)]
#[case(
    Category::PostToolUse,
    r#"{"hookSpecificOutput":{"hookEventName":"PostToolUse","permissionDecision":"allow"}}"#,
    "permissionDecision is not accepted"
)]
#[case(Category::Stop, r#"{"decision":"approve","reason":"r"}"#, "invalid decision")]
#[case(
    Category::Stop,
    r#"{"hookSpecificOutput":{"hookEventName":"Stop"}}"#,
    "hookSpecificOutput is not accepted"
)]
#[case(
    Category::Notification,
    r#"{"decision":"block","reason":"r"}"#,
    "top-level decision/reason"
)]
#[case(
    Category::UserPromptSubmit,
    r#"{"hookSpecificOutput":{"hookEventName":"UserPromptSubmit","updatedInput":{}}}"#,
    "updatedInput is not accepted"
)]
fn test_invalid_responses(
    #[case] category: Category,
    #[case] stdout: &str,
    #[case] expected: &str,
) {
    let reason = reason_of(parse(category, stdout).unwrap_err());
    assert!(reason.contains(expected), "{reason}");
}

#[test]
fn test_updated_input_must_be_an_object() {
    let err = parse(
        Category::PreToolUse,
        r#"{"hookSpecificOutput":{"hookEventName":"PreToolUse","permissionDecision":"allow","updatedInput":"ls"}}"#,
    )
    .unwrap_err();
    assert!(reason_of(err).contains("must be a JSON object"));
}
