#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;

fn runner() -> ShellRunner {
    ShellRunner::new(ShellRunner::DEFAULT_SHELL).unwrap()
}

#[test]
fn test_captures_stdout_and_status() {
    let output = runner().run("echo hello", None, None).unwrap();
    assert!(output.success());
    assert_eq!(output.stdout, "hello\n");
    assert_eq!(output.stderr, "");
}

#[test]
fn test_non_zero_exit_is_not_a_run_error() {
    let output = runner().run("echo oops >&2; exit 3", None, None).unwrap();
    assert_eq!(output.status, Some(3));
    assert!(!output.success());
    assert_eq!(output.stderr.trim(), "oops");
}

#[test]
fn test_feeds_stdin() {
    let output = runner()
        .run("cat", Some(r#"{"hook_event_name":"Stop"}"#), None)
        .unwrap();
    assert_eq!(output.stdout, r#"{"hook_event_name":"Stop"}"#);
}

#[test]
fn test_stdin_ignored_by_command() {
    let output = runner().run("true", Some("unread input"), None).unwrap();
    assert!(output.success());
}

#[test]
fn test_no_stdin_means_empty_input() {
    let output = runner().run("cat", None, None).unwrap();
    assert_eq!(output.stdout, "");
}

#[test]
fn test_timeout() {
    let err = runner()
        .run("sleep 5", None, Some(Duration::from_millis(200)))
        .unwrap_err();
    assert_eq!(err, RunError::Timeout(Duration::from_millis(200)));
}

#[test]
fn test_finishes_within_timeout() {
    let output = runner()
        .run("echo quick", None, Some(Duration::from_secs(10)))
        .unwrap();
    assert_eq!(output.stdout.trim(), "quick");
}

#[test]
fn test_missing_shell_is_a_spawn_error() {
    let runner = ShellRunner::new("/nonexistent/shell").unwrap();
    let err = runner.run("echo hi", None, None).unwrap_err();
    assert!(matches!(err, RunError::Spawn(_)), "{err:?}");
}

#[test]
fn test_timeout_covers_unread_stdin() {
    // Larger than any pipe buffer, and never read
    let input = "x".repeat(1 << 20);
    let started = std::time::Instant::now();
    let err = runner()
        .run("sleep 3", Some(&input), Some(Duration::from_millis(500)))
        .unwrap_err();
    assert_eq!(err, RunError::Timeout(Duration::from_millis(500)));
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
}

#[test]
fn test_large_stdin_and_stdout_do_not_deadlock() {
    let input = "y".repeat(1 << 20);
    let output = runner()
        .run("cat", Some(&input), Some(Duration::from_secs(10)))
        .unwrap();
    assert!(output.success());
    assert_eq!(output.stdout.len(), input.len());
}
