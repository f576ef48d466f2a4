// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! End-to-end tests running the real shell binary
//!
//! Each test feeds a script to the shell's standard input and examines its
//! output and exit status. Scratch files live under the target tmpdir so
//! parallel test runs cannot collide with anything else.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_marsh");
const TMPDIR: &str = env!("CARGO_TARGET_TMPDIR");

fn run_shell_in(dir: &Path, input: &str) -> Output {
    let mut child = Command::new(BIN)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start the shell");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("failed to write the script");
    child.wait_with_output().expect("failed to wait for the shell")
}

fn run_shell(input: &str) -> Output {
    run_shell_in(Path::new(TMPDIR), input)
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = Path::new(TMPDIR).join(name);
    std::fs::create_dir_all(&dir).expect("failed to create scratch dir");
    dir.canonicalize().expect("failed to canonicalize scratch dir")
}

fn stdout_of(output: &Output) -> &str {
    std::str::from_utf8(&output.stdout).expect("stdout is not UTF-8")
}

fn stderr_of(output: &Output) -> &str {
    std::str::from_utf8(&output.stderr).expect("stderr is not UTF-8")
}

#[test]
fn pipeline_transforms_output() {
    let output = run_shell("echo hi | tr h H\n");
    assert_eq!(stdout_of(&output), "Hi\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn three_stage_pipeline() {
    let output = run_shell("printf 'b\\na\\nc\\n' | sort | head -n 1\n");
    assert_eq!(stdout_of(&output), "a\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn and_or_short_circuit() {
    let output = run_shell("false && echo x || echo y\n");
    assert_eq!(stdout_of(&output), "y\n");
    assert_eq!(output.status.code(), Some(0));

    let output = run_shell("true && echo x || echo y\n");
    assert_eq!(stdout_of(&output), "x\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn skipped_pipeline_keeps_the_previous_status() {
    // `true || …` skips; the final status is still 0.
    let output = run_shell("true || false\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn shell_reports_the_last_foreground_status() {
    let output = run_shell("false\n");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cd_changes_the_shell_directory() {
    let dir = scratch_dir("cd-target");
    let output = run_shell(&format!("cd {}\npwd\n", dir.display()));
    assert_eq!(stdout_of(&output), format!("{}\n", dir.display()));
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn cd_failure_is_reported() {
    let output = run_shell("cd /nonexistent-marsh-dir\n");
    assert!(stderr_of(&output).starts_with("cd: /nonexistent-marsh-dir: "));
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn piped_cd_does_not_change_the_shell_directory() {
    let dir = scratch_dir("piped-cd");
    let output = run_shell_in(&dir, "cd / | cat\npwd\n");
    assert_eq!(stdout_of(&output), format!("{}\n", dir.display()));
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn redirection_truncates() {
    let dir = scratch_dir("redir-truncate");
    let output = run_shell_in(&dir, "echo old > f\necho a > f\ncat f\n");
    assert_eq!(stdout_of(&output), "a\n");
    assert_eq!(std::fs::read_to_string(dir.join("f")).unwrap(), "a\n");
}

#[test]
fn redirection_appends() {
    let dir = scratch_dir("redir-append");
    let output = run_shell_in(&dir, "echo one > f\necho two >> f\ncat f\n");
    assert_eq!(stdout_of(&output), "one\ntwo\n");
}

#[test]
fn redirection_applies_to_the_final_pipeline_only() {
    let dir = scratch_dir("redir-final");
    let output = run_shell_in(&dir, "echo visible && echo hidden > f\ncat f\n");
    assert_eq!(stdout_of(&output), "visible\nhidden\n");
    assert_eq!(std::fs::read_to_string(dir.join("f")).unwrap(), "hidden\n");
}

#[test]
fn exit_terminates_with_the_given_code() {
    let output = run_shell("exit 3\necho unreachable\n");
    assert_eq!(stdout_of(&output), "");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn exit_without_operand_reuses_the_previous_status() {
    let output = run_shell("false\nexit\n");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn invalid_exit_code_does_not_terminate() {
    let output = run_shell("exit 999\necho still here\n");
    assert!(stderr_of(&output).contains("exit: invalid exit code: 999"));
    assert_eq!(stdout_of(&output), "still here\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn redirected_exit_is_an_ordinary_command() {
    let dir = scratch_dir("redirected-exit");
    let output = run_shell_in(&dir, "exit 5 > f\necho after\n");
    assert_eq!(stdout_of(&output), "after\n");
    assert!(dir.join("f").exists());
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn background_line_returns_immediately_with_status_zero() {
    let output = run_shell("sleep 0.2 &\nfalse\necho done\n");
    assert_eq!(stdout_of(&output), "done\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn background_jobs_are_reaped_before_the_shell_exits() {
    let dir = scratch_dir("background-reap");
    let output = run_shell_in(&dir, "sleep 0.2 && echo late > f &\necho first\n");
    assert_eq!(stdout_of(&output), "first\n");
    // The shell only exits once the background sequence is done.
    assert_eq!(std::fs::read_to_string(dir.join("f")).unwrap(), "late\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn unknown_command_yields_127() {
    let output = run_shell("no-such-command-in-marsh-tests\n");
    assert!(stderr_of(&output).starts_with("execvp: "));
    assert_eq!(output.status.code(), Some(127));
}

#[test]
fn signal_death_maps_past_128() {
    let output = run_shell("sh -c 'kill -9 $$'\n");
    assert_eq!(output.status.code(), Some(137));
}

#[test]
fn parse_errors_skip_the_offending_line_only() {
    let output = run_shell("echo >\necho ok\n");
    assert!(stderr_of(&output).contains("syntax error"));
    assert_eq!(stdout_of(&output), "ok\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn quoted_arguments_reach_the_command_intact() {
    let output = run_shell("echo 'a  b' \"c|d\"\n");
    assert_eq!(stdout_of(&output), "a  b c|d\n");
}

#[test]
fn comments_are_ignored() {
    let output = run_shell("# just a comment\necho ran # trailing\n");
    assert_eq!(stdout_of(&output), "ran\n");
}
