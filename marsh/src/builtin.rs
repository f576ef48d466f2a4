// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! Built-in utilities
//!
//! `cd` must run in the shell process to affect the shell's working
//! directory, and `exit` must run there to terminate the shell; everything
//! else is executed in child processes. When either name appears inside a
//! multi-command pipeline it still runs in a child, where `cd` is a
//! deliberate no-op on the shell's directory (matching POSIX practice) and
//! `exit` merely produces its status.

use crate::status::ExitStatus;
use crate::syntax::Command;
use nix::unistd;
use std::path::Path;

/// Changes the working directory of the calling process.
///
/// With no operand the value of `$HOME` is used; an unset or empty `$HOME`
/// is an error. Extra operands are ignored. Failures print a message to
/// stderr and yield status 1.
pub fn cd(command: &Command) -> ExitStatus {
    let path = match command.args.first() {
        Some(operand) => operand.clone(),
        None => std::env::var("HOME").unwrap_or_default(),
    };
    if path.is_empty() {
        eprintln!("cd: HOME not set");
        return ExitStatus::FAILURE;
    }

    match unistd::chdir(Path::new(&path)) {
        Ok(()) => ExitStatus::SUCCESS,
        Err(errno) => {
            eprintln!("cd: {}: {}", path, errno.desc());
            ExitStatus::FAILURE
        }
    }
}

/// Interprets the operand of `exit`.
///
/// No operand defaults to the previous status. A valid operand is a
/// decimal integer in `0..=255`; anything else prints a message and yields
/// `Err` with status 1, meaning the shell must **not** terminate.
pub fn exit_status(command: &Command, last_status: ExitStatus) -> Result<ExitStatus, ExitStatus> {
    let Some(operand) = command.args.first() else {
        return Ok(last_status);
    };
    match parse_exit_code(operand) {
        Some(code) => Ok(ExitStatus(code)),
        None => {
            eprintln!("exit: invalid exit code: {operand}");
            Err(ExitStatus::FAILURE)
        }
    }
}

fn parse_exit_code(operand: &str) -> Option<i32> {
    operand.parse().ok().filter(|code| (0..=255).contains(code))
}
