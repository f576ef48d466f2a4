// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! Pipeline and sequence execution
//!
//! A [`Plan`] runs as a left-to-right sequence of pipelines, each pipeline
//! as a row of child processes connected by pipes. The parent closes every
//! descriptor as soon as the child that needs it has been spawned, and a
//! child closes all inherited pipe ends before exec. Foreground pipelines
//! are waited for in spawn order; the last child's status becomes the
//! pipeline's status.

use crate::builtin;
use crate::job::JobSet;
use crate::plan::{self, Connector, Plan};
use crate::status::ExitStatus;
use crate::syntax::{Command, CommandLine, Output};
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::waitpid;
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::path::Path;

const STDIN: RawFd = 0;
const STDOUT: RawFd = 1;

/// Outcome of a pipeline, sequence, or command line
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExecResult {
    pub status: ExitStatus,
    /// The shell must terminate with `status`.
    pub should_exit: bool,
}

impl ExecResult {
    fn with_status(status: ExitStatus) -> Self {
        Self {
            status,
            should_exit: false,
        }
    }
}

/// Runs one parsed command line, in the foreground or background.
///
/// A background line is forked once more: the child runs the whole
/// sequence (with `exit` demoted to a child-level command) and exits with
/// its final status, while the parent records the pid in `jobs` and
/// reports status 0 for the line itself.
pub fn run_command_line(
    line: &CommandLine,
    last_status: ExitStatus,
    jobs: &mut JobSet,
) -> ExecResult {
    let plan = plan::split(&line.exprs);
    if !line.is_background {
        return run_sequence(&plan, line, true, last_status);
    }

    // SAFETY: the shell is single-threaded, so no lock can be held by
    // another thread across this fork.
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Child) => {
            ignore_terminal_signals();
            let result = run_sequence(&plan, line, false, last_status);
            std::process::exit(result.status.code())
        }
        Ok(ForkResult::Parent { child }) => {
            jobs.add(child);
            ExecResult::with_status(ExitStatus::SUCCESS)
        }
        Err(errno) => {
            eprintln!("fork: {}", errno.desc());
            ExecResult::with_status(ExitStatus::FAILURE)
        }
    }
}

/// Runs the pipelines of `plan` left to right.
///
/// Before every pipeline but the first, the preceding connector is
/// consulted: `&&` runs it only after success, `||` only after failure. A
/// skipped pipeline leaves the status untouched. The final pipeline of the
/// plan is the one that owns the line's output redirection, whether or not
/// short-circuiting lets it run.
pub fn run_sequence(
    plan: &Plan,
    line: &CommandLine,
    allow_exit: bool,
    last_status: ExitStatus,
) -> ExecResult {
    let mut status = last_status;
    for (index, pipeline) in plan.pipelines.iter().enumerate() {
        if index > 0 {
            let run = match plan.connectors.get(index - 1) {
                Some(Connector::AndThen) => status.is_successful(),
                Some(Connector::OrElse) => !status.is_successful(),
                // Malformed input may omit a connector; run unconditionally.
                None => true,
            };
            if !run {
                continue;
            }
        }

        let is_last = index + 1 == plan.pipelines.len();
        let result = run_pipeline(pipeline, line, is_last, allow_exit, status);
        status = result.status;
        if result.should_exit {
            return result;
        }
    }
    ExecResult::with_status(status)
}

/// Runs one pipeline and waits for it.
///
/// A single-command pipeline gets built-in treatment: `cd` runs in the
/// shell process, and `exit` terminates the shell when `allow_exit` holds
/// and no file redirection applies. Everything else, including built-in
/// names inside multi-command pipelines or under redirection, goes through
/// the child path.
pub fn run_pipeline(
    commands: &[Command],
    line: &CommandLine,
    is_last_pipeline: bool,
    allow_exit: bool,
    last_status: ExitStatus,
) -> ExecResult {
    let [command] = commands else {
        return run_child_pipeline(commands, line, is_last_pipeline, last_status);
    };

    if command.name == "exit" && allow_exit && line.output == Output::Inherit {
        return match builtin::exit_status(command, last_status) {
            Ok(status) => ExecResult {
                status,
                should_exit: true,
            },
            Err(status) => ExecResult::with_status(status),
        };
    }
    if command.name == "cd" {
        return ExecResult::with_status(run_cd_in_shell(command, line, is_last_pipeline));
    }
    run_child_pipeline(commands, line, is_last_pipeline, last_status)
}

/// Runs `cd` in the shell process.
///
/// When the pipeline is the last one and the line redirects to a file, the
/// shell's stdout is redirected for the duration of the built-in so that
/// the redirection has the same observable effect as it would on an
/// external command (the file gets created or truncated).
fn run_cd_in_shell(command: &Command, line: &CommandLine, is_last_pipeline: bool) -> ExitStatus {
    let mut saved_stdout = None;
    if is_last_pipeline {
        if let Output::File { path, append } = &line.output {
            let fd = match open_output_file(path, *append) {
                Ok(fd) => fd,
                Err(errno) => {
                    eprintln!("open: {}", errno.desc());
                    return ExitStatus::FAILURE;
                }
            };
            if let Ok(original) = unistd::dup(STDOUT) {
                saved_stdout = Some(original);
                unistd::dup2(fd, STDOUT).ok();
            }
            unistd::close(fd).ok();
        }
    }

    let status = builtin::cd(command);

    if let Some(original) = saved_stdout {
        unistd::dup2(original, STDOUT).ok();
        unistd::close(original).ok();
    }
    status
}

/// Spawns one child per command, wiring adjacent ones with pipes.
fn run_child_pipeline(
    commands: &[Command],
    line: &CommandLine,
    is_last_pipeline: bool,
    last_status: ExitStatus,
) -> ExecResult {
    let mut pids = Vec::with_capacity(commands.len());
    let mut previous_read: Option<RawFd> = None;

    for (index, command) in commands.iter().enumerate() {
        let pipe_fds = if index + 1 < commands.len() {
            match unistd::pipe() {
                Ok(fds) => Some(fds),
                Err(errno) => {
                    eprintln!("pipe: {}", errno.desc());
                    close_all(previous_read);
                    return ExecResult::with_status(ExitStatus::FAILURE);
                }
            }
        } else {
            None
        };

        // SAFETY: the shell is single-threaded, so no lock can be held by
        // another thread across this fork.
        match unsafe { unistd::fork() } {
            Ok(ForkResult::Child) => {
                run_child(command, previous_read, pipe_fds, line, is_last_pipeline, last_status)
            }
            Ok(ForkResult::Parent { child }) => {
                pids.push(child);
                close_all(previous_read.take());
                if let Some((read, write)) = pipe_fds {
                    unistd::close(write).ok();
                    previous_read = Some(read);
                }
            }
            Err(errno) => {
                eprintln!("fork: {}", errno.desc());
                if let Some((read, write)) = pipe_fds {
                    unistd::close(read).ok();
                    unistd::close(write).ok();
                }
                close_all(previous_read.take());
                return ExecResult::with_status(ExitStatus::FAILURE);
            }
        }
    }

    ExecResult::with_status(wait_for_children(&pids))
}

/// Redirects, closes inherited descriptors, and runs one command.
///
/// Never returns; the process image is replaced or the child exits.
fn run_child(
    command: &Command,
    stdin_fd: Option<RawFd>,
    pipe_fds: Option<(RawFd, RawFd)>,
    line: &CommandLine,
    is_last_pipeline: bool,
    last_status: ExitStatus,
) -> ! {
    if let Some(fd) = stdin_fd {
        unistd::dup2(fd, STDIN).ok();
    }
    if let Some((_, write)) = pipe_fds {
        unistd::dup2(write, STDOUT).ok();
    } else if is_last_pipeline {
        if let Output::File { path, append } = &line.output {
            match open_output_file(path, *append) {
                Ok(fd) => {
                    unistd::dup2(fd, STDOUT).ok();
                    unistd::close(fd).ok();
                }
                Err(errno) => {
                    eprintln!("open: {}", errno.desc());
                    std::process::exit(ExitStatus::FAILURE.code());
                }
            }
        }
    }
    if let Some((read, write)) = pipe_fds {
        unistd::close(read).ok();
        unistd::close(write).ok();
    }
    close_all(stdin_fd);

    match command.name.as_str() {
        // A piped cd changes only this child's directory, by design.
        "cd" => std::process::exit(builtin::cd(command).code()),
        "exit" => {
            let status = builtin::exit_status(command, last_status).unwrap_or_else(|status| status);
            std::process::exit(status.code())
        }
        _ => {}
    }

    match build_argv(command) {
        Ok(argv) => {
            if let Err(errno) = unistd::execvp(&argv[0], &argv) {
                eprintln!("execvp: {}", errno.desc());
            }
        }
        // A command name or argument with an interior NUL can never exec.
        Err(_) => eprintln!("execvp: {}", Errno::EINVAL.desc()),
    }
    std::process::exit(ExitStatus::EXEC_FAILURE.code())
}

/// Waits for every child in spawn order; the last one decides the status.
fn wait_for_children(pids: &[Pid]) -> ExitStatus {
    let mut last = None;
    for &pid in pids {
        last = Some(waitpid(pid, None));
    }
    match last {
        Some(Ok(wait_status)) => ExitStatus::from(wait_status),
        Some(Err(_)) | None => ExitStatus::FAILURE,
    }
}

fn open_output_file(path: &str, append: bool) -> nix::Result<RawFd> {
    let mut flags = OFlag::O_WRONLY | OFlag::O_CREAT;
    flags |= if append { OFlag::O_APPEND } else { OFlag::O_TRUNC };
    open(Path::new(path), flags, Mode::from_bits_truncate(0o666))
}

fn close_all(fd: Option<RawFd>) {
    if let Some(fd) = fd {
        unistd::close(fd).ok();
    }
}

fn build_argv(command: &Command) -> Result<Vec<CString>, std::ffi::NulError> {
    let mut argv = Vec::with_capacity(command.args.len() + 1);
    argv.push(CString::new(command.name.as_str())?);
    for arg in &command.args {
        argv.push(CString::new(arg.as_str())?);
    }
    Ok(argv)
}

/// Keeps terminal I/O signals from stopping a background sequence.
fn ignore_terminal_signals() {
    // SAFETY: SIG_IGN installs no handler code.
    unsafe {
        signal(Signal::SIGTTIN, SigHandler::SigIgn).ok();
        signal(Signal::SIGTTOU, SigHandler::SigIgn).ok();
    }
}
