// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! marsh is a small shell: pipelines, `&&`/`||` sequencing, `>`/`>>`
//! output redirection, background `&`, and the `cd` and `exit` built-ins.
//!
//! The shell reads commands from its standard input (no prompt) until end
//! of input or an `exit` command, and its own exit status is that of the
//! last foreground pipeline. See [`run`] for the read-eval loop; the
//! individual stages live in [`parser`] (bytes to [`syntax`] trees),
//! [`plan`] (trees to pipeline sequences), and [`exec`] (sequences to
//! child processes).

pub mod builtin;
pub mod exec;
pub mod job;
pub mod parser;
pub mod plan;
pub mod status;
pub mod syntax;

use self::job::JobSet;
use self::parser::Parser;
use self::status::ExitStatus;
use nix::errno::Errno;
use nix::unistd;

/// Runs the read-eval loop over standard input.
///
/// Input is read in 1 KiB chunks and fed to the [`Parser`]; every complete
/// line is dispatched as it becomes available. Parse errors are printed
/// and the offending line is skipped. Finished background jobs are reaped
/// after every line, and the shell waits for the remaining ones before
/// returning.
pub fn run() -> ExitStatus {
    let mut parser = Parser::new();
    let mut jobs = JobSet::new();
    let mut last_status = ExitStatus::SUCCESS;
    let mut buffer = [0; 1024];

    loop {
        let count = match unistd::read(0, &mut buffer) {
            Ok(0) => break,
            Ok(count) => count,
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                eprintln!("marsh: read: {}", errno.desc());
                break;
            }
        };
        parser.feed(&buffer[..count]);

        loop {
            match parser.pop_next() {
                Ok(Some(line)) => {
                    let result = exec::run_command_line(&line, last_status, &mut jobs);
                    last_status = result.status;
                    jobs.reap();
                    if result.should_exit {
                        jobs.wait_all();
                        return last_status;
                    }
                }
                Ok(None) => break,
                Err(error) => eprintln!("marsh: {error}"),
            }
        }
        jobs.reap();
    }

    jobs.wait_all();
    last_status
}
