// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! Background job bookkeeping

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::thread::sleep;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Process ids of running background sequences
///
/// The main loop owns the set; it [reaps](Self::reap) after every command
/// line and [waits the set empty](Self::wait_all) before the shell exits.
#[derive(Debug, Default)]
pub struct JobSet {
    pids: Vec<Pid>,
}

impl JobSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Starts tracking a background process.
    pub fn add(&mut self, pid: Pid) {
        self.pids.push(pid);
    }

    /// Reaps every finished background job without blocking.
    ///
    /// A pid is kept only while `waitpid` reports it still running; exits,
    /// signal deaths, and wait errors all drop it from the set.
    pub fn reap(&mut self) {
        self.pids.retain(|&pid| {
            matches!(
                waitpid(pid, Some(WaitPidFlag::WNOHANG)),
                Ok(WaitStatus::StillAlive)
            )
        });
    }

    /// Polls until every background job has been reaped.
    pub fn wait_all(&mut self) {
        loop {
            self.reap();
            if self.pids.is_empty() {
                return;
            }
            sleep(POLL_INTERVAL);
        }
    }
}
