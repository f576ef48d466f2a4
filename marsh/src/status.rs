// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! Exit statuses of commands, pipelines, and the shell

use nix::sys::wait::WaitStatus;
use std::fmt::Display;

/// Exit status of a command, pipeline, or the shell itself
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExitStatus(pub i32);

impl ExitStatus {
    /// Status of a successful command
    pub const SUCCESS: Self = Self(0);

    /// Default status of a failed command
    pub const FAILURE: Self = Self(1);

    /// Status of a child that failed to exec its command
    pub const EXEC_FAILURE: Self = Self(127);

    #[must_use]
    pub fn is_successful(self) -> bool {
        self.0 == 0
    }

    /// Raw value, as passed to `exit`.
    #[must_use]
    pub fn code(self) -> i32 {
        self.0
    }
}

impl Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<WaitStatus> for ExitStatus {
    /// Converts the result of `waitpid`.
    ///
    /// A normal exit keeps its code, death by signal maps to 128 plus the
    /// signal number, and anything else (stopped, continued) counts as
    /// failure.
    fn from(status: WaitStatus) -> Self {
        match status {
            WaitStatus::Exited(_, code) => Self(code),
            WaitStatus::Signaled(_, signal, _) => Self(128 + signal as i32),
            _ => Self::FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    #[test]
    fn normal_exit_keeps_its_code() {
        let status = WaitStatus::Exited(Pid::from_raw(1), 3);
        assert_eq!(ExitStatus::from(status), ExitStatus(3));
    }

    #[test]
    fn signal_death_maps_past_128() {
        let status = WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGKILL, false);
        assert_eq!(ExitStatus::from(status), ExitStatus(137));
    }

    #[test]
    fn stopped_child_counts_as_failure() {
        let status = WaitStatus::Stopped(Pid::from_raw(1), Signal::SIGTSTP);
        assert_eq!(ExitStatus::from(status), ExitStatus::FAILURE);
    }
}
