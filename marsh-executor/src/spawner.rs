// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! Spawning tasks from inside other tasks

use crate::handle::completion_pair;
use crate::{Core, JoinHandle, Spawner};
use std::fmt::Display;
use std::future::{Future, IntoFuture};
use std::pin::Pin;

/// Error returned when the executor behind a [`Spawner`] is gone
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SpawnError;

impl Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        "executor has been dropped".fmt(f)
    }
}

impl std::error::Error for SpawnError {}

impl<'a> Spawner<'a> {
    /// Creates a spawner that is not connected to any executor.
    ///
    /// All spawns through the returned spawner fail. Equivalent to
    /// `Spawner::default()`.
    #[must_use]
    pub fn dead() -> Self {
        Self::default()
    }

    /// Adds a pinned task to the executor's run queue.
    ///
    /// Returns the future back to the caller if the executor has been
    /// dropped.
    ///
    /// # Safety
    ///
    /// See [`Executor::spawn_boxed`](crate::Executor::spawn_boxed).
    pub unsafe fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + 'a>>,
    ) -> Result<(), Pin<Box<dyn Future<Output = ()> + 'a>>> {
        match self.core.upgrade() {
            Some(core) => {
                Core::enqueue(&core, future);
                Ok(())
            }
            None => Err(future),
        }
    }

    /// Adds a task to the executor's run queue and returns a result handle.
    ///
    /// # Safety
    ///
    /// See [`Executor::spawn_boxed`](crate::Executor::spawn_boxed).
    pub unsafe fn spawn<F, T>(&self, future: F) -> Result<JoinHandle<T>, SpawnError>
    where
        F: IntoFuture<Output = T> + 'a,
        T: 'a,
    {
        let core = self.core.upgrade().ok_or(SpawnError)?;
        let (completion, handle) = completion_pair();
        let future = future.into_future();
        Core::enqueue(
            &core,
            Box::pin(async move { completion.complete(future.await) }),
        );
        Ok(handle)
    }
}
