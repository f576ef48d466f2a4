// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! `marsh-executor` runs concurrent tasks on a single thread.
//!
//! An [`Executor`] owns a FIFO run queue of tasks. Spawning a task does not
//! poll it; tasks run when the caller drives the executor with
//! [`step`](Executor::step) or [`run_until_stalled`](Executor::run_until_stalled).
//! A task that returns `Poll::Pending` leaves the queue and is retained only
//! by the wakers it has handed out; invoking such a waker puts the task back
//! at the tail of the queue.
//!
//! The crate is free of locks and atomics. The price is that spawning is
//! `unsafe`: the wakers given to tasks are reference-counted without any
//! synchronization, so they must never be moved to or invoked from another
//! thread, even though the `Waker` type itself claims to be `Send` and
//! `Sync`.
//!
//! ```
//! # use marsh_executor::Executor;
//! # use marsh_executor::handle::TryTakeError;
//! let executor = Executor::new();
//!
//! // SAFETY: this test has a single thread.
//! let handle = unsafe { executor.spawn(async { 21 * 2 }) };
//! assert_eq!(handle.try_take(), Err(TryTakeError::NotReady));
//!
//! executor.run_until_stalled();
//! assert_eq!(handle.try_take(), Ok(42));
//! ```
//!
//! [`Spawner`] is a weak handle to an executor that lets tasks spawn further
//! tasks without keeping the executor alive. [`yield_now`] lets a task give
//! every currently runnable task a turn before it resumes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

pub mod handle;

mod spawner;
mod task;

pub use handle::JoinHandle;
pub use spawner::SpawnError;

use handle::completion_pair;
use task::Task;

/// Interface for running concurrent tasks on the current thread
///
/// `Executor` implements `Clone`; all clones share one run queue. Separately
/// created executors are fully independent.
#[derive(Clone, Debug, Default)]
pub struct Executor<'a> {
    core: Rc<RefCell<Core<'a>>>,
}

/// Shared state behind an [`Executor`] and its [`Spawner`]s
///
/// Only woken tasks live here. A pending task is retained by its outstanding
/// wakers alone, so a task nobody can wake any more is freed together with
/// the last waker instead of leaking in the queue.
#[derive(Default)]
struct Core<'a> {
    run_queue: VecDeque<Rc<Task<'a>>>,
}

impl Debug for Core<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("run_queue", &format_args!("(len = {})", self.run_queue.len()))
            .finish()
    }
}

/// Weak handle for spawning tasks onto an existing executor
///
/// A `Spawner` does not keep its executor alive. Once the executor is
/// dropped, [`spawn`](Self::spawn) fails with [`SpawnError`].
#[derive(Clone, Debug, Default)]
pub struct Spawner<'a> {
    core: Weak<RefCell<Core<'a>>>,
}

impl<'a> Executor<'a> {
    /// Creates an executor with an empty run queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tasks that have been woken but not yet polled.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.core.borrow().run_queue.len()
    }

    /// Adds a pinned task to the run queue without result forwarding.
    ///
    /// The task is not polled until the executor is driven.
    ///
    /// # Safety
    ///
    /// The wakers created for this task are not thread-safe despite the
    /// `Waker` type being `Send` and `Sync`. The caller must guarantee that
    /// no waker reachable from `future` is ever cloned, invoked, or dropped
    /// on another thread.
    pub unsafe fn spawn_boxed(&self, future: Pin<Box<dyn Future<Output = ()> + 'a>>) {
        Core::enqueue(&self.core, future);
    }

    /// Adds a task to the run queue and returns a handle to its result.
    ///
    /// The task is not polled until the executor is driven. The handle
    /// observes the task's output once it completes; dropping the handle
    /// does not cancel the task.
    ///
    /// # Safety
    ///
    /// See [`spawn_boxed`](Self::spawn_boxed).
    pub unsafe fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: IntoFuture<Output = T> + 'a,
        T: 'a,
    {
        let (completion, handle) = completion_pair();
        let future = future.into_future();
        Core::enqueue(
            &self.core,
            Box::pin(async move { completion.complete(future.await) }),
        );
        handle
    }

    /// Returns a weak handle that can spawn tasks onto this executor.
    #[must_use]
    pub fn spawner(&self) -> Spawner<'a> {
        Spawner {
            core: Rc::downgrade(&self.core),
        }
    }

    /// Polls one woken task.
    ///
    /// Removes the task at the head of the run queue and polls it once.
    /// Returns:
    ///
    /// - `Some(true)` if the task completed,
    /// - `Some(false)` if the task is still pending,
    /// - `None` if no task was runnable.
    ///
    /// Panics if the task polls itself recursively.
    pub fn step(&self) -> Option<bool> {
        let task = self.core.borrow_mut().run_queue.pop_front()?;
        Some(task.poll())
    }

    /// Repeatedly [`step`](Self::step)s until no task is runnable.
    ///
    /// Returns the number of tasks that completed.
    pub fn run_until_stalled(&self) -> usize {
        let mut completed = 0;
        while let Some(finished) = self.step() {
            if finished {
                completed += 1;
            }
        }
        completed
    }
}

impl<'a> Core<'a> {
    fn enqueue(core: &Rc<RefCell<Self>>, future: Pin<Box<dyn Future<Output = ()> + 'a>>) {
        let task = Rc::new(Task::new(Rc::downgrade(core), future));
        core.borrow_mut().run_queue.push_back(task);
    }
}

/// Returns a future that suspends the calling task exactly once.
///
/// The task re-enters the run queue immediately, behind every task that is
/// currently runnable, so awaiting this future gives all of them a turn.
#[must_use = "yield_now does nothing unless awaited"]
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`]
#[derive(Debug)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
