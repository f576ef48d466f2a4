// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! Observing the result of a spawned task
//!
//! [`Executor::spawn`](crate::Executor::spawn) wraps the spawned future so
//! that its output lands in a slot shared with the returned [`JoinHandle`].
//! The handle can poll for the result asynchronously (it implements
//! `Future`) or inspect it synchronously with
//! [`try_take`](JoinHandle::try_take).
//!
//! The task side holds only a weak reference to the slot: dropping the
//! handle never blocks or cancels the task, the unobserved result is simply
//! discarded.

use std::cell::RefCell;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

/// Result slot shared between a task and its handle
#[derive(Debug, Default)]
enum Outcome<T> {
    /// The task has not completed and the handle has not been polled.
    #[default]
    Pending,
    /// The task has not completed; the handle is waiting to be woken.
    Awaited(Waker),
    /// The task completed with this value.
    Ready(T),
    /// The task was dropped before completing.
    Detached,
    /// The value has been taken out of the slot.
    Taken,
}

/// Handle to the result of a spawned task
///
/// See the [module-level documentation](self).
#[derive(Debug)]
pub struct JoinHandle<T> {
    outcome: Rc<RefCell<Outcome<T>>>,
}

/// Task-side half that fills the slot
#[derive(Debug)]
pub(crate) struct Completion<T> {
    outcome: Weak<RefCell<Outcome<T>>>,
}

/// Creates a connected completion/handle pair.
pub(crate) fn completion_pair<T>() -> (Completion<T>, JoinHandle<T>) {
    let outcome = Rc::new(RefCell::new(Outcome::Pending));
    let completion = Completion {
        outcome: Rc::downgrade(&outcome),
    };
    (completion, JoinHandle { outcome })
}

impl<T> Completion<T> {
    /// Stores the task's output and wakes the handle if it is waiting.
    ///
    /// The value is dropped if the handle no longer exists.
    pub(crate) fn complete(mut self, value: T) {
        // Emptying the weak reference keeps the Drop impl from marking the
        // slot detached afterwards.
        let Some(outcome) = std::mem::take(&mut self.outcome).upgrade() else {
            return;
        };
        let slot = &mut *outcome.borrow_mut();
        match std::mem::replace(slot, Outcome::Ready(value)) {
            Outcome::Pending => {}
            Outcome::Awaited(waker) => waker.wake(),
            Outcome::Ready(_) | Outcome::Detached | Outcome::Taken => {
                unreachable!("task completed twice")
            }
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        let Some(outcome) = self.outcome.upgrade() else {
            return;
        };
        let slot = &mut *outcome.borrow_mut();
        match std::mem::replace(slot, Outcome::Detached) {
            Outcome::Pending => {}
            Outcome::Awaited(waker) => waker.wake(),
            previous => *slot = previous,
        }
    }
}

/// Error returned by [`JoinHandle::try_take`]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TryTakeError {
    /// The task has not completed yet.
    NotReady,
    /// The task was dropped before it could complete.
    Detached,
    /// The result has already been taken.
    AlreadyTaken,
}

impl Display for TryTakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TryTakeError::NotReady => "task has not completed yet".fmt(f),
            TryTakeError::Detached => "task was dropped before completing".fmt(f),
            TryTakeError::AlreadyTaken => "result was already taken".fmt(f),
        }
    }
}

impl std::error::Error for TryTakeError {}

impl<T> JoinHandle<T> {
    /// Takes the task's output if it is available.
    pub fn try_take(&self) -> Result<T, TryTakeError> {
        let slot = &mut *self.outcome.borrow_mut();
        match slot {
            Outcome::Pending | Outcome::Awaited(_) => Err(TryTakeError::NotReady),
            Outcome::Detached => Err(TryTakeError::Detached),
            Outcome::Taken => Err(TryTakeError::AlreadyTaken),
            Outcome::Ready(_) => {
                let Outcome::Ready(value) = std::mem::replace(slot, Outcome::Taken) else {
                    unreachable!()
                };
                Ok(value)
            }
        }
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    /// Waits for the task to complete.
    ///
    /// Panics if the task was dropped before completing or if the result was
    /// already taken out of the handle.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let slot = &mut *self.outcome.borrow_mut();
        match std::mem::replace(slot, Outcome::Taken) {
            Outcome::Ready(value) => Poll::Ready(value),
            Outcome::Pending | Outcome::Awaited(_) => {
                *slot = Outcome::Awaited(cx.waker().clone());
                Poll::Pending
            }
            Outcome::Detached => panic!("task was dropped before completing"),
            Outcome::Taken => panic!("result was already taken"),
        }
    }
}
