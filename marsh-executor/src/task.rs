// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! Task state and the waker that re-enqueues it
//!
//! A waker is a `Rc<Task>` in disguise: the `RawWaker` data pointer is a raw
//! `Rc`, and the vtable functions adjust the strong count and call
//! [`Task::wake`]. The vtable never synchronizes, which is why spawning is
//! unsafe at the crate boundary.

use crate::Core;
use std::cell::RefCell;
use std::future::Future;
use std::mem::ManuallyDrop;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, RawWaker, RawWakerVTable, Waker};

/// A spawned future together with the queue it runs on
pub(crate) struct Task<'a> {
    /// Run queue this task re-enters when woken
    core: Weak<RefCell<Core<'a>>>,

    /// The future driven by this task, `None` once it has completed
    future: RefCell<Option<Pin<Box<dyn Future<Output = ()> + 'a>>>>,
}

impl<'a> Task<'a> {
    pub(crate) fn new(
        core: Weak<RefCell<Core<'a>>>,
        future: Pin<Box<dyn Future<Output = ()> + 'a>>,
    ) -> Self {
        Self {
            core,
            future: RefCell::new(Some(future)),
        }
    }

    /// Puts the task back on its run queue.
    ///
    /// Does nothing if the executor has been dropped or the future has
    /// already completed. A task may wake itself from inside `poll` (the
    /// future slot is borrowed then), so a borrowed slot counts as not yet
    /// completed.
    pub(crate) fn wake(self: &Rc<Self>) {
        let Some(core) = self.core.upgrade() else {
            return;
        };
        let completed = self.future.try_borrow().is_ok_and(|slot| slot.is_none());
        if !completed {
            core.borrow_mut().run_queue.push_back(Rc::clone(self));
        }
    }

    /// Polls the contained future once.
    ///
    /// Returns `true` if the future completed, now or previously. Panics if
    /// called from within the future's own `poll` (recursive polling).
    pub(crate) fn poll(self: &Rc<Self>) -> bool {
        let mut slot = self
            .future
            .try_borrow_mut()
            .expect("task polled recursively");
        let Some(future) = slot.as_mut() else {
            // Woken again after completion; nothing left to do.
            return true;
        };
        let waker = waker_for(Rc::clone(self));
        let mut context = Context::from_waker(&waker);
        let finished = future.as_mut().poll(&mut context).is_ready();
        if finished {
            *slot = None;
        }
        finished
    }
}

unsafe fn clone(data: *const ()) -> RawWaker {
    Rc::<Task>::increment_strong_count(data.cast());
    RawWaker::new(data, VTABLE)
}

unsafe fn wake(data: *const ()) {
    Rc::<Task>::from_raw(data.cast()).wake();
}

unsafe fn wake_by_ref(data: *const ()) {
    let task = ManuallyDrop::new(Rc::<Task>::from_raw(data.cast()));
    task.wake();
}

unsafe fn drop(data: *const ()) {
    Rc::<Task>::decrement_strong_count(data.cast());
}

const VTABLE: &RawWakerVTable = &RawWakerVTable::new(clone, wake, wake_by_ref, drop);

/// Wraps a task in a `Waker` that re-enqueues it when invoked.
#[must_use]
fn waker_for(task: Rc<Task>) -> Waker {
    let data = Rc::into_raw(task).cast();
    // SAFETY: the vtable functions above keep the strong count balanced.
    // Thread confinement is the spawner's obligation.
    unsafe { Waker::from_raw(RawWaker::new(data, VTABLE)) }
}
