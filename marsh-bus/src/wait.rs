// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! FIFO queues of parked tasks
//!
//! A [`WakeQueue`] holds one entry per task currently suspended on an event
//! (channel not full, channel not empty). [`park`](WakeQueue::park) returns
//! a future that enrolls the task at the tail on its first poll and
//! completes once a waker pops it off the head. Dropping a parked future
//! before it is woken marks its entry [`Gone`](WaiterState::Gone);
//! [`wake_first`](WakeQueue::wake_first) skips such entries, so
//! cancellation is O(1) and never disturbs the ordering of live waiters.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Ordered set of tasks suspended on one event
#[derive(Debug, Default)]
pub(crate) struct WakeQueue {
    waiters: RefCell<VecDeque<Rc<Waiter>>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum WaiterState {
    /// Parked and still enqueued.
    Waiting,
    /// Popped off the queue by a waker; the future is ready.
    Woken,
    /// The future was dropped while parked; the entry is garbage.
    Gone,
}

/// One suspended task
#[derive(Debug)]
struct Waiter {
    state: Cell<WaiterState>,
    waker: RefCell<Option<Waker>>,
}

impl WakeQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Suspends the calling task until it is woken.
    ///
    /// The entry joins the queue when the returned future is first polled,
    /// not when this method is called.
    pub(crate) fn park(&self) -> Park<'_> {
        Park {
            queue: self,
            waiter: None,
        }
    }

    /// Wakes the task that has been parked the longest.
    ///
    /// Returns whether a task was woken. The woken task does not run
    /// synchronously; its waker merely schedules it.
    pub(crate) fn wake_first(&self) -> bool {
        loop {
            let entry = self.waiters.borrow_mut().pop_front();
            let Some(waiter) = entry else { return false };
            if waiter.state.get() == WaiterState::Gone {
                continue;
            }
            waiter.state.set(WaiterState::Woken);
            if let Some(waker) = waiter.waker.borrow_mut().take() {
                waker.wake();
            }
            return true;
        }
    }

    /// Wakes every parked task, FIFO.
    pub(crate) fn drain(&self) {
        while self.wake_first() {}
    }
}

/// Future returned by [`WakeQueue::park`]
#[must_use = "parking does nothing unless awaited"]
#[derive(Debug)]
pub(crate) struct Park<'a> {
    queue: &'a WakeQueue,
    waiter: Option<Rc<Waiter>>,
}

impl Future for Park<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match &this.waiter {
            None => {
                let waiter = Rc::new(Waiter {
                    state: Cell::new(WaiterState::Waiting),
                    waker: RefCell::new(Some(cx.waker().clone())),
                });
                this.queue.waiters.borrow_mut().push_back(Rc::clone(&waiter));
                this.waiter = Some(waiter);
                Poll::Pending
            }
            Some(waiter) => {
                if waiter.state.get() == WaiterState::Woken {
                    Poll::Ready(())
                } else {
                    *waiter.waker.borrow_mut() = Some(cx.waker().clone());
                    Poll::Pending
                }
            }
        }
    }
}

impl Drop for Park<'_> {
    fn drop(&mut self) {
        if let Some(waiter) = &self.waiter {
            if waiter.state.get() == WaiterState::Waiting {
                waiter.state.set(WaiterState::Gone);
                waiter.waker.borrow_mut().take();
            }
        }
    }
}
