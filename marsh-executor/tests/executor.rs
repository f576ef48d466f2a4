// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

use std::cell::{Cell, RefCell};
use std::future::pending;
use std::rc::Rc;
use marsh_executor::handle::TryTakeError;
use marsh_executor::{yield_now, Executor, SpawnError, Spawner};

mod spawn {
    use super::*;

    #[test]
    fn increases_pending_count() {
        let executor = Executor::new();
        assert_eq!(executor.pending_count(), 0);

        unsafe { executor.spawn(async {}) };
        assert_eq!(executor.pending_count(), 1);
    }

    #[test]
    fn does_not_poll_spawned_future() {
        let executor = Executor::new();
        let _ = unsafe { executor.spawn::<_, ()>(async { unreachable!() }) };
    }

    #[test]
    fn handle_yields_result_after_run() {
        let executor = Executor::new();
        let handle = unsafe { executor.spawn(async { 42 }) };
        assert_eq!(handle.try_take(), Err(TryTakeError::NotReady));

        assert_eq!(executor.run_until_stalled(), 1);
        assert_eq!(handle.try_take(), Ok(42));
    }

    #[test]
    fn task_runs_even_if_handle_is_dropped_early() {
        let run = Cell::new(false);
        let executor = Executor::new();
        drop(unsafe {
            executor.spawn(async {
                run.set(true);
                42 // discarded because nobody holds the handle
            })
        });

        assert_eq!(executor.run_until_stalled(), 1);
        assert!(run.get());
    }

    #[test]
    fn handle_can_be_awaited_from_another_task() {
        let executor = Executor::new();
        let inner = unsafe { executor.spawn(async { 2 }) };
        let outer = unsafe { executor.spawn(async move { inner.await + 3 }) };

        executor.run_until_stalled();
        assert_eq!(outer.try_take(), Ok(5));
    }
}

mod step {
    use super::*;

    #[test]
    fn returns_none_when_no_tasks() {
        let executor = Executor::new();
        assert_eq!(executor.step(), None);
    }

    #[test]
    fn returns_false_when_task_not_complete() {
        let executor = Executor::new();
        unsafe { executor.spawn_boxed(Box::pin(pending())) };
        assert_eq!(executor.step(), Some(false));
    }

    #[test]
    fn returns_true_when_task_complete() {
        let executor = Executor::new();
        unsafe { executor.spawn_boxed(Box::pin(async {})) };
        assert_eq!(executor.step(), Some(true));
    }

    #[test]
    fn removes_task_from_run_queue() {
        let executor = Executor::new();
        unsafe { executor.spawn_boxed(Box::pin(async {})) };
        executor.step();
        assert_eq!(executor.pending_count(), 0);
    }

    #[test]
    fn runs_tasks_in_spawn_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let executor = Executor::new();
        for tag in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            unsafe { executor.spawn_boxed(Box::pin(async move { order.borrow_mut().push(tag) })) };
        }

        while executor.step().is_some() {}
        assert_eq!(*order.borrow(), ["first", "second", "third"]);
    }
}

mod run_until_stalled {
    use super::*;

    #[test]
    fn returns_zero_when_no_tasks() {
        let executor = Executor::new();
        assert_eq!(executor.run_until_stalled(), 0);
    }

    #[test]
    fn counts_completed_tasks_only() {
        let executor = Executor::new();
        unsafe {
            executor.spawn_boxed(Box::pin(async {}));
            executor.spawn_boxed(Box::pin(pending()));
        }
        assert_eq!(executor.run_until_stalled(), 1);
        assert_eq!(executor.pending_count(), 0);
    }
}

mod yielding {
    use super::*;

    #[test]
    fn yield_now_resumes_after_other_tasks() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let executor = Executor::new();

        let yielder = Rc::clone(&order);
        unsafe {
            executor.spawn_boxed(Box::pin(async move {
                yielder.borrow_mut().push("yielder: before");
                yield_now().await;
                yielder.borrow_mut().push("yielder: after");
            }));
        }
        let other = Rc::clone(&order);
        unsafe {
            executor.spawn_boxed(Box::pin(async move { other.borrow_mut().push("other") }));
        }

        assert_eq!(executor.run_until_stalled(), 2);
        assert_eq!(
            *order.borrow(),
            ["yielder: before", "other", "yielder: after"]
        );
    }
}

mod spawner {
    use super::*;

    #[test]
    fn dead_spawner_rejects_tasks() {
        let spawner = Spawner::dead();
        let result = unsafe { spawner.spawn(async { 1 }) };
        assert_eq!(result.unwrap_err(), SpawnError);
    }

    #[test]
    fn spawner_rejects_tasks_after_executor_dropped() {
        let spawner = Executor::new().spawner();
        let result = unsafe { spawner.spawn(async { 1 }) };
        assert_eq!(result.unwrap_err(), SpawnError);
    }

    #[test]
    fn spawned_tasks_run_alongside_executor_tasks() {
        let executor = Executor::new();
        let spawner = executor.spawner();
        let one = unsafe { spawner.spawn(async { 1 }) }.unwrap();
        let two = unsafe { spawner.spawn(async { 2 }) }.unwrap();
        let sum = unsafe { executor.spawn(async move { one.await + two.await }) };

        executor.run_until_stalled();
        assert_eq!(sum.try_take(), Ok(3));
    }

    #[test]
    fn spawn_boxed_returns_future_when_executor_is_gone() {
        let spawner = Executor::new().spawner();
        let result = unsafe { spawner.spawn_boxed(Box::pin(async {})) };
        assert!(result.is_err());
    }
}
