//! Deferred-initialization scheduler
//!
//! Holds initialization callbacks until configuration has been resolved,
//! then runs them in registration order on a dedicated worker thread.
//! Callbacks registered while the drain is running, including from inside
//! another callback, join the tail of the queue and still run before the
//! drain finishes. Once the drain has finished, new callbacks run inline at
//! registration time.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Queue open, no drain started yet
    Accepting,
    /// A drain is in flight; the worker is servicing the queue
    Draining,
    /// The drain finished; registrations now run inline
    Closed,
}

struct State {
    phase: Phase,
    queue: VecDeque<Callback>,
    /// Payload of a callback panic, re-raised on the thread blocked in drain
    panic_payload: Option<Box<dyn Any + Send>>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    /// Wakes the worker when work arrives or a drain starts
    work_ready: Condvar,
    /// Wakes threads blocked in `drain` once the phase latches closed
    drain_done: Condvar,
}

/// FIFO scheduler for deferred initialization callbacks.
///
/// Every [`ConfigRegistry`](crate::ConfigRegistry) owns one; it can also be
/// used standalone. All callbacks execute on a single worker thread, so no
/// two callbacks ever run concurrently.
pub struct InitScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl InitScheduler {
    /// Create a scheduler in the accepting phase with its worker running
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                phase: Phase::Accepting,
                queue: VecDeque::new(),
                panic_payload: None,
                shutdown: false,
            }),
            work_ready: Condvar::new(),
            drain_done: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || worker_loop(worker_shared));
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Register an initialization callback.
    ///
    /// Before and during a drain the callback joins the tail of the queue
    /// and runs in strict registration order, after every callback
    /// registered before it. After the drain has finished it runs
    /// immediately, on the calling thread.
    pub fn register<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock().unwrap();
        match state.phase {
            Phase::Accepting | Phase::Draining => {
                state.queue.push_back(Box::new(callback));
                self.shared.work_ready.notify_one();
            }
            Phase::Closed => {
                // inline execution must not hold the scheduler lock, so a
                // callback can itself call register without deadlocking
                drop(state);
                callback();
            }
        }
    }

    /// Run every queued callback, blocking until the queue is exhausted.
    ///
    /// Callbacks registered while the drain runs extend it; the drain is
    /// finished only when the queue is observed empty with no registration
    /// in between. Returns immediately if the scheduler is already closed.
    /// If a callback panics, the remaining queue is abandoned and the panic
    /// is re-raised here.
    pub fn drain(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if state.phase == Phase::Closed {
            return;
        }
        state.phase = Phase::Draining;
        self.shared.work_ready.notify_one();
        while state.phase != Phase::Closed {
            state = self.shared.drain_done.wait(state).unwrap();
        }
        if let Some(payload) = state.panic_payload.take() {
            drop(state);
            panic::resume_unwind(payload);
        }
    }

    /// Return to the accepting phase with a fresh, empty queue.
    ///
    /// Intended for tests that run several resolve cycles in one process.
    ///
    /// # Panics
    ///
    /// Panics if called while a drain is in flight.
    pub fn reset(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if state.phase == Phase::Draining {
            drop(state);
            panic!("reset called while initialization callbacks are draining");
        }
        state.queue.clear();
        state.panic_payload = None;
        state.phase = Phase::Accepting;
    }

    /// Whether the drain has finished and registrations now run inline
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().unwrap().phase == Phase::Closed
    }

    /// Number of callbacks currently queued
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().unwrap().queue.len()
    }
}

impl Default for InitScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InitScheduler {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.shutdown = true;
            self.shared.work_ready.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    log::debug!("init scheduler worker started");
    let mut state = shared.state.lock().unwrap();
    loop {
        if state.shutdown {
            break;
        }
        if state.phase != Phase::Draining {
            state = shared.work_ready.wait(state).unwrap();
            continue;
        }
        match state.queue.pop_front() {
            Some(callback) => {
                // run the callback with the lock released so registrations
                // made from inside it can reach the queue
                drop(state);
                let result = panic::catch_unwind(AssertUnwindSafe(callback));
                state = shared.state.lock().unwrap();
                if let Err(payload) = result {
                    log::error!(
                        "init callback panicked, abandoning {} queued callbacks",
                        state.queue.len()
                    );
                    state.queue.clear();
                    state.panic_payload = Some(payload);
                    state.phase = Phase::Closed;
                    shared.drain_done.notify_all();
                }
            }
            None => {
                // the queue is empty and the phase is still draining; both
                // were observed under one lock, so no registration can have
                // slipped in between: latch closed
                state.phase = Phase::Closed;
                shared.drain_done.notify_all();
            }
        }
    }
    log::debug!("init scheduler worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callbacks_run_in_registration_order() {
        let sched = InitScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let order = Arc::clone(&order);
            sched.register(move || order.lock().unwrap().push(i));
        }
        assert_eq!(sched.pending_count(), 5);
        sched.drain();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_nested_registration_extends_drain() {
        let sched = Arc::new(InitScheduler::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let inner_sched = Arc::clone(&sched);
        let inner_order = Arc::clone(&order);
        let outer_order = Arc::clone(&order);
        sched.register(move || {
            outer_order.lock().unwrap().push("a");
            let nested_order = Arc::clone(&inner_order);
            inner_sched.register(move || nested_order.lock().unwrap().push("b"));
        });

        sched.drain();
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_inline_after_close() {
        let sched = InitScheduler::new();
        sched.drain();
        assert!(sched.is_closed());

        let ran = Arc::new(Mutex::new(false));
        let ran_clone = Arc::clone(&ran);
        sched.register(move || *ran_clone.lock().unwrap() = true);
        // no drain needed: the callback ran at registration time
        assert!(*ran.lock().unwrap());
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    fn test_drain_twice_is_harmless() {
        let sched = InitScheduler::new();
        let count = Arc::new(Mutex::new(0));
        let count_clone = Arc::clone(&count);
        sched.register(move || *count_clone.lock().unwrap() += 1);
        sched.drain();
        sched.drain();
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_reset_reopens_queue() {
        let sched = InitScheduler::new();
        sched.drain();
        assert!(sched.is_closed());

        sched.reset();
        assert!(!sched.is_closed());

        let ran = Arc::new(Mutex::new(false));
        let ran_clone = Arc::clone(&ran);
        sched.register(move || *ran_clone.lock().unwrap() = true);
        // queued again, not inline
        assert!(!*ran.lock().unwrap());
        assert_eq!(sched.pending_count(), 1);
        sched.drain();
        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn test_callback_panic_propagates_to_drain() {
        let sched = InitScheduler::new();
        let ran_after = Arc::new(Mutex::new(false));
        let ran_clone = Arc::clone(&ran_after);
        sched.register(|| panic!("boom"));
        sched.register(move || *ran_clone.lock().unwrap() = true);

        let result = panic::catch_unwind(AssertUnwindSafe(|| sched.drain()));
        assert!(result.is_err());
        // the rest of the queue was abandoned
        assert!(!*ran_after.lock().unwrap());
        assert!(sched.is_closed());
    }

    #[test]
    fn test_registration_from_other_threads() {
        let sched = Arc::new(InitScheduler::new());
        let count = Arc::new(Mutex::new(0));

        let mut joins = Vec::new();
        for _ in 0..8 {
            let sched = Arc::clone(&sched);
            let count = Arc::clone(&count);
            joins.push(thread::spawn(move || {
                sched.register(move || *count.lock().unwrap() += 1);
            }));
        }
        for join in joins {
            join.join().unwrap();
        }

        sched.drain();
        assert_eq!(*count.lock().unwrap(), 8);
    }
}
