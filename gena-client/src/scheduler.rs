//! One-shot timer scheduling for subscription renewals.
//!
//! A single background thread sleeps until the earliest pending job is
//! due, pops it, and runs it. Jobs own value-copies of whatever they
//! need; correlation back to live table entries happens inside the job,
//! under the manager's locks. Cancellation is best-effort: a job that
//! has already been popped runs to completion, which is harmless
//! because fired jobs re-validate their subscription before acting.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::error::GenaError;

/// Identifier of a scheduled job, unique for the scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

type Job = Box<dyn FnOnce() + Send>;

struct Entry {
    id: u64,
    due: Instant,
    job: Job,
}

struct State {
    pending: Vec<Entry>,
    next_id: u64,
    shutdown: bool,
}

/// A dedicated worker thread running one-shot jobs at their due time.
pub(crate) struct Scheduler {
    shared: Arc<(Mutex<State>, Condvar)>,
    worker: Option<JoinHandle<()>>,
    worker_thread: ThreadId,
}

impl Scheduler {
    pub fn new() -> Result<Self, GenaError> {
        let shared = Arc::new((
            Mutex::new(State {
                pending: Vec::new(),
                next_id: 1,
                shutdown: false,
            }),
            Condvar::new(),
        ));
        let worker = thread::Builder::new()
            .name("gena-renewal-timer".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || run_worker(&shared)
            })
            .map_err(|_| GenaError::OutOfMemory)?;
        let worker_thread = worker.thread().id();
        Ok(Self {
            shared,
            worker: Some(worker),
            worker_thread,
        })
    }

    /// Queue `job` to run after `delay`.
    pub fn schedule(&self, delay: Duration, job: Job) -> Result<TimerId, GenaError> {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        if state.shutdown {
            return Err(GenaError::OutOfMemory);
        }
        let id = state.next_id;
        state.next_id += 1;
        state.pending.push(Entry {
            id,
            due: Instant::now() + delay,
            job,
        });
        cvar.notify_one();
        Ok(TimerId(id))
    }

    /// Drop a pending job. Unknown or already-fired ids are ignored.
    pub fn cancel(&self, id: TimerId) {
        let (lock, _) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.pending.retain(|e| e.id != id.0);
    }

    /// Number of jobs waiting to fire.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        let (lock, _) = &*self.shared;
        lock.lock().unwrap().pending.len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.shared;
        {
            let mut state = lock.lock().unwrap();
            state.shutdown = true;
            state.pending.clear();
            cvar.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            // A running job can hold the last reference to the client and
            // therefore drop this scheduler from the worker thread itself;
            // joining would deadlock, and the thread is exiting anyway.
            if thread::current().id() != self.worker_thread {
                let _ = worker.join();
            }
        }
    }
}

fn run_worker(shared: &(Mutex<State>, Condvar)) {
    let (lock, cvar) = shared;
    let mut state = lock.lock().unwrap();
    loop {
        if state.shutdown {
            return;
        }
        let now = Instant::now();
        let earliest = state
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.due)
            .map(|(i, e)| (i, e.due));
        match earliest {
            None => {
                state = cvar.wait(state).unwrap();
            }
            Some((_, due)) if due > now => {
                state = cvar.wait_timeout(state, due - now).unwrap().0;
            }
            Some((index, _)) => {
                let entry = state.pending.swap_remove(index);
                drop(state);
                (entry.job)();
                state = lock.lock().unwrap();
            }
        }
    }
}
