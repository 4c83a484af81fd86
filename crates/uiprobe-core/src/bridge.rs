//! Cross-thread call bridge onto the render/event loop
//!
//! The scene graph is owned by exactly one thread. Request-serving threads
//! submit work here; the owner loop services the queue once per iteration
//! via [`LoopBridge::drain`], and each caller blocks on its own one-shot
//! completion channel until its job has run and reported a boolean outcome.
//!
//! The boolean is the whole contract: jobs that need to return data capture
//! a channel or shared cell. Calls from the owner thread itself are detected
//! and run inline; a reentrant call made while the host state is already
//! borrowed reports `false` instead of deadlocking.

use crate::ProbeHost;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::mpsc::{SyncSender, sync_channel};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

/// Owner-thread handle to the probe-visible host state.
pub type HostCell = Rc<RefCell<ProbeHost>>;

type Job = Box<dyn FnOnce(&mut ProbeHost) -> bool + Send>;

thread_local! {
    static BOUND_HOST: RefCell<Option<HostCell>> = const { RefCell::new(None) };
}

#[derive(Clone, Default)]
pub struct LoopBridge {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    queue: Mutex<VecDeque<(Job, SyncSender<bool>)>>,
    owner: OnceLock<ThreadId>,
}

impl LoopBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the host state to the calling thread and mark it the owner.
    /// The loop must call this once before its first [`drain`](Self::drain).
    pub fn bind(&self, host: HostCell) {
        let _ = self.inner.owner.set(thread::current().id());
        BOUND_HOST.with(|slot| *slot.borrow_mut() = Some(host));
    }

    pub fn is_owner_thread(&self) -> bool {
        self.inner
            .owner
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    /// Run `job` on the owner thread, blocking until it has executed and
    /// reported its outcome. On the owner thread the job runs inline.
    pub fn run<F>(&self, job: F) -> bool
    where
        F: FnOnce(&mut ProbeHost) -> bool + Send + 'static,
    {
        if self.is_owner_thread() {
            return run_bound(Box::new(job));
        }
        let (tx, rx) = sync_channel(1);
        self.inner.queue.lock().push_back((Box::new(job), tx));
        rx.recv().unwrap_or(false)
    }

    /// Service every pending job. Called by the owner loop each iteration;
    /// the queue lock is not held while a job runs.
    pub fn drain(&self) {
        loop {
            let next = self.inner.queue.lock().pop_front();
            let Some((job, tx)) = next else {
                break;
            };
            let outcome = run_bound(job);
            let _ = tx.try_send(outcome);
        }
    }
}

fn run_bound(job: Job) -> bool {
    let cell = BOUND_HOST.with(|slot| slot.borrow().clone());
    let Some(cell) = cell else {
        tracing::warn!("bridge job dropped: no host bound on this thread");
        return false;
    };
    match cell.try_borrow_mut() {
        Ok(mut host) => catch_unwind(AssertUnwindSafe(|| job(&mut host))).unwrap_or_else(|_| {
            tracing::warn!("bridge job panicked");
            false
        }),
        Err(_) => {
            tracing::warn!("reentrant bridge call while host state is borrowed");
            false
        }
    }
}
