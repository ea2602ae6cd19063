//! Fixed-size worker pool for facet branches.
//!
//! Workers are scoped threads that pull task indexes from a shared cursor,
//! so a pool never runs more than its configured number of tasks at once
//! and borrowed inputs can be shared without copying. The calling thread
//! works alongside the spawned ones.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;

use crate::cancel::CancellationToken;

/// Why a pooled run did not produce every result.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolError<E> {
    /// A task returned an error.
    Task { index: usize, error: E },
    /// A task panicked.
    Panicked { index: usize },
    /// The run was cancelled before every task completed.
    Cancelled,
}

/// Worker pool with a fixed thread count.
#[derive(Debug, Clone, Copy)]
pub struct FacetPool {
    threads: usize,
}

impl FacetPool {
    /// Create a pool running at most `threads` tasks concurrently.
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    /// Number of worker threads, including the caller.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `tasks` tasks and collect their results in index order.
    ///
    /// Each task receives its index and a stop check that turns true once
    /// the caller cancels or another task fails. A task that notices the stop
    /// returns `Ok(None)`; tasks not yet started are skipped. When several
    /// tasks fail, the error of the lowest index is returned, and a run that
    /// was only stopped reports [`PoolError::Cancelled`].
    pub fn run<R, E, F>(
        &self,
        tasks: usize,
        cancel: &CancellationToken,
        work: F,
    ) -> Result<Vec<R>, PoolError<E>>
    where
        R: Send,
        E: Send,
        F: Fn(usize, &dyn Fn() -> bool) -> Result<Option<R>, E> + Sync,
    {
        let threads = self.threads.min(tasks).max(1);
        let cursor = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let slots: Mutex<Vec<Option<Result<R, PoolError<E>>>>> =
            Mutex::new((0..tasks).map(|_| None).collect());

        let should_stop = || abort.load(Ordering::SeqCst) || cancel.is_cancelled();

        let worker = || loop {
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            if index >= tasks || should_stop() {
                break;
            }

            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| work(index, &should_stop))) {
                Ok(Ok(Some(result))) => Ok(result),
                Ok(Ok(None)) => continue,
                Ok(Err(error)) => Err(PoolError::Task { index, error }),
                Err(_) => Err(PoolError::Panicked { index }),
            };
            if outcome.is_err() {
                abort.store(true, Ordering::SeqCst);
            }
            slots.lock()[index] = Some(outcome);
        };

        thread::scope(|scope| {
            for _ in 1..threads {
                scope.spawn(&worker);
            }
            worker();
        });

        let slots = slots.into_inner();
        let mut results = Vec::with_capacity(tasks);
        let mut incomplete = false;
        for slot in slots {
            match slot {
                Some(Ok(result)) => results.push(result),
                Some(Err(error)) => return Err(error),
                None => incomplete = true,
            }
        }

        if incomplete {
            return Err(PoolError::Cancelled);
        }
        Ok(results)
    }
}
