//! Owner-loop abstraction.
//!
//! The wait coordinator never touches a platform event loop directly; it
//! pumps a [`LoopDriver`]. The trait is the minimal surface the wait
//! algorithm needs: peek for pending work, execute exactly one item, and
//! identify the owner thread.
//!
//! [`StepLoop`] is the crate's own driver: a cooperative work queue that
//! application code dispatches through in tests. Background threads
//! `post` completion callbacks onto it; the owner thread executes them
//! one at a time while waiting.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, ThreadId};

use crossbeam_queue::SegQueue;

use crate::error::LoopDriverError;

/// The owner thread's work queue, as seen by the wait coordinator.
pub trait LoopDriver {
    /// Returns true if a work item is queued. Must not consume anything.
    fn has_pending_work(&self) -> bool;

    /// Pops and executes exactly one pending work item on the calling
    /// thread. A no-op when the queue is empty.
    fn run_one(&self) -> Result<(), LoopDriverError>;

    /// Returns true if the calling thread is the loop's owner.
    fn is_owner_thread(&self) -> bool;
}

type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// A cooperative work-queue loop, pumped one item at a time.
///
/// The constructing thread is the owner. Any thread may [`post`] work;
/// only the owner executes it, either through
/// [`WaitCoordinator::wait`](crate::WaitCoordinator::wait) pumping the
/// queue or by calling [`run_one`](LoopDriver::run_one) directly.
///
/// # Example
///
/// ```
/// use loopwait::{LoopDriver, StepLoop};
///
/// let step_loop = StepLoop::new();
/// step_loop.post(|| println!("ran on the owner thread"));
/// assert!(step_loop.has_pending_work());
/// step_loop.run_one()?;
/// assert!(!step_loop.has_pending_work());
/// # Ok::<(), loopwait::LoopDriverError>(())
/// ```
///
/// [`post`]: StepLoop::post
pub struct StepLoop {
    queue: SegQueue<WorkItem>,
    owner: ThreadId,
}

impl StepLoop {
    /// Creates a loop owned by the calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            owner: thread::current().id(),
        }
    }

    /// Enqueues a work item. Callable from any thread; items execute on
    /// the owner thread in the order they were posted.
    pub fn post<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.push(Box::new(work));
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no work is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for StepLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopDriver for StepLoop {
    fn has_pending_work(&self) -> bool {
        !self.queue.is_empty()
    }

    fn run_one(&self) -> Result<(), LoopDriverError> {
        let Some(work) = self.queue.pop() else {
            return Ok(());
        };
        tracing::trace!("executing one work item");
        // A panicking work item must not unwind through the wait loop;
        // it surfaces as a driver error with the payload preserved.
        catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::debug!(%message, "work item panicked");
            LoopDriverError::new(format!("work item panicked: {message}"))
        })
    }

    fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

impl std::fmt::Debug for StepLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepLoop")
            .field("pending", &self.queue.len())
            .field("owner", &self.owner)
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
