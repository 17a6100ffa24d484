//! Wait orchestration.
//!
//! [`WaitCoordinator::wait`] drives the owner thread's loop manually
//! while polling the registry: the thread cannot simply block, because
//! the very work that fulfills the expectations may be queued on that
//! same thread's loop. Each iteration pumps at most one work item, then
//! re-checks completion and the deadline, so a callback posted back from
//! a background thread still runs, and resolution is immediate once the
//! last expectation fires.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::clock::{TimeSource, WallClock};
use crate::driver::LoopDriver;
use crate::error::WaitError;
use crate::registry::ExpectationRegistry;

/// Idle yield when the owner loop has nothing queued. Bounds the
/// deadline-check granularity without busy-spinning.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Orchestrates a single wait session over an [`ExpectationRegistry`].
///
/// Exactly one session may be active at a time; `wait` must be called on
/// the owner thread of the loop driver it pumps. Every terminal outcome
/// (success, timeout, or error) resets the registry, so the next
/// create/wait cycle starts fresh with no manual cleanup.
///
/// # Example
///
/// ```
/// use loopwait::{ExpectationRegistry, StepLoop, WaitCoordinator};
/// use std::time::Duration;
///
/// let registry = ExpectationRegistry::new();
/// let step_loop = StepLoop::new();
///
/// let ready = registry.create("worker ready")?;
/// step_loop.post(move || {
///     ready.fulfill().expect("first fulfillment");
/// });
///
/// let coordinator = WaitCoordinator::new(registry);
/// coordinator.wait(Duration::from_secs(5), &step_loop)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct WaitCoordinator {
    registry: ExpectationRegistry,
    clock: Arc<dyn TimeSource>,
}

impl WaitCoordinator {
    /// Creates a coordinator over `registry`, polling the wall clock.
    #[must_use]
    pub fn new(registry: ExpectationRegistry) -> Self {
        Self::with_clock(registry, Arc::new(WallClock::new()))
    }

    /// Creates a coordinator with an injected time source.
    ///
    /// Tests pass a [`VirtualClock`](crate::VirtualClock) here to drive
    /// timeout paths deterministically.
    #[must_use]
    pub fn with_clock(registry: ExpectationRegistry, clock: Arc<dyn TimeSource>) -> Self {
        Self { registry, clock }
    }

    /// Pumps `driver` until every registered expectation is fulfilled or
    /// `timeout` elapses.
    ///
    /// Preconditions, checked in order, each failure resetting the
    /// registry before returning: no wait may already be active
    /// ([`WaitError::ReentrantWait`]), the calling thread must own the
    /// loop ([`WaitError::WrongThread`]), and at least one expectation
    /// must be registered ([`WaitError::NoExpectations`]).
    ///
    /// A zero timeout is legal: the deadline check simply fires on the
    /// first iteration.
    pub fn wait<D: LoopDriver>(&self, timeout: Duration, driver: &D) -> Result<(), WaitError> {
        self.registry.begin_wait(driver.is_owner_thread())?;

        let deadline = self.clock.now() + timeout;
        tracing::debug!(
            expectations = self.registry.len(),
            timeout_ms = timeout.as_millis() as u64,
            "wait session started"
        );

        loop {
            if driver.has_pending_work() {
                if let Err(error) = driver.run_one() {
                    self.registry.reset();
                    tracing::debug!(%error, "wait session aborted by loop driver");
                    return Err(WaitError::LoopDriver(error));
                }
            } else {
                thread::sleep(IDLE_SLEEP);
            }

            // Checked after every pumped item, not on a timer, so the
            // session resolves as soon as the last expectation fires.
            if self.registry.all_fulfilled() {
                self.registry.reset();
                tracing::debug!("wait session fulfilled");
                return Ok(());
            }

            if self.clock.now() >= deadline {
                let unfulfilled = self.registry.unfulfilled_descriptions();
                self.registry.reset();
                tracing::debug!(?unfulfilled, "wait session timed out");
                return Err(WaitError::Timeout { unfulfilled });
            }
        }
    }

    /// [`wait`](Self::wait) with the timeout given in fractional seconds.
    ///
    /// Non-positive or non-finite values clamp to zero and produce an
    /// immediate timeout check on the first iteration.
    pub fn wait_secs<D: LoopDriver>(&self, seconds: f64, driver: &D) -> Result<(), WaitError> {
        let timeout = if seconds.is_finite() && seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        self.wait(timeout, driver)
    }

    /// The registry this coordinator waits on.
    #[must_use]
    pub fn registry(&self) -> &ExpectationRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for WaitCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitCoordinator")
            .field("registry", &self.registry)
            .finish()
    }
}
