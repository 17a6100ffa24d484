//! Loopwait: expectation-based waiting that keeps pumping the owner
//! thread's loop.
//!
//! # Overview
//!
//! A test running on a designated "owner" thread often needs to assert
//! that a set of named asynchronous conditions (*expectations*) will
//! eventually be satisfied by work completing on other threads. A
//! blocking primitive like a countdown latch deadlocks here: some of the
//! work that fulfills the expectations may itself be queued on the owner
//! thread's own loop, so that loop must keep draining while the wait is
//! in progress.
//!
//! Loopwait's coordinator pumps the loop cooperatively instead of
//! blocking: one work item per iteration, completion re-checked after
//! every item, deadline polled between iterations, and the registry reset
//! on every terminal outcome so consecutive expect/wait cycles need no
//! manual cleanup.
//!
//! # Module Structure
//!
//! - [`registry`]: the per-test session owning the current generation of
//!   expectations
//! - [`expectation`]: the fulfillable condition handle
//! - [`coordinator`]: the drain/check/deadline wait loop
//! - [`driver`]: the owner-loop seam ([`LoopDriver`]) and the crate's
//!   cooperative work queue ([`StepLoop`])
//! - [`clock`]: pluggable time sources (wall and virtual)
//! - [`error`](mod@error): error types
//!
//! # Example
//!
//! ```
//! use loopwait::{ExpectationRegistry, StepLoop, WaitCoordinator};
//! use std::time::Duration;
//!
//! let registry = ExpectationRegistry::new();
//! let step_loop = StepLoop::new();
//!
//! let parsed = registry.create("response parsed")?;
//! let rendered = registry.create("view rendered")?;
//!
//! // Background work fulfills directly or posts back onto the loop.
//! parsed.fulfill()?;
//! step_loop.post(move || {
//!     rendered.fulfill().expect("first fulfillment");
//! });
//!
//! let coordinator = WaitCoordinator::new(registry);
//! coordinator.wait(Duration::from_secs(5), &step_loop)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod expectation;
pub mod registry;

pub use clock::{Time, TimeSource, VirtualClock, WallClock};
pub use coordinator::WaitCoordinator;
pub use driver::{LoopDriver, StepLoop};
pub use error::{CreateError, FulfillError, LoopDriverError, WaitError};
pub use expectation::Expectation;
pub use registry::ExpectationRegistry;
