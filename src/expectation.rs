//! Expectation handles.
//!
//! An [`Expectation`] is a named boolean condition created through an
//! [`ExpectationRegistry`](crate::ExpectationRegistry). The thread that
//! completes the corresponding asynchronous work calls [`fulfill`]
//! (any thread, no lock on the hot path); the owner thread's wait loop
//! polls the flag through the registry.
//!
//! [`fulfill`]: Expectation::fulfill

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::error::FulfillError;
use crate::registry::RegistryInner;

/// Shared state of a single expectation.
///
/// Held by the registry's current generation and by every [`Expectation`]
/// handle cloned from it. The `fulfilled` flag is the only cross-thread
/// hot path and is written without taking the registry lock.
pub(crate) struct ExpectationInner {
    description: String,
    fulfilled: AtomicBool,
    // Flipped by a generation reset; a fulfillment arriving afterwards is
    // silently absorbed instead of corrupting the next generation.
    ignored: AtomicBool,
    registry: Weak<RegistryInner>,
}

impl ExpectationInner {
    pub(crate) fn new(description: String, registry: Weak<RegistryInner>) -> Self {
        Self {
            description,
            fulfilled: AtomicBool::new(false),
            ignored: AtomicBool::new(false),
            registry,
        }
    }

    pub(crate) fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn is_fulfilled(&self) -> bool {
        self.fulfilled.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ignored(&self) {
        self.ignored.store(true, Ordering::Release);
    }
}

/// A named condition that must become true before a wait resolves.
///
/// Handles are cheap to clone and may cross threads freely; `fulfill` is
/// safe to call from any thread.
#[derive(Clone)]
pub struct Expectation {
    inner: Arc<ExpectationInner>,
}

impl Expectation {
    pub(crate) fn from_inner(inner: Arc<ExpectationInner>) -> Self {
        Self { inner }
    }

    /// Returns the description this expectation was registered under.
    #[must_use]
    pub fn description(&self) -> &str {
        self.inner.description()
    }

    /// Returns true once the expectation has been fulfilled.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.inner.is_fulfilled()
    }

    /// Marks the expectation as met.
    ///
    /// A second call on the same expectation fails with
    /// [`FulfillError::AlreadyFulfilled`] and, fail-fast, resets the whole
    /// in-flight generation: completion semantics of a generation that
    /// double-fired are no longer trustworthy.
    ///
    /// Calls on an expectation invalidated by a registry reset are
    /// silently absorbed; late callbacks from a superseded generation must
    /// not disturb the next one.
    pub fn fulfill(&self) -> Result<(), FulfillError> {
        if self.inner.ignored.load(Ordering::Acquire) {
            tracing::trace!(
                description = self.inner.description(),
                "ignoring fulfillment of superseded expectation"
            );
            return Ok(());
        }
        if self.inner.fulfilled.swap(true, Ordering::AcqRel) {
            tracing::debug!(
                description = self.inner.description(),
                "expectation fulfilled twice, resetting generation"
            );
            if let Some(registry) = self.inner.registry.upgrade() {
                registry.reset();
            }
            return Err(FulfillError::AlreadyFulfilled {
                description: self.inner.description().to_owned(),
            });
        }
        tracing::trace!(description = self.inner.description(), "expectation fulfilled");
        Ok(())
    }
}

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation")
            .field("description", &self.inner.description())
            .field("fulfilled", &self.inner.is_fulfilled())
            .field("ignored", &self.inner.ignored.load(Ordering::Acquire))
            .finish()
    }
}
