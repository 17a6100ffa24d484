//! Expectation registry.
//!
//! The registry owns the current *generation*: the live set of named
//! expectations plus the `waiting` flag that enforces a single active wait
//! session. It is an explicitly constructed, Arc-backed session object
//! (create one per test, share it by clone) rather than process-wide
//! state, so nothing can leak between tests that a reset missed.
//!
//! All generation mutations are serialized behind one mutex; the
//! per-expectation `fulfilled` flag is written atomically without it (see
//! [`crate::expectation`]).

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{CreateError, WaitError};
use crate::expectation::{Expectation, ExpectationInner};

/// The live set of expectations. Replaced wholesale on every reset.
struct Generation {
    // Insertion order is the deterministic order used for timeout
    // diagnostics.
    entries: Vec<Arc<ExpectationInner>>,
    waiting: bool,
}

impl Generation {
    const fn new() -> Self {
        Self {
            entries: Vec::new(),
            waiting: false,
        }
    }

    /// Marks every entry ignored and starts a fresh, idle generation.
    fn invalidate(&mut self) {
        for entry in self.entries.drain(..) {
            entry.mark_ignored();
        }
        self.waiting = false;
    }
}

pub(crate) struct RegistryInner {
    generation: Mutex<Generation>,
}

impl RegistryInner {
    pub(crate) fn reset(&self) {
        self.generation.lock().invalidate();
    }
}

/// Registry of named expectations for one wait session at a time.
///
/// Cloning yields another handle to the same session.
///
/// # Example
///
/// ```
/// use loopwait::ExpectationRegistry;
///
/// let registry = ExpectationRegistry::new();
/// let loaded = registry.create("data loaded")?;
/// loaded.fulfill()?;
/// assert!(registry.all_fulfilled());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct ExpectationRegistry {
    inner: Arc<RegistryInner>,
}

impl ExpectationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                generation: Mutex::new(Generation::new()),
            }),
        }
    }

    /// Registers a new expectation under `description`.
    ///
    /// The description is the expectation's identity within the current
    /// generation and is what timeout diagnostics print.
    pub fn create(&self, description: &str) -> Result<Expectation, CreateError> {
        if description.is_empty() {
            return Err(CreateError::EmptyDescription);
        }
        let mut generation = self.inner.generation.lock();
        if generation
            .entries
            .iter()
            .any(|entry| entry.description() == description)
        {
            return Err(CreateError::Duplicate {
                description: description.to_owned(),
            });
        }
        let entry = Arc::new(ExpectationInner::new(
            description.to_owned(),
            Arc::downgrade(&self.inner),
        ));
        generation.entries.push(Arc::clone(&entry));
        tracing::trace!(description, "expectation registered");
        Ok(Expectation::from_inner(entry))
    }

    /// Returns true iff every expectation in the current generation has
    /// been fulfilled.
    ///
    /// An empty generation is vacuously complete; the coordinator rejects
    /// empty generations before waiting, so this is only observable after
    /// a mid-wait reset.
    #[must_use]
    pub fn all_fulfilled(&self) -> bool {
        self.inner
            .generation
            .lock()
            .entries
            .iter()
            .all(|entry| entry.is_fulfilled())
    }

    /// Returns the descriptions still unfulfilled, in registration order.
    #[must_use]
    pub fn unfulfilled_descriptions(&self) -> Vec<String> {
        self.inner
            .generation
            .lock()
            .entries
            .iter()
            .filter(|entry| !entry.is_fulfilled())
            .map(|entry| entry.description().to_owned())
            .collect()
    }

    /// Number of expectations in the current generation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.generation.lock().entries.len()
    }

    /// Returns true if the current generation has no expectations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.generation.lock().entries.is_empty()
    }

    /// Invalidates the current generation and starts a fresh one.
    ///
    /// Every outstanding expectation is marked ignored, the `waiting`
    /// flag is cleared, and the entry list is emptied. Safe to call
    /// concurrently with `create` and `fulfill`.
    pub fn reset(&self) {
        tracing::trace!("registry reset");
        self.inner.reset();
    }

    /// Claims the single wait slot after validating preconditions.
    ///
    /// Checks run in the contract's order (reentrancy, then calling
    /// thread, then non-empty generation); every failure invalidates the
    /// generation before returning, so the next cycle starts clean.
    pub(crate) fn begin_wait(&self, on_owner_thread: bool) -> Result<(), WaitError> {
        let mut generation = self.inner.generation.lock();
        if generation.waiting {
            generation.invalidate();
            return Err(WaitError::ReentrantWait);
        }
        if !on_owner_thread {
            generation.invalidate();
            return Err(WaitError::WrongThread);
        }
        if generation.entries.is_empty() {
            generation.invalidate();
            return Err(WaitError::NoExpectations);
        }
        generation.waiting = true;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn force_waiting_for_test(&self) {
        self.inner.generation.lock().waiting = true;
    }
}

impl Default for ExpectationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExpectationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let generation = self.inner.generation.lock();
        f.debug_struct("ExpectationRegistry")
            .field("expectations", &generation.entries.len())
            .field("waiting", &generation.waiting)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_description_is_rejected() {
        let registry = ExpectationRegistry::new();
        assert_eq!(
            registry.create("").expect_err("empty description"),
            CreateError::EmptyDescription
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_description_is_rejected() {
        let registry = ExpectationRegistry::new();
        registry.create("twice").expect("first registration");
        assert_eq!(
            registry.create("twice").expect_err("duplicate"),
            CreateError::Duplicate {
                description: "twice".into(),
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_description_is_fine_across_generations() {
        let registry = ExpectationRegistry::new();
        registry.create("again").expect("first generation");
        registry.reset();
        registry.create("again").expect("second generation");
    }

    #[test]
    fn unfulfilled_descriptions_keep_registration_order() {
        let registry = ExpectationRegistry::new();
        registry.create("first").expect("create");
        let second = registry.create("second").expect("create");
        registry.create("third").expect("create");

        second.fulfill().expect("fulfill");
        assert_eq!(
            registry.unfulfilled_descriptions(),
            vec!["first".to_owned(), "third".to_owned()]
        );
    }

    #[test]
    fn all_fulfilled_tracks_every_entry() {
        let registry = ExpectationRegistry::new();
        let a = registry.create("a").expect("create");
        let b = registry.create("b").expect("create");

        assert!(!registry.all_fulfilled());
        a.fulfill().expect("fulfill a");
        assert!(!registry.all_fulfilled());
        b.fulfill().expect("fulfill b");
        assert!(registry.all_fulfilled());
    }

    #[test]
    fn reset_clears_waiting_flag() {
        let registry = ExpectationRegistry::new();
        registry.create("pending").expect("create");
        registry.begin_wait(true).expect("first claim");

        assert_eq!(
            registry.begin_wait(true).expect_err("slot taken"),
            crate::error::WaitError::ReentrantWait
        );
        // The reentrant failure invalidated the generation.
        assert!(registry.is_empty());

        registry.create("fresh").expect("create after reset");
        registry.begin_wait(true).expect("slot free again");
    }

    #[test]
    fn begin_wait_checks_preconditions_in_order() {
        // Reentrancy outranks the thread check, which outranks emptiness.
        let registry = ExpectationRegistry::new();
        registry.force_waiting_for_test();
        assert_eq!(
            registry.begin_wait(false).expect_err("reentrant first"),
            crate::error::WaitError::ReentrantWait
        );

        assert_eq!(
            registry.begin_wait(false).expect_err("thread next"),
            crate::error::WaitError::WrongThread
        );

        assert_eq!(
            registry.begin_wait(true).expect_err("emptiness last"),
            crate::error::WaitError::NoExpectations
        );
    }

    proptest! {
        #[test]
        fn registering_distinct_descriptions_always_succeeds(
            descriptions in proptest::collection::hash_set("[a-z]{1,12}", 1..16)
        ) {
            let registry = ExpectationRegistry::new();
            for description in &descriptions {
                registry.create(description).expect("distinct descriptions");
            }
            prop_assert_eq!(registry.len(), descriptions.len());
            prop_assert!(!registry.all_fulfilled());
        }

        #[test]
        fn all_fulfilled_only_after_every_handle_fires(
            count in 1usize..12
        ) {
            let registry = ExpectationRegistry::new();
            let handles: Vec<_> = (0..count)
                .map(|i| registry.create(&format!("expectation-{i}")).expect("create"))
                .collect();

            for (index, handle) in handles.iter().enumerate() {
                prop_assert!(!registry.all_fulfilled());
                handle.fulfill().expect("fulfill");
                let done = index + 1 == count;
                prop_assert_eq!(registry.all_fulfilled(), done);
            }
        }
    }
}
