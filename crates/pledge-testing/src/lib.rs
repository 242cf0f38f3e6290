//! Test helpers for code built on `pledge`: a call-recording [`Spy`] and a
//! [`TestRealm`] that pairs a realm with its hand-pumped turn queue.

use std::cell::RefCell;
use std::rc::Rc;

use pledge::{Realm, TurnQueue};

/// Records every value passed to it, for asserting on handler invocations.
///
/// Clones share the same call log, so one clone can be moved into a handler
/// while the test keeps another to assert with.
pub struct Spy<V> {
    calls: Rc<RefCell<Vec<V>>>,
}

impl<V> Clone for Spy<V> {
    fn clone(&self) -> Self {
        Self {
            calls: Rc::clone(&self.calls),
        }
    }
}

impl<V> Default for Spy<V> {
    fn default() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<V> Spy<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, value: V) {
        self.calls.borrow_mut().push(value);
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.borrow().len()
    }

    #[must_use]
    pub fn was_called(&self) -> bool {
        self.count() > 0
    }
}

impl<V: Clone> Spy<V> {
    /// Snapshot of the calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<V> {
        self.calls.borrow().clone()
    }
}

/// A [`Realm`] bound to a [`TurnQueue`] the test controls.
pub struct TestRealm {
    realm: Realm,
    queue: TurnQueue,
}

impl Default for TestRealm {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRealm {
    #[must_use]
    pub fn new() -> Self {
        let queue = TurnQueue::new();
        Self {
            realm: Realm::new(queue.clone()),
            queue,
        }
    }

    #[must_use]
    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// Runs a single queued turn. Returns false when nothing was queued.
    pub fn step(&self) -> bool {
        self.queue.run_one()
    }

    /// Runs turns until the queue goes idle. Returns how many ran.
    pub fn drain(&self) -> usize {
        self.queue.run_until_idle()
    }

    /// How many turns are currently queued.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
