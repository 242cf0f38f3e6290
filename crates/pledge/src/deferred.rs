//! The producer half of a promise pair.

use std::rc::Rc;

use crate::promise::Promise;
use crate::resolution::{Completion, Resolution};
use crate::sched::Schedule;
use crate::state::{deliver_progress, new_cell, schedule_drain, Outcome, SharedInner, Status};

/// The write side of a promise: settles it once and streams progress while it
/// is still pending.
///
/// Cloning yields another handle to the same underlying promise. All
/// settlement methods are idempotent; whichever lands first wins and the rest
/// are silently ignored.
pub struct Deferred<T, E, N = ()> {
    cell: SharedInner<T, E, N>,
    sched: Rc<dyn Schedule>,
}

impl<T, E, N> Clone for Deferred<T, E, N> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            sched: Rc::clone(&self.sched),
        }
    }
}

impl<T, E, N> Deferred<T, E, N>
where
    T: Clone + 'static,
    E: Clone + 'static,
    N: Clone + 'static,
{
    pub(crate) fn with_scheduler(sched: Rc<dyn Schedule>) -> Self {
        Self {
            cell: new_cell(),
            sched,
        }
    }

    /// The read side of this pair. May be called any number of times; every
    /// returned handle observes the same settlement.
    #[must_use]
    pub fn promise(&self) -> Promise<T, E, N> {
        Promise::from_parts(Rc::clone(&self.cell), Rc::clone(&self.sched))
    }

    /// Fulfills with a value, or adopts the outcome of a thenable. Plain
    /// values convert via `Into`, so `resolve(v)` and
    /// `resolve(other.promise())` both read naturally. No-op once settled.
    ///
    /// A promise-valued promise resolved with a promise takes it as a plain
    /// value; adoption happens only when the thenable's item type matches
    /// this pair's value type.
    pub fn resolve<V>(&self, value: V)
    where
        V: Into<Resolution<T, E, N>>,
    {
        if self.cell.borrow().status != Status::Pending {
            return;
        }
        match value.into() {
            Resolution::Value(value) => self.settle(Outcome::Fulfilled(value)),
            Resolution::Thenable(thenable) => thenable.pipe_into(self.clone()),
        }
    }

    /// Rejects with a reason. No-op once settled.
    pub fn reject(&self, reason: E) {
        self.settle(Outcome::Rejected(reason));
    }

    /// Emits a progress update to every reaction currently registered.
    ///
    /// Dropped without effect when the promise has already settled or nobody
    /// is listening yet. The update itself is delivered on a later turn, so a
    /// notification queued just before `resolve` still reaches listeners.
    pub fn notify(&self, update: N) {
        {
            let inner = self.cell.borrow();
            if inner.status != Status::Pending || inner.pending.is_empty() {
                return;
            }
        }
        let cell = Rc::clone(&self.cell);
        self.sched.schedule(Box::new(move || deliver_progress(&cell, update)));
    }

    pub(crate) fn settle(&self, outcome: Outcome<T, E>) {
        let waker = {
            let mut inner = self.cell.borrow_mut();
            if inner.status != Status::Pending {
                return;
            }
            inner.status = match outcome {
                Outcome::Fulfilled(_) => Status::Fulfilled,
                Outcome::Rejected(_) => Status::Rejected,
            };
            tracing::trace!(status = ?inner.status, "promise settled");
            inner.outcome = Some(outcome);
            inner.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        schedule_drain(&self.cell, &self.sched);
    }

    /// Applies a handler's verdict to this pair.
    pub(crate) fn complete(&self, completion: Completion<T, E, N>) {
        match completion {
            Completion::Value(value) => self.resolve(Resolution::Value(value)),
            Completion::Reject(reason) => self.reject(reason),
            Completion::Chain(thenable) => {
                if self.cell.borrow().status == Status::Pending {
                    thenable.pipe_into(self.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::resolution::Completion;
    use crate::sched::TurnQueue;
    use crate::state::Status;
    use crate::Realm;

    fn setup() -> (Realm, TurnQueue) {
        let queue = TurnQueue::new();
        (Realm::new(queue.clone()), queue)
    }

    #[test]
    fn first_resolution_wins() {
        let (realm, queue) = setup();
        let deferred = realm.defer::<i32, &str, ()>();
        let calls = Rc::new(RefCell::new(Vec::new()));
        {
            let calls = Rc::clone(&calls);
            deferred.promise().then(move |v| {
                calls.borrow_mut().push(v);
                Completion::value(v)
            });
        }
        deferred.resolve(1);
        deferred.resolve(2);
        deferred.reject("late");
        queue.run_until_idle();
        assert_eq!(*calls.borrow(), vec![1]);
        assert_eq!(deferred.promise().status(), Status::Fulfilled);
    }

    #[test]
    fn rejection_is_final() {
        let (realm, queue) = setup();
        let deferred = realm.defer::<i32, &str, ()>();
        deferred.reject("boom");
        deferred.resolve(1);
        queue.run_until_idle();
        assert_eq!(deferred.promise().status(), Status::Rejected);
        assert_eq!(deferred.promise().settled(), Some(Err("boom")));
    }

    #[test]
    fn notify_without_listeners_is_dropped() {
        let (realm, queue) = setup();
        let deferred = realm.defer::<i32, &str, String>();
        deferred.notify("nobody home".to_string());
        assert_eq!(queue.run_until_idle(), 0);
    }

    #[test]
    fn notify_after_settlement_is_dropped() {
        let (realm, queue) = setup();
        let deferred = realm.defer::<i32, &str, String>();
        let updates = Rc::new(RefCell::new(Vec::new()));
        {
            let updates = Rc::clone(&updates);
            deferred.promise().progress(move |n: String| {
                updates.borrow_mut().push(n.clone());
                Some(n)
            });
        }
        deferred.resolve(1);
        queue.run_until_idle();
        deferred.notify("too late".to_string());
        queue.run_until_idle();
        assert!(updates.borrow().is_empty());
    }
}
