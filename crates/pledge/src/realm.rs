//! The entry-point surface: a [`Realm`] binds a scheduler once and hands out
//! deferreds, wrapped values, and aggregates that all share it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::deferred::Deferred;
use crate::promise::Promise;
use crate::resolution::Resolution;
use crate::sched::Schedule;
use crate::state::Outcome;

/// A promise factory bound to one scheduler.
///
/// Everything minted here delivers its callbacks through the same turn
/// queue, which is what keeps cross-promise ordering deterministic. Cloning
/// shares the scheduler binding.
#[derive(Clone)]
pub struct Realm {
    sched: Rc<dyn Schedule>,
}

impl Realm {
    pub fn new(sched: impl Schedule + 'static) -> Self {
        Self {
            sched: Rc::new(sched),
        }
    }

    /// A fresh pending deferred/promise pair.
    #[must_use]
    pub fn defer<T, E, N>(&self) -> Deferred<T, E, N>
    where
        T: Clone + 'static,
        E: Clone + 'static,
        N: Clone + 'static,
    {
        Deferred::with_scheduler(Rc::clone(&self.sched))
    }

    /// Runs `resolver` synchronously with the write side of a fresh pair and
    /// returns the read side. A panic in `resolver` propagates to the caller
    /// unchanged rather than rejecting the promise.
    pub fn promise<T, E, N, F>(&self, resolver: F) -> Promise<T, E, N>
    where
        T: Clone + 'static,
        E: Clone + 'static,
        N: Clone + 'static,
        F: FnOnce(Deferred<T, E, N>),
    {
        let deferred = self.defer();
        let promise = deferred.promise();
        resolver(deferred);
        promise
    }

    /// An already rejected promise.
    #[must_use]
    pub fn reject<T, E, N>(&self, reason: E) -> Promise<T, E, N>
    where
        T: Clone + 'static,
        E: Clone + 'static,
        N: Clone + 'static,
    {
        let deferred = self.defer();
        deferred.reject(reason);
        deferred.promise()
    }

    /// Wraps a value or thenable as a promise on this realm's scheduler.
    /// Handlers attached to the result run asynchronously even when the
    /// input was a plain value.
    #[must_use]
    pub fn when<T, E, N, V>(&self, value: V) -> Promise<T, E, N>
    where
        T: Clone + 'static,
        E: Clone + 'static,
        N: Clone + 'static,
        V: Into<Resolution<T, E, N>>,
    {
        let deferred = self.defer();
        deferred.resolve(value);
        deferred.promise()
    }

    /// Alias for [`when`](Realm::when).
    #[must_use]
    pub fn resolve<T, E, N, V>(&self, value: V) -> Promise<T, E, N>
    where
        T: Clone + 'static,
        E: Clone + 'static,
        N: Clone + 'static,
        V: Into<Resolution<T, E, N>>,
    {
        self.when(value)
    }

    /// Resolves every entry and fulfills with their values in entry order
    /// once all of them fulfill. The first rejection rejects the aggregate
    /// with that reason; outcomes of the remaining entries are ignored. An
    /// empty input fulfills with an empty `Vec` on the next turn.
    #[must_use]
    pub fn all<T, E, N, I>(&self, entries: I) -> Promise<Vec<T>, E, N>
    where
        T: Clone + 'static,
        E: Clone + 'static,
        N: Clone + 'static,
        I: IntoIterator,
        I::Item: Into<Resolution<T, E, N>>,
    {
        let done = self.defer::<Vec<T>, E, N>();
        let result = done.promise();
        let slots: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new(Vec::new()));
        let outstanding = Rc::new(Cell::new(0usize));
        for (index, entry) in entries.into_iter().enumerate() {
            slots.borrow_mut().push(None);
            outstanding.set(outstanding.get() + 1);
            let done = done.clone();
            let slots = Rc::clone(&slots);
            let outstanding = Rc::clone(&outstanding);
            let entry: Promise<T, E, N> = self.when(entry);
            entry.subscribe(
                Box::new(move |outcome| match outcome {
                    Outcome::Fulfilled(value) => {
                        slots.borrow_mut()[index] = Some(value);
                        outstanding.set(outstanding.get() - 1);
                        if outstanding.get() == 0 {
                            let values: Vec<T> =
                                slots.borrow_mut().drain(..).flatten().collect();
                            done.resolve(values);
                        }
                    }
                    Outcome::Rejected(reason) => done.reject(reason),
                }),
                Box::new(|_| {}),
            );
        }
        if outstanding.get() == 0 {
            done.resolve(Vec::<T>::new());
        }
        result
    }

    /// [`all`](Realm::all) over keyed entries: fulfills with a map from each
    /// key to its entry's value.
    #[must_use]
    pub fn all_keyed<K, T, E, N, I, V>(&self, entries: I) -> Promise<BTreeMap<K, T>, E, N>
    where
        K: Ord + Clone + 'static,
        T: Clone + 'static,
        E: Clone + 'static,
        N: Clone + 'static,
        I: IntoIterator<Item = (K, V)>,
        V: Into<Resolution<T, E, N>>,
    {
        let done = self.defer::<BTreeMap<K, T>, E, N>();
        let result = done.promise();
        let slots: Rc<RefCell<BTreeMap<K, T>>> = Rc::new(RefCell::new(BTreeMap::new()));
        let outstanding = Rc::new(Cell::new(0usize));
        for (key, entry) in entries {
            outstanding.set(outstanding.get() + 1);
            let done = done.clone();
            let slots = Rc::clone(&slots);
            let outstanding = Rc::clone(&outstanding);
            let entry: Promise<T, E, N> = self.when(entry);
            entry.subscribe(
                Box::new(move |outcome| match outcome {
                    Outcome::Fulfilled(value) => {
                        slots.borrow_mut().insert(key, value);
                        outstanding.set(outstanding.get() - 1);
                        if outstanding.get() == 0 {
                            let values = std::mem::take(&mut *slots.borrow_mut());
                            done.resolve(values);
                        }
                    }
                    Outcome::Rejected(reason) => done.reject(reason),
                }),
                Box::new(|_| {}),
            );
        }
        if outstanding.get() == 0 {
            done.resolve(BTreeMap::<K, T>::new());
        }
        result
    }
}
