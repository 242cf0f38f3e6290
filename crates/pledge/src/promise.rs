//! The consumer half of a promise pair: chaining, inspection, and the
//! `Future` bridge.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::deferred::Deferred;
use crate::resolution::{Completion, Thenable};
use crate::sched::Schedule;
use crate::state::{schedule_drain, Outcome, Reaction, SharedInner, Status};

/// The read side of a promise: subscribe to the eventual outcome, observe
/// progress, and build derived promises.
///
/// Cloning yields another handle to the same settlement. Every handler runs
/// on a scheduler turn strictly after both its registration and the
/// settlement it observes; nothing here ever calls back synchronously.
pub struct Promise<T, E, N = ()> {
    cell: SharedInner<T, E, N>,
    sched: Rc<dyn Schedule>,
}

impl<T, E, N> Clone for Promise<T, E, N> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            sched: Rc::clone(&self.sched),
        }
    }
}

impl<T, E, N> Promise<T, E, N>
where
    T: Clone + 'static,
    E: Clone + 'static,
    N: Clone + 'static,
{
    pub(crate) fn from_parts(cell: SharedInner<T, E, N>, sched: Rc<dyn Schedule>) -> Self {
        Self { cell, sched }
    }

    /// Current lifecycle stage, without waiting.
    #[must_use]
    pub fn status(&self) -> Status {
        self.cell.borrow().status
    }

    /// The settlement, if one has landed. `None` while pending.
    #[must_use]
    pub fn settled(&self) -> Option<Result<T, E>> {
        self.cell.borrow().outcome.clone().map(|outcome| match outcome {
            Outcome::Fulfilled(value) => Ok(value),
            Outcome::Rejected(reason) => Err(reason),
        })
    }

    /// Registers a raw reaction. If the promise already settled, a fresh
    /// delivery pass is queued so the reaction still runs asynchronously.
    pub(crate) fn subscribe(
        &self,
        deliver: Box<dyn FnOnce(Outcome<T, E>)>,
        progress: Box<dyn FnMut(N)>,
    ) {
        let already_settled = {
            let mut inner = self.cell.borrow_mut();
            inner.pending.push(Reaction { deliver, progress });
            inner.status != Status::Pending
        };
        if already_settled {
            schedule_drain(&self.cell, &self.sched);
        }
    }

    /// The one chaining primitive: wires a downstream deferred to this
    /// promise through the three per-channel handlers.
    fn register<U>(
        &self,
        on_fulfilled: Box<dyn FnOnce(T) -> Completion<U, E, N>>,
        on_rejected: Box<dyn FnOnce(E) -> Completion<U, E, N>>,
        on_progress: Option<Box<dyn FnMut(N) -> Option<N>>>,
    ) -> Promise<U, E, N>
    where
        U: Clone + 'static,
    {
        let downstream = Deferred::with_scheduler(Rc::clone(&self.sched));
        let result = downstream.promise();
        let deliver = {
            let downstream = downstream.clone();
            Box::new(move |outcome: Outcome<T, E>| match outcome {
                Outcome::Fulfilled(value) => downstream.complete(on_fulfilled(value)),
                Outcome::Rejected(reason) => downstream.complete(on_rejected(reason)),
            })
        };
        let progress: Box<dyn FnMut(N)> = match on_progress {
            Some(mut transform) => Box::new(move |update| match transform(update) {
                Some(update) => downstream.notify(update),
                None => tracing::debug!("progress update swallowed by transform"),
            }),
            None => Box::new(move |update| downstream.notify(update)),
        };
        self.subscribe(deliver, progress);
        result
    }

    /// Chains a fulfillment handler. Rejections pass through untouched.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E, N>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Completion<U, E, N> + 'static,
    {
        self.register(Box::new(on_fulfilled), Box::new(Completion::Reject), None)
    }

    /// Chains both settlement handlers at once.
    pub fn then_else<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E, N>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Completion<U, E, N> + 'static,
        R: FnOnce(E) -> Completion<U, E, N> + 'static,
    {
        self.register(Box::new(on_fulfilled), Box::new(on_rejected), None)
    }

    /// Chains a rejection handler. Returning [`Completion::Value`] recovers
    /// the chain; returning [`Completion::Reject`] keeps it failing.
    /// Fulfillments pass through untouched.
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E, N>
    where
        R: FnOnce(E) -> Completion<T, E, N> + 'static,
    {
        self.register(Box::new(Completion::Value), Box::new(on_rejected), None)
    }

    /// Chains a progress transform. Each update the transform maps to
    /// `Some` flows to the derived promise's listeners; `None` swallows the
    /// update for this branch only. Settlements pass through untouched.
    pub fn progress<P>(&self, transform: P) -> Promise<T, E, N>
    where
        P: FnMut(N) -> Option<N> + 'static,
    {
        self.register(
            Box::new(Completion::Value),
            Box::new(Completion::Reject),
            Some(Box::new(transform)),
        )
    }

    /// Runs `on_settled` whichever way this promise settles, then re-surfaces
    /// the original outcome on the returned promise. Progress flows through.
    pub fn finally<F>(&self, on_settled: F) -> Promise<T, E, N>
    where
        F: FnOnce() + 'static,
    {
        let downstream = Deferred::with_scheduler(Rc::clone(&self.sched));
        let result = downstream.promise();
        let deliver = {
            let downstream = downstream.clone();
            Box::new(move |outcome: Outcome<T, E>| {
                on_settled();
                downstream.settle(outcome);
            })
        };
        self.subscribe(deliver, Box::new(move |update| downstream.notify(update)));
        result
    }

    /// Like [`finally`](Promise::finally), but the cleanup returns a promise
    /// that gates the chain: the original outcome is withheld until the gate
    /// fulfills, and a rejected gate replaces the outcome with its own
    /// rejection.
    pub fn finally_with<W, F>(&self, on_settled: F) -> Promise<T, E, N>
    where
        W: Clone + 'static,
        F: FnOnce() -> Promise<W, E, N> + 'static,
    {
        let downstream = Deferred::with_scheduler(Rc::clone(&self.sched));
        let result = downstream.promise();
        let deliver = {
            let downstream = downstream.clone();
            Box::new(move |outcome: Outcome<T, E>| {
                let gate = on_settled();
                gate.subscribe(
                    Box::new(move |gate_outcome: Outcome<W, E>| match gate_outcome {
                        Outcome::Fulfilled(_) => downstream.settle(outcome),
                        Outcome::Rejected(reason) => downstream.reject(reason),
                    }),
                    Box::new(|_| {}),
                );
            })
        };
        self.subscribe(deliver, Box::new(move |update| downstream.notify(update)));
        result
    }
}

impl<T, E, N> Thenable<T, E, N> for Promise<T, E, N>
where
    T: Clone + 'static,
    E: Clone + 'static,
    N: Clone + 'static,
{
    fn pipe_into(self: Box<Self>, target: Deferred<T, E, N>) {
        let notify_target = target.clone();
        self.subscribe(
            Box::new(move |outcome| match outcome {
                Outcome::Fulfilled(value) => target.resolve(value),
                Outcome::Rejected(reason) => target.reject(reason),
            }),
            Box::new(move |update| notify_target.notify(update)),
        );
    }
}

/// Awaiting a promise yields its settlement as a `Result`. Progress updates
/// are not observable through this bridge.
impl<T, E, N> Future for Promise<T, E, N>
where
    T: Clone + 'static,
    E: Clone + 'static,
    N: Clone + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.cell.borrow_mut();
        match inner.outcome.clone() {
            Some(Outcome::Fulfilled(value)) => Poll::Ready(Ok(value)),
            Some(Outcome::Rejected(reason)) => Poll::Ready(Err(reason)),
            None => {
                inner.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::Context;

    use futures::task::noop_waker;

    use crate::resolution::Completion;
    use crate::sched::TurnQueue;
    use crate::state::Status;
    use crate::Realm;

    fn setup() -> (Realm, TurnQueue) {
        let queue = TurnQueue::new();
        (Realm::new(queue.clone()), queue)
    }

    #[test]
    fn handlers_never_run_in_the_settling_turn() {
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
        deferred.resolve(7);
        assert!(calls.borrow().is_empty());
        queue.run_until_idle();
        assert_eq!(*calls.borrow(), vec![7]);
    }

    #[test]
    fn status_and_settled_expose_the_outcome() {
        let (realm, queue) = setup();
        let deferred = realm.defer::<i32, &str, ()>();
        let promise = deferred.promise();
        assert_eq!(promise.status(), Status::Pending);
        assert_eq!(promise.settled(), None);
        deferred.resolve(3);
        queue.run_until_idle();
        assert_eq!(promise.status(), Status::Fulfilled);
        assert_eq!(promise.settled(), Some(Ok(3)));
    }

    #[test]
    fn poll_is_pending_until_settlement() {
        let (realm, _queue) = setup();
        let deferred = realm.defer::<i32, &str, ()>();
        let mut promise = deferred.promise();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(Pin::new(&mut promise).poll(&mut cx).is_pending());
        deferred.resolve(9);
        assert_eq!(Pin::new(&mut promise).poll(&mut cx), std::task::Poll::Ready(Ok(9)));
    }

    #[test]
    fn settled_promise_awaits_to_a_result() {
        let (realm, _queue) = setup();
        let deferred = realm.defer::<i32, &str, ()>();
        deferred.reject("boom");
        let outcome = futures::executor::block_on(deferred.promise());
        assert_eq!(outcome, Err("boom"));
    }
}
