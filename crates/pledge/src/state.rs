//! Shared promise state: the cell owned by a [`Deferred`](crate::Deferred) /
//! [`Promise`](crate::Promise) pair and the delivery passes that drain it.
//!
//! A cell is mutated only through its owning deferred; promise handles read
//! and append reactions. All delivery crosses the injected scheduler, so no
//! reaction ever runs in the turn that registered it or settled the cell.

use std::cell::RefCell;
use std::rc::Rc;
use std::task::Waker;

use smallvec::SmallVec;

use crate::sched::Schedule;

/// Where a promise is in its lifecycle. Transitions at most once away from
/// `Pending` and never changes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Not yet settled; reactions accumulate and progress flows.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a rejection reason.
    Rejected,
}

/// A recorded settlement. Rejection reasons are carried as-is and never
/// re-examined for thenable shape.
#[derive(Clone)]
pub(crate) enum Outcome<T, E> {
    Fulfilled(T),
    Rejected(E),
}

/// One registered subscription: the deliver closure consumes the settlement
/// exactly once, the progress closure forwards each notification downstream.
pub(crate) struct Reaction<T, E, N> {
    pub(crate) deliver: Box<dyn FnOnce(Outcome<T, E>)>,
    pub(crate) progress: Box<dyn FnMut(N)>,
}

pub(crate) struct Inner<T, E, N> {
    pub(crate) status: Status,
    pub(crate) outcome: Option<Outcome<T, E>>,
    pub(crate) pending: SmallVec<[Reaction<T, E, N>; 2]>,
    pub(crate) waker: Option<Waker>,
}

impl<T, E, N> Inner<T, E, N> {
    fn new() -> Self {
        Self {
            status: Status::Pending,
            outcome: None,
            pending: SmallVec::new(),
            waker: None,
        }
    }
}

pub(crate) type SharedInner<T, E, N> = Rc<RefCell<Inner<T, E, N>>>;

pub(crate) fn new_cell<T, E, N>() -> SharedInner<T, E, N> {
    Rc::new(RefCell::new(Inner::new()))
}

/// Queues a delivery pass for `cell` on the next turn.
pub(crate) fn schedule_drain<T, E, N>(cell: &SharedInner<T, E, N>, sched: &Rc<dyn Schedule>)
where
    T: Clone + 'static,
    E: Clone + 'static,
    N: 'static,
{
    let cell = Rc::clone(cell);
    sched.schedule(Box::new(move || drain(&cell)));
}

/// One delivery pass: snapshot-and-clear the reaction list, then hand each
/// reaction a clone of the settlement. Reactions registered while the pass
/// runs land in the freshly emptied list and are picked up by the pass their
/// registration scheduled.
pub(crate) fn drain<T: Clone, E: Clone, N>(cell: &SharedInner<T, E, N>) {
    let (outcome, reactions) = {
        let mut inner = cell.borrow_mut();
        let Some(outcome) = inner.outcome.clone() else {
            return;
        };
        if inner.pending.is_empty() {
            return;
        }
        (outcome, std::mem::take(&mut inner.pending))
    };
    tracing::trace!(reactions = reactions.len(), "delivery pass");
    for reaction in reactions {
        (reaction.deliver)(outcome.clone());
    }
}

/// One progress pass: runs every currently registered reaction's progress
/// closure with a clone of the update.
///
/// The list is taken out for the duration of the loop (a progress callback
/// may re-enter the cell by registering new reactions) and spliced back in
/// front of anything added meanwhile, preserving registration order. The
/// pending/settled check happened when the notification was queued; a
/// settlement that raced in since then does not retract an already queued
/// update.
pub(crate) fn deliver_progress<T, E, N: Clone>(cell: &SharedInner<T, E, N>, update: N) {
    let mut taken = std::mem::take(&mut cell.borrow_mut().pending);
    for reaction in &mut taken {
        (reaction.progress)(update.clone());
    }
    let mut inner = cell.borrow_mut();
    let added = std::mem::replace(&mut inner.pending, taken);
    inner.pending.extend(added);
}
