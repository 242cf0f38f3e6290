//! Value-or-thenable conversions at the two seams where they occur: resolving
//! a deferred and returning from a handler.

use crate::deferred::Deferred;
use crate::promise::Promise;

/// Something a deferred can adopt the outcome of.
///
/// `pipe_into` must eventually settle `target` the way `self` settles, and
/// should forward progress notifications along the way. [`Promise`]
/// implements this; foreign pending-value types can too, which is how they
/// participate in [`Deferred::resolve`] and [`Completion::chain`].
pub trait Thenable<T, E, N = ()> {
    fn pipe_into(self: Box<Self>, target: Deferred<T, E, N>);
}

/// What a deferred can be resolved with: a plain value, or a thenable whose
/// outcome it adopts.
pub enum Resolution<T, E, N = ()> {
    Value(T),
    Thenable(Box<dyn Thenable<T, E, N>>),
}

impl<T, E, N> From<T> for Resolution<T, E, N> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T, E, N> From<Promise<T, E, N>> for Resolution<T, E, N>
where
    T: Clone + 'static,
    E: Clone + 'static,
    N: Clone + 'static,
{
    fn from(promise: Promise<T, E, N>) -> Self {
        Self::Thenable(Box::new(promise))
    }
}

/// What a settlement handler returns, deciding how the downstream promise
/// settles: fulfill with a value, reject with a reason, or wait on another
/// thenable. `Reject` is how a handler signals failure; returning it from a
/// rejection handler keeps the chain rejected, returning `Value` recovers.
pub enum Completion<T, E, N = ()> {
    Value(T),
    Reject(E),
    Chain(Box<dyn Thenable<T, E, N>>),
}

impl<T, E, N> Completion<T, E, N> {
    pub fn value(value: T) -> Self {
        Self::Value(value)
    }

    pub fn reject(reason: E) -> Self {
        Self::Reject(reason)
    }

    pub fn chain(thenable: impl Thenable<T, E, N> + 'static) -> Self {
        Self::Chain(Box::new(thenable))
    }
}

impl<T, E, N> From<Resolution<T, E, N>> for Completion<T, E, N> {
    fn from(resolution: Resolution<T, E, N>) -> Self {
        match resolution {
            Resolution::Value(value) => Self::Value(value),
            Resolution::Thenable(thenable) => Self::Chain(thenable),
        }
    }
}
