//! # Pledge
//!
//! A deferred-value engine with three channels: a producer settles a value or
//! a rejection exactly once, and may stream progress updates while the
//! outcome is still open.
//!
//! ## Core Concepts
//!
//! Pledge separates **producing** an outcome from **consuming** it:
//! - [`Deferred`] = the write side (resolve, reject, notify)
//! - [`Promise`] = the read side (then, catch, progress, finally)
//!
//! The key principle: **every callback runs on a later turn**. Handlers never
//! run inside the call that registered them or the call that settled the
//! promise, no matter which came first.
//!
//! ## Architecture
//!
//! ```text
//! Realm (binds one Schedule)
//!     │
//!     ▼ defer()
//! Deferred ──resolve/reject──► shared cell ◄──then/catch── Promise
//!     │                            │
//!     │ notify()                   │ settle / progress passes
//!     ▼                            ▼
//! Schedule::schedule() ──────► turn queue ──► reactions run, one turn later
//!                                             │
//!                                             └─► downstream Deferred
//!                                                 (next link of the chain)
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Settlement is final** - the first `resolve` or `reject` wins, the
//!    rest are silently ignored
//! 2. **Delivery is asynchronous** - reactions always cross the scheduler,
//!    even when the promise settled long ago
//! 3. **Delivery is exactly-once** - each registered reaction sees the
//!    settlement one time
//! 4. **Chains are typed** - handlers return a [`Completion`], so recovery
//!    and failure stay visible in the signature
//! 5. **Progress is best-effort** - updates only reach reactions that were
//!    registered when the update was queued, and a swallowed update
//!    ([`None`] from a transform) stops for that branch only
//!
//! ## Example
//!
//! ```
//! use pledge::{Completion, Realm, TurnQueue};
//!
//! let queue = TurnQueue::new();
//! let realm = Realm::new(queue.clone());
//!
//! let deferred = realm.defer::<i32, String, ()>();
//! let doubled = deferred
//!     .promise()
//!     .then(|v| Completion::value(v * 2));
//!
//! deferred.resolve(21);
//! queue.run_until_idle();
//! assert_eq!(doubled.settled(), Some(Ok(42)));
//! ```
//!
//! For integration with async code, [`turn_loop`] provides a tokio-backed
//! scheduler, and [`Promise`] implements [`std::future::Future`] with
//! `Output = Result<T, E>`.

mod deferred;
mod error;
mod promise;
mod realm;
mod resolution;
mod sched;
mod state;


pub use crate::deferred::Deferred;
pub use crate::error::Reason;
pub use crate::promise::Promise;
pub use crate::realm::Realm;
pub use crate::resolution::{Completion, Resolution, Thenable};
pub use crate::sched::{turn_loop, Job, Schedule, TokioScheduler, TurnLoop, TurnQueue};
pub use crate::state::Status;
