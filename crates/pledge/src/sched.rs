//! Turn scheduling.
//!
//! Every callback the engine runs is handed to a [`Schedule`] implementation
//! and executes on a later turn, never inline. Two implementations ship here:
//! [`TurnQueue`], a deterministic in-process FIFO that tests pump by hand, and
//! [`TokioScheduler`], which feeds a [`TurnLoop`] over a tokio unbounded
//! channel for use inside a current-thread runtime.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tokio::sync::mpsc;

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce()>;

/// Accepts jobs to run on a strictly later turn, in submission order.
pub trait Schedule {
    fn schedule(&self, job: Job);
}

/// A manually pumped FIFO job queue.
///
/// Cloning yields another handle to the same queue. Nothing runs until the
/// owner calls [`run_one`](TurnQueue::run_one) or
/// [`run_until_idle`](TurnQueue::run_until_idle), which makes interleavings
/// fully deterministic.
#[derive(Clone, Default)]
pub struct TurnQueue {
    jobs: Rc<RefCell<VecDeque<Job>>>,
}

impl TurnQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.borrow().is_empty()
    }

    /// Runs the job at the head of the queue. Returns false if the queue was
    /// empty.
    pub fn run_one(&self) -> bool {
        let job = self.jobs.borrow_mut().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs jobs until the queue is empty, including jobs queued by the jobs
    /// themselves. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl Schedule for TurnQueue {
    fn schedule(&self, job: Job) {
        self.jobs.borrow_mut().push_back(job);
    }
}

/// Scheduler half of a tokio-backed turn loop. See [`turn_loop`].
#[derive(Clone)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Job>,
}

impl Schedule for TokioScheduler {
    fn schedule(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::warn!("turn loop dropped; discarding scheduled callback");
        }
    }
}

/// Executor half of a tokio-backed turn loop. See [`turn_loop`].
pub struct TurnLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl TurnLoop {
    /// Runs jobs as they arrive until every [`TokioScheduler`] handle has
    /// been dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            job();
        }
    }

    /// Runs every job already submitted without waiting for more. Returns
    /// how many ran.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

/// Creates a connected scheduler/executor pair. Jobs are not `Send`, so the
/// loop must run where its jobs were scheduled, e.g. inside a
/// current-thread runtime or a `LocalSet`.
#[must_use]
pub fn turn_loop() -> (TokioScheduler, TurnLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TokioScheduler { tx }, TurnLoop { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_queue_runs_in_fifo_order() {
        let queue = TurnQueue::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for label in ["a", "b", "c"] {
            let seen = Rc::clone(&seen);
            queue.schedule(Box::new(move || seen.borrow_mut().push(label)));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn turn_queue_picks_up_jobs_queued_mid_run() {
        let queue = TurnQueue::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let inner_queue = queue.clone();
            let seen = Rc::clone(&seen);
            queue.schedule(Box::new(move || {
                seen.borrow_mut().push("outer");
                let seen = Rc::clone(&seen);
                inner_queue.schedule(Box::new(move || seen.borrow_mut().push("inner")));
            }));
        }
        assert_eq!(queue.run_until_idle(), 2);
        assert_eq!(*seen.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn run_one_on_empty_queue_reports_idle() {
        let queue = TurnQueue::new();
        assert!(!queue.run_one());
    }

    #[test]
    fn tokio_pair_drains_submitted_jobs() {
        let (sched, mut turns) = turn_loop();
        let hits = Rc::new(RefCell::new(0));
        for _ in 0..3 {
            let hits = Rc::clone(&hits);
            sched.schedule(Box::new(move || *hits.borrow_mut() += 1));
        }
        assert_eq!(turns.drain(), 3);
        assert_eq!(*hits.borrow(), 3);
        assert_eq!(turns.drain(), 0);
    }

    #[test]
    fn scheduling_after_loop_dropped_is_silent() {
        let (sched, turns) = turn_loop();
        drop(turns);
        sched.schedule(Box::new(|| panic!("must not run")));
    }

    #[tokio::test]
    async fn tokio_loop_runs_until_schedulers_drop() {
        let (sched, turns) = turn_loop();
        let hits = Rc::new(RefCell::new(0));
        {
            let hits = Rc::clone(&hits);
            sched.schedule(Box::new(move || *hits.borrow_mut() += 1));
        }
        drop(sched);
        turns.run().await;
        assert_eq!(*hits.borrow(), 1);
    }
}
