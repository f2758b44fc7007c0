//! Snapshot store.
//!
//! State lives behind an `Arc`; readers clone the pointer and never block
//! writers for longer than a pointer swap. Every change goes through a pure
//! [`Reducer`], one action at a time.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pure state transition.
pub trait Reducer: Clone {
    type Action: fmt::Debug;

    fn reduce(self, action: Self::Action) -> Self;
}

/// Request lifecycle shared by a store's asynchronous operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

pub struct Store<S> {
    name: &'static str,
    state: Mutex<Arc<S>>,
}

impl<S: Reducer> Store<S> {
    pub fn new(name: &'static str, initial: S) -> Self {
        Self {
            name,
            state: Mutex::new(Arc::new(initial)),
        }
    }

    pub fn snapshot(&self) -> Arc<S> {
        Arc::clone(&self.state.lock())
    }

    /// Apply one action. Actions are serialized by the lock, so concurrent
    /// dispatches from worker threads never interleave within a reduction.
    pub fn dispatch(&self, action: S::Action) {
        debug!(store = self.name, ?action, "dispatch");
        let mut guard = self.state.lock();
        let next = S::clone(&guard).reduce(action);
        *guard = Arc::new(next);
    }

    pub fn select<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.snapshot())
    }
}

impl<S: Reducer + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new("store", S::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter(i64);

    impl Reducer for Counter {
        type Action = i64;

        fn reduce(self, action: i64) -> Self {
            Counter(self.0 + action)
        }
    }

    #[test]
    fn snapshots_are_immutable() {
        let store = Store::new("counter", Counter::default());
        let before = store.snapshot();
        store.dispatch(5);
        assert_eq!(before.0, 0);
        assert_eq!(store.snapshot().0, 5);
        assert_eq!(store.select(|c| c.0 * 2), 10);
    }

    #[test]
    fn concurrent_dispatch_loses_nothing() {
        let store = Arc::new(Store::new("counter", Counter::default()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.dispatch(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.snapshot().0, 800);
    }
}
