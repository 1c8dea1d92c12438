// src/store.rs
//! Immutable-snapshot store driven by a reducer

use std::sync::Arc;
use tokio::sync::watch;

/// State that evolves only through events.
pub trait Reducer: Clone + Send + Sync + 'static {
    type Event;
    type Error;

    fn reduce(&mut self, event: Self::Event) -> Result<(), Self::Error>;
}

/// Shared handle to a reducer-driven state.
///
/// Every clone points at the same state. A dispatch runs the reducer on a copy
/// and only commits it when the reducer succeeds, so rejected events never
/// leave partial changes behind. Subscribers are woken on each commit.
pub struct Store<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S: Reducer> Store<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> S {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    pub fn dispatch(&self, event: S::Event) -> Result<(), S::Error> {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|state| {
            let mut next = state.clone();
            match next.reduce(event) {
                Ok(()) => {
                    *state = next;
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: i32,
        history: Vec<i32>,
    }

    impl Reducer for Counter {
        type Event = i32;
        type Error = String;

        fn reduce(&mut self, delta: i32) -> Result<(), String> {
            self.history.push(delta);
            if self.value + delta < 0 {
                return Err("negative".to_string());
            }
            self.value += delta;
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_commits_on_success() {
        let store = Store::new(Counter::default());
        store.dispatch(3).unwrap();
        store.dispatch(2).unwrap();
        assert_eq!(store.snapshot().value, 5);
        assert_eq!(store.snapshot().history, vec![3, 2]);
    }

    #[test]
    fn test_rejected_event_leaves_state_untouched() {
        let store = Store::new(Counter::default());
        store.dispatch(1).unwrap();
        assert_eq!(store.dispatch(-5), Err("negative".to_string()));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.value, 1);
        assert_eq!(snapshot.history, vec![1]);
    }

    #[test]
    fn test_clones_share_state() {
        let store = Store::new(Counter::default());
        let other = store.clone();
        other.dispatch(4).unwrap();
        assert_eq!(store.snapshot().value, 4);
    }

    #[tokio::test]
    async fn test_subscribers_see_commits_only() {
        let store = Store::new(Counter::default());
        let mut rx = store.subscribe();

        let _ = store.dispatch(-1);
        assert!(!rx.has_changed().unwrap());

        store.dispatch(7).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().value, 7);
    }
}
