//! Observable values: a current value plus change notification.

use tokio::sync::watch;

/// A value that can be read at any time and awaited for changes.
///
/// Subscribers only wake when the value actually changes.
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        let (tx, _) = watch::channel(value);
        Observable { tx }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replaces the value. Returns `true` if it changed.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Replaces the value only if `f` returns `true` for the current one.
    pub fn set_if(&self, value: T, f: impl FnOnce(&T) -> bool) -> bool {
        self.tx.send_if_modified(|current| {
            if f(current) && *current != value {
                *current = value;
                true
            } else {
                false
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Resolves once the value satisfies `pred`, immediately if it already does.
    pub async fn wait_for(&self, mut pred: impl FnMut(&T) -> bool) -> T {
        let mut rx = self.tx.subscribe();
        let matched = rx.wait_for(|value| pred(value)).await.map(|value| value.clone());
        // The sender lives in `self`, so the channel cannot close here.
        matched.unwrap_or_else(|_| self.get())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn set_reports_change_only_once() {
        let value = Observable::new(1);
        assert!(value.set(2));
        assert!(!value.set(2));
        assert_eq!(value.get(), 2);
    }

    #[test]
    fn set_if_respects_predicate() {
        let value = Observable::new("idle");
        assert!(!value.set_if("disposed", |v| *v == "busy"));
        assert!(value.set_if("disposed", |v| *v == "idle"));
        assert!(!value.set_if("disposed", |v| *v == "idle"));
    }

    #[tokio::test]
    async fn subscribers_skip_unchanged_writes() {
        let value = Observable::new(false);
        let mut rx = value.subscribe();
        value.set(false);
        assert!(!rx.has_changed().expect("sender alive"));
        value.set(true);
        assert!(rx.has_changed().expect("sender alive"));
    }

    #[tokio::test]
    async fn wait_for_is_pending_until_predicate_holds() {
        let value = Observable::new(0u32);
        let mut waiter = tokio_test::task::spawn(value.wait_for(|v| *v == 2));
        tokio_test::assert_pending!(waiter.poll());
        value.set(1);
        tokio_test::assert_pending!(waiter.poll());
        value.set(2);
        assert!(waiter.is_woken());
        assert_eq!(tokio_test::assert_ready!(waiter.poll()), 2);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn wait_for_resolves_on_later_change() {
        let value = Arc::new(Observable::new(0u32));
        let waiter = {
            let value = value.clone();
            tokio::spawn(async move { value.wait_for(|v| *v >= 3).await })
        };
        for n in 1..=3 {
            tokio::time::advance(Duration::from_millis(10)).await;
            value.set(n);
        }
        assert_eq!(waiter.await.expect("join"), 3);
    }
}
