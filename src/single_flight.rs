//! Collapse concurrent calls onto one in-flight future.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};

/// The value a caller observed and whether its own call produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Flight<T> {
    pub value: T,
    /// `true` for the caller that started the work; followers get `false`.
    pub leader: bool,
}

/// At most one future runs at a time. Callers arriving while it runs await
/// the same result instead of starting their own.
pub struct SingleFlight<T: Clone> {
    slot: Mutex<Option<Shared<BoxFuture<'static, T>>>>,
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Shared<BoxFuture<'static, T>>>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().as_ref().is_some_and(|f| f.peek().is_none())
    }

    /// Join the in-flight call, or start one with `start`.
    ///
    /// `start` is invoked synchronously and only by the leader, so side
    /// effects that must happen once per real call belong inside it.
    pub async fn run<F, Fut>(&self, start: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (shared, leader) = {
            let mut slot = self.lock();
            match slot.as_ref().filter(|f| f.peek().is_none()) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let fresh = start().boxed().shared();
                    *slot = Some(fresh.clone());
                    (fresh, true)
                }
            }
        };

        let value = shared.clone().await;

        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&shared)) {
            *slot = None;
        }

        Flight { value, leader }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_call() {
        let flight = SingleFlight::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    7
                }
            }
        };

        let (a, b, c) = tokio::join!(
            flight.run(make(calls.clone())),
            flight.run(make(calls.clone())),
            flight.run(make(calls.clone())),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!([a.value, b.value, c.value], [7, 7, 7]);
        assert_eq!(
            [a.leader, b.leader, c.leader].iter().filter(|l| **l).count(),
            1
        );
        assert!(!flight.is_in_flight());
    }

    #[tokio::test]
    async fn test_sequential_calls_run_again() {
        let flight = SingleFlight::<usize>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=3 {
            let calls = calls.clone();
            let result = flight
                .run(move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { n }
                })
                .await;
            assert!(result.leader);
            assert_eq!(result.value, expected);
        }
    }
}
