//! Single-flight execution
//!
//! [`SingleFlight`] holds at most one pending operation. The first caller
//! installs it; callers arriving while it is pending await the same shared
//! result instead of starting their own. The slot is emptied by the
//! operation itself as soon as it completes, success or failure, so the next
//! caller after completion starts a fresh execution.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::trace;

type SharedResult<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// Outcome of joining a flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flight<T> {
    /// Result shared by every participant
    pub result: T,
    /// Whether this caller started the execution
    pub leader: bool,
}

/// Shared pending-result slot
pub struct SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    slot: Arc<Mutex<Option<SharedResult<T, E>>>>,
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self { slot: Arc::new(Mutex::new(None)) }
    }

    /// Whether an execution is currently pending
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Join the pending execution or start one with `start`
    ///
    /// `start` is only invoked when no execution is pending. It must build
    /// the future without awaiting anything; the future runs once and its
    /// result is cloned to every participant.
    pub async fn run<F, Fut>(&self, start: F) -> Flight<Result<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (pending, leader) = {
            let mut slot = self.slot.lock();
            if let Some(existing) = slot.as_ref() {
                (existing.clone(), false)
            } else {
                let release = Arc::clone(&self.slot);
                let operation = start();
                let shared = async move {
                    let result = operation.await;
                    release.lock().take();
                    result
                }
                .boxed()
                .shared();
                *slot = Some(shared.clone());
                (shared, true)
            }
        };

        trace!(leader, "joined single flight");
        Flight { result: pending.await, leader }
    }
}

impl<T, E> Default for SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight").field("in_flight", &self.in_flight()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let flight: SingleFlight<u32, String> = SingleFlight::new();
        let executions = Arc::new(AtomicUsize::new(0));
        let (release, gate) = oneshot::channel::<()>();
        let gate = gate.shared();

        let calls = (0..8).map(|_| {
            let executions = Arc::clone(&executions);
            let gate = gate.clone();
            flight.run(move || async move {
                executions.fetch_add(1, Ordering::SeqCst);
                let _ = gate.await;
                Ok(7)
            })
        });

        let joined = futures::future::join_all(calls);
        let released = async {
            tokio::task::yield_now().await;
            assert!(flight.in_flight());
            let _ = release.send(());
        };
        let (flights, ()) = tokio::join!(joined, released);

        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert!(flights.iter().all(|f| f.result == Ok(7)));
        assert_eq!(flights.iter().filter(|f| f.leader).count(), 1);
        assert!(!flight.in_flight());
    }

    #[tokio::test]
    async fn failure_is_shared_and_slot_is_cleared() {
        let flight: SingleFlight<u32, String> = SingleFlight::new();

        let first = flight.run(|| async { Err::<u32, _>("refused".to_string()) }).await;
        assert_eq!(first.result, Err("refused".to_string()));
        assert!(first.leader);
        assert!(!flight.in_flight());

        let second = flight.run(|| async { Ok(1) }).await;
        assert_eq!(second.result, Ok(1));
        assert!(second.leader);
    }
}
