use crate::domain::value_objects::Fingerprint;
use crate::shared::error::SyncError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

type SharedOp<T> = Shared<BoxFuture<'static, Result<T, Arc<SyncError>>>>;

/// Collapses concurrent identical operations onto a single in-flight
/// future, keyed by fingerprint.
///
/// While an operation is pending, every caller presenting the same
/// fingerprint joins it instead of running the factory again; the
/// factory's failure is shared with every joined caller. The registry
/// entry is removed exactly once, when the operation settles. If every
/// caller drops before completion the shared future stops being polled,
/// so abandoned work does not keep running in the background.
pub struct OperationDeduplicator<T: Clone> {
    in_flight: Arc<Mutex<HashMap<Fingerprint, SharedOp<T>>>>,
}

impl<T> OperationDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `factory` for this fingerprint, or join the identical
    /// operation already in flight. The factory is invoked at most once
    /// per fingerprint while one is pending.
    pub async fn dedupe<F, Fut>(
        &self,
        fingerprint: Fingerprint,
        factory: F,
    ) -> Result<T, Arc<SyncError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        let operation = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&fingerprint) {
                tracing::debug!(fingerprint = %fingerprint, "Joining in-flight operation");
                existing.clone()
            } else {
                let registry = Arc::clone(&self.in_flight);
                let key = fingerprint.clone();
                let work = factory();
                let operation = async move {
                    let result = work.await.map_err(Arc::new);
                    registry.lock().await.remove(&key);
                    result
                }
                .boxed()
                .shared();
                in_flight.insert(fingerprint, operation.clone());
                operation
            }
        };

        operation.await
    }

    /// Number of operations currently in flight.
    pub async fn in_flight_len(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

impl<T> Default for OperationDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fp(value: &str) -> Fingerprint {
        Fingerprint::parse(value).unwrap()
    }

    #[tokio::test]
    async fn concurrent_identical_calls_run_factory_once() {
        let dedup: OperationDeduplicator<String> = OperationDeduplicator::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        let factory = |counter: Arc<AtomicUsize>| {
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok("sent".to_string())
            }
        };

        let (a, b, c) = tokio::join!(
            dedup.dedupe(fp("send:hello"), factory(invocations.clone())),
            dedup.dedupe(fp("send:hello"), factory(invocations.clone())),
            dedup.dedupe(fp("send:hello"), factory(invocations.clone())),
        );

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), "sent");
        assert_eq!(b.unwrap(), "sent");
        assert_eq!(c.unwrap(), "sent");
        assert_eq!(dedup.in_flight_len().await, 0);
    }

    #[tokio::test]
    async fn distinct_fingerprints_run_independently() {
        let dedup: OperationDeduplicator<u32> = OperationDeduplicator::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        let factory = |counter: Arc<AtomicUsize>, value: u32| {
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(value)
            }
        };

        let (a, b) = tokio::join!(
            dedup.dedupe(fp("load:note-1"), factory(invocations.clone(), 1)),
            dedup.dedupe(fp("load:note-2"), factory(invocations.clone(), 2)),
        );

        assert_eq!(invocations.load(Ordering::SeqCst), 2);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
    }

    #[tokio::test]
    async fn failure_is_shared_and_entry_cleared() {
        let dedup: OperationDeduplicator<u32> = OperationDeduplicator::new();

        let failing = || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<u32, _>(SyncError::Network("connection reset".into()))
        };

        let (a, b) = tokio::join!(
            dedup.dedupe(fp("load:broken"), failing),
            dedup.dedupe(fp("load:broken"), failing),
        );

        let err_a = a.unwrap_err();
        let err_b = b.unwrap_err();
        assert!(matches!(*err_a, SyncError::Network(_)));
        assert!(Arc::ptr_eq(&err_a, &err_b));
        assert_eq!(dedup.in_flight_len().await, 0);
    }

    #[tokio::test]
    async fn settled_fingerprint_can_run_again() {
        let dedup: OperationDeduplicator<u32> = OperationDeduplicator::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let counter = invocations.clone();
            let result = dedup
                .dedupe(fp("refresh:list"), move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(result.unwrap(), 7);
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }
}
