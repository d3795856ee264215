use crate::{CounterRecord, CounterStore, Error, Result};
use core::{future::Future, time::Duration};

/// Wraps a [`CounterStore`] and bounds every operation with a
/// [`tokio::time::timeout`].
///
/// An operation that does not complete within the deadline resolves to
/// [`Error::StoreUnavailable`]. The inner operation may still have been
/// applied by the store; in that case the id it produced is lost. Gaps are
/// acceptable, duplicates are not, so the timeout is never retried here.
#[derive(Clone, Debug)]
pub struct TimeoutStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimeoutStore<S>
where
    S: CounterStore,
{
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// The per-operation deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                Error::store_unavailable(format!("{op} timed out after {:?}", self.timeout))
            })?
    }
}

impl<S> CounterStore for TimeoutStore<S>
where
    S: CounterStore,
{
    fn increment_if_exists(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<Option<CounterRecord>>> + Send {
        self.bounded(
            "increment_if_exists",
            self.inner.increment_if_exists(collection, key, delta),
        )
    }

    fn increment_upsert(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<CounterRecord>> + Send {
        self.bounded(
            "increment_upsert",
            self.inner.increment_upsert(collection, key, delta),
        )
    }
}
