use crate::{CounterStore, GeneratorConfig, Result};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Hands out unique, increasing ids from a shared [`CounterStore`].
///
/// The generator holds no id state of its own: every call goes to the store,
/// so any number of generators in any number of processes can share one
/// counter without issuing a duplicate. It never caches `current_value` and
/// never retries a failed store call.
///
/// ## Protocol
///
/// 1. **Fast path.** Atomically increment an existing counter by one, without
///    upsert. If a record comes back, its value is the id.
/// 2. **Slow path.** Only when the fast path matched nothing: atomically
///    increment by the starting value *with* upsert. Exactly one concurrent
///    upsert creates the record; any other lands on the created record as a
///    plain increment.
///
/// Incrementing and initializing the same field in one upsert is not
/// something document stores reliably support, which is why creation is a
/// separate step. Each step is atomic on its own, and every delta is at least
/// one, so every call observes a distinct post-update value.
///
/// Callers that race on a fresh key may receive non-adjacent ids (for
/// example `1` and `2` with a starting value of `1`, or `1000` and `2000`
/// with `1000`). They never receive the same id.
///
/// ## See Also
/// - [`IdAllocator`] to resolve configuration by entity type.
/// - [`TimeoutStore`] to bound each store round trip.
///
/// [`IdAllocator`]: crate::IdAllocator
/// [`TimeoutStore`]: crate::TimeoutStore
#[derive(Clone, Debug, Default)]
pub struct SequenceGenerator<S> {
    store: S,
}

impl<S> SequenceGenerator<S>
where
    S: CounterStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The store this generator allocates from.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Allocates the next id for the sequence described by `config`.
    ///
    /// Performs one store round trip when the counter exists and two when it
    /// is created by this call. The first allocation of a fresh key, without
    /// a concurrent racer, returns exactly [`GeneratorConfig::starting_value`].
    ///
    /// Dropping the returned future after the store applied an increment
    /// loses that id. The sequence then has a gap, never a duplicate.
    ///
    /// # Errors
    ///
    /// - [`Error::StoreUnavailable`] if the store could not be reached or
    ///   timed out. Nothing is retried.
    /// - [`Error::CounterOverflow`] if the counter cannot be incremented any
    ///   further.
    ///
    /// # Example
    ///
    /// ```
    /// use tally::{GeneratorConfig, MemoryCounterStore, SequenceGenerator};
    ///
    /// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    /// # rt.block_on(async {
    /// let generator = SequenceGenerator::new(MemoryCounterStore::new());
    /// let orders = GeneratorConfig::builder("orders").build().unwrap();
    ///
    /// assert_eq!(generator.next_id(&orders).await.unwrap(), 1);
    /// assert_eq!(generator.next_id(&orders).await.unwrap(), 2);
    /// # });
    /// ```
    ///
    /// [`Error::StoreUnavailable`]: crate::Error::StoreUnavailable
    /// [`Error::CounterOverflow`]: crate::Error::CounterOverflow
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip_all,
            fields(collection = config.collection(), key = config.key()),
            err
        )
    )]
    pub async fn next_id(&self, config: &GeneratorConfig) -> Result<u64> {
        let collection = config.collection();
        let key = config.key();

        if let Some(record) = self.store.increment_if_exists(collection, key, 1).await? {
            return Ok(record.current_value);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("counter missing, initializing");

        let starting_value = config.starting_value();
        let record = self
            .store
            .increment_upsert(collection, key, starting_value)
            .await?;

        // Creation stores exactly the starting value. Anything else means a
        // concurrent caller created the counter first and this upsert was an
        // ordinary increment on top of it.
        if record.current_value == starting_value {
            #[cfg(feature = "tracing")]
            tracing::info!(starting_value, "created counter");
            Ok(starting_value)
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                current_value = record.current_value,
                "counter created concurrently"
            );
            Ok(record.current_value)
        }
    }
}
