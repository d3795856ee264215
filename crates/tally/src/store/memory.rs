use crate::{CounterRecord, CounterStore, Error, Result};
use core::future::{Future, ready};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

type Collections = HashMap<String, HashMap<String, u64>>;

/// An in-process [`CounterStore`] keeping every collection in a shared map.
///
/// Every operation takes a single mutex for its whole read-modify-write, which
/// gives the same per-document atomicity a real document store provides.
/// Cloning the store is cheap and clones share state, so a clone handed to
/// another task or generator observes the same counters.
///
/// This store is not persistent and not shared across processes. It is meant
/// for tests, tooling and single-process deployments.
///
/// # Example
///
/// ```
/// use tally::{CounterStore, MemoryCounterStore};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let store = MemoryCounterStore::new();
/// assert_eq!(store.increment_if_exists("ids", "orders", 1).await.unwrap(), None);
///
/// let record = store.increment_upsert("ids", "orders", 10).await.unwrap();
/// assert_eq!(record.current_value, 10);
/// assert_eq!(store.get("ids", "orders").unwrap().current_value, 10);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryCounterStore {
    collections: Arc<Mutex<Collections>>,
}

impl MemoryCounterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state of a counter without modifying it.
    pub fn get(&self, collection: &str, key: &str) -> Option<CounterRecord> {
        let collections = self.collections.lock();
        collections
            .get(collection)?
            .get(key)
            .map(|&value| CounterRecord::new(key, value))
    }

    /// Returns every counter in `collection`, sorted by key.
    pub fn records(&self, collection: &str) -> Vec<CounterRecord> {
        let collections = self.collections.lock();
        let mut records: Vec<_> = collections
            .get(collection)
            .into_iter()
            .flatten()
            .map(|(key, &value)| CounterRecord::new(key.as_str(), value))
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    /// Total number of counters across all collections.
    pub fn len(&self) -> usize {
        self.collections.lock().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
        upsert: bool,
    ) -> Result<Option<CounterRecord>> {
        let mut collections = self.collections.lock();

        let current = collections.get(collection).and_then(|c| c.get(key)).copied();
        let next = match current {
            Some(value) => value.checked_add(delta).ok_or_else(|| Error::CounterOverflow {
                collection: collection.to_owned(),
                key: key.to_owned(),
            })?,
            None if upsert => delta,
            None => return Ok(None),
        };

        collections
            .entry(collection.to_owned())
            .or_default()
            .insert(key.to_owned(), next);

        Ok(Some(CounterRecord::new(key, next)))
    }
}

impl CounterStore for MemoryCounterStore {
    fn increment_if_exists(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<Option<CounterRecord>>> + Send {
        ready(self.apply(collection, key, delta, false))
    }

    fn increment_upsert(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<CounterRecord>> + Send {
        let result = self.apply(collection, key, delta, true).and_then(|record| {
            // An upsert always matches or creates a record.
            record.ok_or_else(|| Error::store_unavailable("upsert did not produce a record"))
        });
        ready(result)
    }
}
