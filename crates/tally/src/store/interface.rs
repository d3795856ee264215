use crate::Result;
use core::future::Future;
use std::sync::Arc;

/// The state of a single counter, as returned by the store after an update.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterRecord {
    /// Unique identity of the counter within its collection.
    pub key: String,
    /// The last identifier issued for this key.
    pub current_value: u64,
}

impl CounterRecord {
    pub fn new(key: impl Into<String>, current_value: u64) -> Self {
        Self {
            key: key.into(),
            current_value,
        }
    }
}

/// The client contract a shared counter store must fulfil.
///
/// A store holds one [`CounterRecord`] per `(collection, key)` and exposes two
/// primitive operations. Both must be atomic with respect to every other
/// caller hitting the same key, possibly from other processes or machines,
/// and both must return the record as it is *after* the update.
///
/// Stores are never asked to combine "increment" and "create if absent" with
/// an initial value in one write. Document stores commonly reject updating
/// and implicitly initializing the same field in a single upsert, so
/// [`SequenceGenerator`] drives the two-phase protocol on top of these
/// primitives instead.
///
/// Transport and timeout failures must be reported as
/// [`Error::StoreUnavailable`]. A store must not apply a partial update: each
/// operation either happens completely or not at all.
///
/// [`SequenceGenerator`]: crate::SequenceGenerator
/// [`Error::StoreUnavailable`]: crate::Error::StoreUnavailable
pub trait CounterStore: Send + Sync {
    /// Atomically adds `delta` to the counter at `key`, but only if a record
    /// holding a current value already exists. Never creates a record.
    ///
    /// Returns `Ok(None)` when nothing matched. "No match" is not an error.
    fn increment_if_exists(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<Option<CounterRecord>>> + Send;

    /// Atomically adds `delta` to the counter at `key`, creating the record
    /// with a value of `delta` if it does not exist yet.
    fn increment_upsert(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<CounterRecord>> + Send;
}

impl<S> CounterStore for &S
where
    S: CounterStore,
{
    fn increment_if_exists(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<Option<CounterRecord>>> + Send {
        (**self).increment_if_exists(collection, key, delta)
    }

    fn increment_upsert(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<CounterRecord>> + Send {
        (**self).increment_upsert(collection, key, delta)
    }
}

impl<S> CounterStore for Arc<S>
where
    S: CounterStore,
{
    fn increment_if_exists(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<Option<CounterRecord>>> + Send {
        (**self).increment_if_exists(collection, key, delta)
    }

    fn increment_upsert(
        &self,
        collection: &str,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<CounterRecord>> + Send {
        (**self).increment_upsert(collection, key, delta)
    }
}
