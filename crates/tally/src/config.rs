use crate::{Error, Result};

/// Collection that holds counters when none is configured.
pub const DEFAULT_COLLECTION: &str = "tally_increment_ids";

/// First id handed out for a key when no starting value is configured.
pub const DEFAULT_STARTING_VALUE: u64 = 1;

/// Resolved, immutable configuration for one entity type's id sequence.
///
/// Built once at startup through [`GeneratorConfig::builder`] and passed by
/// reference into [`SequenceGenerator::next_id`]. Every field is validated up
/// front, so a config that exists is one the generator can use.
///
/// # Example
///
/// ```
/// use tally::{DEFAULT_COLLECTION, GeneratorConfig};
///
/// let config = GeneratorConfig::builder("orders").build().unwrap();
/// assert_eq!(config.collection(), DEFAULT_COLLECTION);
/// assert_eq!(config.key(), "orders");
/// assert_eq!(config.starting_value(), 1);
///
/// let config = GeneratorConfig::builder("invoices")
///     .collection("billing_ids")
///     .key("invoice")
///     .starting_value(1000)
///     .build()
///     .unwrap();
/// assert_eq!(config.key(), "invoice");
/// ```
///
/// [`SequenceGenerator::next_id`]: crate::SequenceGenerator::next_id
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeneratorConfig {
    collection: String,
    key: String,
    starting_value: u64,
}

impl GeneratorConfig {
    /// Starts a builder for an entity persisted under `storage_name`.
    ///
    /// The storage name becomes the counter key unless
    /// [`GeneratorConfigBuilder::key`] overrides it.
    pub fn builder(storage_name: impl Into<String>) -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::new(storage_name)
    }

    /// The store location holding this sequence's counter.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The logical counter key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The id handed out by the first allocation of a fresh key.
    pub fn starting_value(&self) -> u64 {
        self.starting_value
    }
}

/// Builder for [`GeneratorConfig`].
#[derive(Clone, Debug)]
pub struct GeneratorConfigBuilder {
    storage_name: String,
    collection: Option<String>,
    key: Option<String>,
    starting_value: u64,
}

impl GeneratorConfigBuilder {
    fn new(storage_name: impl Into<String>) -> Self {
        Self {
            storage_name: storage_name.into(),
            collection: None,
            key: None,
            starting_value: DEFAULT_STARTING_VALUE,
        }
    }

    /// Stores the counter in `collection` instead of [`DEFAULT_COLLECTION`].
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Uses `key` instead of the entity's storage name.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn starting_value(mut self, starting_value: u64) -> Self {
        self.starting_value = starting_value;
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the resolved key or collection is
    /// empty, or if the starting value is zero. A zero starting value would
    /// let two callers racing on a fresh key both receive `0`.
    pub fn build(self) -> Result<GeneratorConfig> {
        let key = self.key.unwrap_or(self.storage_name);
        if key.trim().is_empty() {
            return Err(Error::configuration("counter key must not be empty"));
        }

        let collection = self
            .collection
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_owned());
        if collection.trim().is_empty() {
            return Err(Error::configuration(format!(
                "collection for key `{key}` must not be empty"
            )));
        }

        if self.starting_value == 0 {
            return Err(Error::configuration(format!(
                "starting value for key `{key}` must be at least 1"
            )));
        }

        Ok(GeneratorConfig {
            collection,
            key,
            starting_value: self.starting_value,
        })
    }
}
