use crate::{CounterStore, GeneratorConfig, GeneratorRegistry, Result, SequenceGenerator};

/// Caller-facing entry point: allocates ids by entity type.
///
/// An allocator owns one [`SequenceGenerator`] and the [`GeneratorRegistry`]
/// describing which counter each entity type draws from. The registry lives
/// exactly as long as its allocator, so two allocators over the same store
/// never share configuration implicitly.
///
/// # Example
///
/// ```
/// use tally::{GeneratorConfig, GeneratorRegistry, IdAllocator, MemoryCounterStore};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let registry = GeneratorRegistry::builder()
///     .register("Order", GeneratorConfig::builder("orders").build()?)?
///     .register("Invoice", GeneratorConfig::builder("invoices").build()?)?
///     .build();
/// let allocator = IdAllocator::new(MemoryCounterStore::new(), registry);
///
/// assert_eq!(allocator.next_id("Order").await?, 1);
/// assert_eq!(allocator.next_id("Order").await?, 2);
/// assert_eq!(allocator.next_id("Invoice").await?, 1);
/// # Ok::<(), tally::Error>(())
/// # }).unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct IdAllocator<S> {
    generator: SequenceGenerator<S>,
    registry: GeneratorRegistry,
}

impl<S> IdAllocator<S>
where
    S: CounterStore,
{
    pub fn new(store: S, registry: GeneratorRegistry) -> Self {
        Self {
            generator: SequenceGenerator::new(store),
            registry,
        }
    }

    /// Allocates the next id for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredEntity`] without touching the store if
    /// `entity` has no configuration, otherwise whatever
    /// [`SequenceGenerator::next_id`] returns.
    ///
    /// [`Error::UnregisteredEntity`]: crate::Error::UnregisteredEntity
    pub async fn next_id(&self, entity: &str) -> Result<u64> {
        let config = self.registry.resolve(entity)?;
        self.generator.next_id(config).await
    }

    /// The configuration `entity` allocates from, if registered.
    pub fn config(&self, entity: &str) -> Option<&GeneratorConfig> {
        self.registry.get(entity)
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    pub fn generator(&self) -> &SequenceGenerator<S> {
        &self.generator
    }

    pub fn store(&self) -> &S {
        self.generator.store()
    }
}
