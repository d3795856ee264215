use crate::{Error, GeneratorConfig, Result};
use std::collections::HashMap;

/// Maps entity types to the [`GeneratorConfig`] their ids are drawn from.
///
/// The registry is assembled once through [`RegistryBuilder`] (or, with the
/// `serde` feature, from a declarative [`RegistryConfig`]) and cannot be
/// modified afterwards. Lookups are plain map reads, so a registry can be
/// shared freely between tasks.
#[derive(Clone, Debug, Default)]
pub struct GeneratorRegistry {
    configs: HashMap<String, GeneratorConfig>,
}

impl GeneratorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Returns the configuration registered for `entity`, if any.
    pub fn get(&self, entity: &str) -> Option<&GeneratorConfig> {
        self.configs.get(entity)
    }

    /// Like [`Self::get`], but reports a missing entity as
    /// [`Error::UnregisteredEntity`].
    pub fn resolve(&self, entity: &str) -> Result<&GeneratorConfig> {
        self.get(entity).ok_or_else(|| Error::UnregisteredEntity {
            entity: entity.to_owned(),
        })
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.configs.contains_key(entity)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Iterates over `(entity, config)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneratorConfig)> {
        self.configs
            .iter()
            .map(|(entity, config)| (entity.as_str(), config))
    }
}

/// Collects entity configurations before freezing them into a
/// [`GeneratorRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    configs: HashMap<String, GeneratorConfig>,
}

impl RegistryBuilder {
    /// Registers `config` for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the entity name is empty or the
    /// entity was already registered.
    pub fn register(mut self, entity: impl Into<String>, config: GeneratorConfig) -> Result<Self> {
        let entity = entity.into();
        if entity.trim().is_empty() {
            return Err(Error::configuration("entity type must not be empty"));
        }
        if self.configs.contains_key(&entity) {
            return Err(Error::configuration(format!(
                "entity `{entity}` is registered twice"
            )));
        }
        self.configs.insert(entity, config);
        Ok(self)
    }

    pub fn build(self) -> GeneratorRegistry {
        GeneratorRegistry {
            configs: self.configs,
        }
    }
}

/// Declarative form of a [`GeneratorRegistry`], typically read from a config
/// file.
///
/// ```json
/// {
///   "collection": "shop_ids",
///   "entities": {
///     "Order": { "storage_name": "orders" },
///     "Invoice": { "key": "inv", "starting_value": 1000 }
///   }
/// }
/// ```
///
/// A per-entity `collection` overrides the top-level one, which in turn
/// overrides [`DEFAULT_COLLECTION`]. `storage_name` defaults to the entity
/// name and `key` defaults to the storage name.
///
/// [`DEFAULT_COLLECTION`]: crate::DEFAULT_COLLECTION
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
#[cfg(feature = "serde")]
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default)]
    pub entities: std::collections::BTreeMap<String, EntityConfig>,
}

/// One entity's entry in a [`RegistryConfig`].
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
#[cfg(feature = "serde")]
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_value: Option<u64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RegistryConfig> for GeneratorRegistry {
    type Error = Error;

    fn try_from(config: RegistryConfig) -> Result<Self> {
        let mut builder = Self::builder();

        for (entity, entry) in config.entities {
            let storage_name = entry.storage_name.unwrap_or_else(|| entity.clone());
            let mut generator = GeneratorConfig::builder(storage_name);

            if let Some(collection) = entry.collection.or_else(|| config.collection.clone()) {
                generator = generator.collection(collection);
            }
            if let Some(key) = entry.key {
                generator = generator.key(key);
            }
            if let Some(starting_value) = entry.starting_value {
                generator = generator.starting_value(starting_value);
            }

            builder = builder.register(entity, generator.build()?)?;
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> GeneratorConfig {
        GeneratorConfig::builder(name).build().unwrap()
    }

    #[test]
    fn resolves_registered_entities() {
        let registry = GeneratorRegistry::builder()
            .register("Order", config("orders"))
            .unwrap()
            .register("Invoice", config("invoices"))
            .unwrap()
            .build();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("Order"));
        assert_eq!(registry.resolve("Order").unwrap().key(), "orders");
        assert_eq!(registry.get("Invoice").unwrap().key(), "invoices");
    }

    #[test]
    fn unknown_entity_is_reported() {
        let registry = GeneratorRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(
            registry.resolve("Order").unwrap_err(),
            Error::UnregisteredEntity {
                entity: "Order".into()
            }
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = GeneratorRegistry::builder()
            .register("Order", config("orders"))
            .unwrap()
            .register("Order", config("orders_v2"))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn empty_entity_is_rejected() {
        let err = GeneratorRegistry::builder()
            .register("", config("orders"))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[cfg(feature = "serde")]
    mod declarative {
        use super::super::*;
        use crate::DEFAULT_COLLECTION;

        #[test]
        fn applies_defaults_and_overrides() {
            let raw = r#"{
                "collection": "shop_ids",
                "entities": {
                    "Order": { "storage_name": "orders" },
                    "Invoice": { "key": "inv", "starting_value": 1000 },
                    "Audit": { "collection": "audit_ids" }
                }
            }"#;
            let config: RegistryConfig = serde_json::from_str(raw).unwrap();
            let registry = GeneratorRegistry::try_from(config).unwrap();

            let order = registry.resolve("Order").unwrap();
            assert_eq!(order.collection(), "shop_ids");
            assert_eq!(order.key(), "orders");
            assert_eq!(order.starting_value(), 1);

            let invoice = registry.resolve("Invoice").unwrap();
            assert_eq!(invoice.key(), "inv");
            assert_eq!(invoice.starting_value(), 1000);

            let audit = registry.resolve("Audit").unwrap();
            assert_eq!(audit.collection(), "audit_ids");
            assert_eq!(audit.key(), "Audit");
        }

        #[test]
        fn falls_back_to_default_collection() {
            let config: RegistryConfig =
                serde_json::from_str(r#"{ "entities": { "Order": {} } }"#).unwrap();
            let registry = GeneratorRegistry::try_from(config).unwrap();
            assert_eq!(
                registry.resolve("Order").unwrap().collection(),
                DEFAULT_COLLECTION
            );
        }

        #[test]
        fn invalid_entries_fail_the_whole_registry() {
            let config: RegistryConfig = serde_json::from_str(
                r#"{ "entities": { "Order": { "starting_value": 0 } } }"#,
            )
            .unwrap();
            let err = GeneratorRegistry::try_from(config).unwrap_err();
            assert!(matches!(err, Error::Configuration { .. }));
        }

        #[test]
        fn unknown_fields_are_rejected() {
            let result = serde_json::from_str::<RegistryConfig>(
                r#"{ "entities": { "Order": { "start": 5 } } }"#,
            );
            assert!(result.is_err());
        }
    }
}
