/// A result type defaulting to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `tally` can emit.
///
/// None of these are fatal to the process. Every error is handed back to the
/// caller of [`SequenceGenerator::next_id`], who decides whether to retry,
/// fail the enclosing operation, or propagate it further.
///
/// [`SequenceGenerator::next_id`]: crate::SequenceGenerator::next_id
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The counter store could not be reached or did not answer in time.
    ///
    /// The generator never retries this internally. Neither store operation
    /// is idempotent: retrying an increment that actually landed would skip
    /// an id, and retry policy belongs to the caller.
    #[error("counter store unavailable: {reason}")]
    StoreUnavailable {
        /// Transport-level description of the failure.
        reason: String,
    },

    /// A generator was configured with a missing or invalid key, collection or
    /// starting value. Raised at setup time, before any store call.
    #[error("invalid generator configuration: {reason}")]
    Configuration {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// An id was requested for an entity type that has no registered
    /// [`GeneratorConfig`].
    ///
    /// [`GeneratorConfig`]: crate::GeneratorConfig
    #[error("no generator registered for entity `{entity}`")]
    UnregisteredEntity {
        /// The entity type that was looked up.
        entity: String,
    },

    /// The store refused an increment because the counter would overflow.
    /// The stored value is left unchanged.
    #[error("counter `{key}` in `{collection}` would overflow")]
    CounterOverflow {
        /// Collection holding the counter.
        collection: String,
        /// Key of the counter.
        key: String,
    },
}

impl Error {
    /// Shorthand for [`Error::StoreUnavailable`].
    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Configuration`].
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error came from talking to the store rather than
    /// from local configuration.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::CounterOverflow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = Error::store_unavailable("connection refused");
        assert_eq!(
            err.to_string(),
            "counter store unavailable: connection refused"
        );

        let err = Error::CounterOverflow {
            collection: "ids".into(),
            key: "orders".into(),
        };
        assert_eq!(err.to_string(), "counter `orders` in `ids` would overflow");
    }

    #[test]
    fn store_errors_are_classified() {
        assert!(Error::store_unavailable("timeout").is_store_error());
        assert!(!Error::configuration("empty key").is_store_error());
        assert!(
            !Error::UnregisteredEntity {
                entity: "Order".into()
            }
            .is_store_error()
        );
    }
}
