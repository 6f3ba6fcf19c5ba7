//! Component registry
//!
//! Pure bookkeeping: definitions keyed by token, remembered in registration
//! order. No instantiation happens here.

use crate::definition::ComponentDefinition;
use crate::processor::{DefinitionPostProcessor, InstancePostProcessor};
use crate::{BoxError, Dependencies, DiError, Result, Token};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "logging")]
use tracing::debug;

struct Registered {
    sequence: usize,
    definition: ComponentDefinition,
}

/// Holds discovered and manually registered component definitions.
///
/// # Examples
///
/// ```rust
/// use ioc_runtime::{ComponentDefinition, ComponentRegistry};
///
/// #[derive(Default)]
/// struct Database;
///
/// let registry = ComponentRegistry::new();
/// registry.register(ComponentDefinition::of::<Database>().build()).unwrap();
///
/// // Registering the same token twice fails
/// assert!(registry.register(ComponentDefinition::of::<Database>().build()).is_err());
/// assert_eq!(registry.all_definitions().count(), 1);
/// ```
pub struct ComponentRegistry {
    definitions: DashMap<Token, Registered, RandomState>,
    sequence: AtomicUsize,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            definitions: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
            sequence: AtomicUsize::new(0),
        }
    }

    /// Add a definition. Fails if its token is already registered.
    pub fn register(&self, definition: ComponentDefinition) -> Result<()> {
        let token = definition.token();
        match self.definitions.entry(token) {
            Entry::Occupied(_) => Err(DiError::DuplicateRegistration { token }),
            Entry::Vacant(slot) => {
                let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

                #[cfg(feature = "logging")]
                debug!(
                    target: "ioc_runtime",
                    component = token.name(),
                    sequence,
                    capabilities = ?definition.capabilities(),
                    "Registering component definition"
                );

                slot.insert(Registered {
                    sequence,
                    definition,
                });
                Ok(())
            }
        }
    }

    /// Register a definition post-processor built by `factory`
    pub fn register_definition_post_processor<T, F>(&self, factory: F) -> Result<()>
    where
        T: DefinitionPostProcessor,
        F: Fn(&Dependencies<'_>) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        self.register(
            ComponentDefinition::builder(factory)
                .definition_post_processor()
                .build(),
        )
    }

    /// Register an instance post-processor built by `factory`
    pub fn register_instance_post_processor<T, F>(&self, factory: F) -> Result<()>
    where
        T: InstancePostProcessor,
        F: Fn(&Dependencies<'_>) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        self.register(
            ComponentDefinition::builder(factory)
                .instance_post_processor()
                .build(),
        )
    }

    /// Snapshot of every definition in registration order.
    ///
    /// Each call starts a fresh sequence.
    pub fn all_definitions(&self) -> std::vec::IntoIter<ComponentDefinition> {
        let mut entries: Vec<(usize, ComponentDefinition)> = self
            .definitions
            .iter()
            .map(|entry| (entry.sequence, entry.definition.clone()))
            .collect();
        entries.sort_by_key(|(sequence, _)| *sequence);
        entries
            .into_iter()
            .map(|(_, definition)| definition)
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("count", &self.len())
            .finish()
    }
}
