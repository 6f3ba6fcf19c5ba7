//! Instance arena for the injector
//!
//! The store owns the active definitions, the token/qualifier indexes used to
//! pick candidates, and one slot per constructed singleton. It is filled while
//! the injector initializes and never changes afterwards, so it can be read
//! from any thread without locking.

use crate::config::Properties;
use crate::definition::ComponentDefinition;
use crate::factory::{Dependencies, Instance, downcast_view};
use crate::processor::InstancePostProcessor;
use crate::{DiError, Lifetime, Qualifier, Result, Token};
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// A constructed singleton with one pre-built view per binding
struct Slot {
    raw: Instance,
    views: Vec<(Token, Instance)>,
}

impl Slot {
    fn view(&self, token: Token) -> Option<&Instance> {
        self.views.iter().find(|(t, _)| *t == token).map(|(_, v)| v)
    }
}

pub(crate) struct ComponentStore {
    definitions: Vec<ComponentDefinition>,
    by_token: HashMap<Token, Vec<usize>, RandomState>,
    by_qualifier: HashMap<Qualifier, Vec<usize>, RandomState>,
    slots: Vec<Option<Slot>>,
    creation_order: Vec<usize>,
    post_processors: Vec<Arc<dyn InstancePostProcessor>>,
    properties: Arc<Properties>,
}

impl ComponentStore {
    pub(crate) fn new(definitions: Vec<ComponentDefinition>, properties: Arc<Properties>) -> Self {
        let slots = definitions.iter().map(|_| None).collect();
        let mut store = Self {
            definitions,
            by_token: HashMap::default(),
            by_qualifier: HashMap::default(),
            slots,
            creation_order: Vec::new(),
            post_processors: Vec::new(),
            properties,
        };
        store.reindex();
        store
    }

    /// Rebuild the candidate indexes after definitions were rewritten
    pub(crate) fn reindex(&mut self) {
        self.by_token.clear();
        self.by_qualifier.clear();
        for (index, definition) in self.definitions.iter().enumerate() {
            for token in definition.bound_tokens() {
                self.by_token.entry(token).or_default().push(index);
            }
            for qualifier in definition.qualifiers() {
                let entries = self.by_qualifier.entry(qualifier.clone()).or_default();
                if entries.last() != Some(&index) {
                    entries.push(index);
                }
            }
        }
    }

    #[inline]
    pub(crate) fn definitions(&self) -> &[ComponentDefinition] {
        &self.definitions
    }

    #[inline]
    pub(crate) fn definitions_mut(&mut self) -> &mut [ComponentDefinition] {
        &mut self.definitions
    }

    #[inline]
    pub(crate) fn properties(&self) -> &Properties {
        &self.properties
    }

    #[inline]
    pub(crate) fn creation_order(&self) -> &[usize] {
        &self.creation_order
    }

    pub(crate) fn set_post_processors(&mut self, processors: Vec<Arc<dyn InstancePostProcessor>>) {
        self.post_processors = processors;
    }

    /// Indexes of definitions bound to `token` (and tagged with `qualifier`),
    /// in registration order
    pub(crate) fn candidates(&self, token: Token, qualifier: Option<&Qualifier>) -> Vec<usize> {
        let Some(indexes) = self.by_token.get(&token) else {
            return Vec::new();
        };
        indexes
            .iter()
            .copied()
            .filter(|&i| qualifier.is_none_or(|q| self.definitions[i].has_qualifier(q)))
            .collect()
    }

    /// The single candidate for `token`
    pub(crate) fn select(&self, token: Token, qualifier: Option<&Qualifier>) -> Result<usize> {
        let candidates = self.candidates(token, qualifier);
        match candidates.as_slice() {
            [] => Err(DiError::not_found(token, qualifier)),
            [single] => Ok(*single),
            many => Err(DiError::AmbiguousComponent {
                token,
                qualifier: qualifier.cloned(),
                candidates: many.iter().map(|&i| self.definitions[i].token().name()).collect(),
            }),
        }
    }

    /// Indexes of definitions tagged with `qualifier`, in registration order
    pub(crate) fn qualified(&self, qualifier: &Qualifier) -> &[usize] {
        self.by_qualifier.get(qualifier).map(Vec::as_slice).unwrap_or_default()
    }

    #[inline]
    pub(crate) fn is_built(&self, index: usize) -> bool {
        self.slots[index].is_some()
    }

    /// Store a constructed singleton and build its views
    pub(crate) fn insert(&mut self, index: usize, raw: Instance) -> Result<()> {
        let definition = &self.definitions[index];
        let mut views = Vec::with_capacity(definition.bindings.len());
        for binding in &definition.bindings {
            let view = binding.view(&raw).ok_or_else(|| {
                DiError::creation_failed(
                    definition.token(),
                    format!("instance no longer matches bound type {}", binding.token),
                )
            })?;
            views.push((binding.token, view));
        }

        self.slots[index] = Some(Slot { raw, views });
        self.creation_order.push(index);
        Ok(())
    }

    /// Run the factory for `index`, then its post-construct hook and, when
    /// `post_process` is set, every instance post-processor in order.
    pub(crate) fn construct(&self, index: usize, post_process: bool) -> Result<Instance> {
        let definition = &self.definitions[index];
        let token = definition.token();

        #[cfg(feature = "logging")]
        trace!(
            target: "ioc_runtime",
            component = token.name(),
            lifetime = ?definition.lifetime(),
            "Constructing component"
        );

        let deps = Dependencies::new(self, definition);
        let mut instance = (definition.factory)(&deps).map_err(|e| DiError::from_boxed(token, e))?;

        if let Some(hook) = &definition.post_construct {
            hook(&instance).map_err(|e| DiError::from_boxed(token, e))?;
        }

        if post_process {
            for processor in &self.post_processors {
                instance = processor
                    .post_process(definition, instance)
                    .map_err(|e| DiError::from_boxed(token, e))?;
            }
        }

        Ok(instance)
    }

    /// View of the component at `index` for `token`.
    ///
    /// Singletons must already be constructed; prototypes are built on the spot.
    /// `requester` names the component asking, for error messages.
    pub(crate) fn view(
        &self,
        index: usize,
        token: Token,
        requester: Option<&ComponentDefinition>,
    ) -> Result<Instance> {
        let definition = &self.definitions[index];
        match definition.lifetime() {
            Lifetime::Singleton => {
                let slot = self.slots[index]
                    .as_ref()
                    .ok_or_else(|| not_constructed(definition, requester))?;
                slot.view(token)
                    .cloned()
                    .ok_or_else(|| DiError::not_found(token, None))
            }
            Lifetime::Prototype => {
                let raw = self.construct(index, true)?;
                let binding = definition
                    .binding(token)
                    .ok_or_else(|| DiError::not_found(token, None))?;
                binding.view(&raw).ok_or_else(|| {
                    DiError::creation_failed(
                        definition.token(),
                        format!("instance no longer matches bound type {token}"),
                    )
                })
            }
        }
    }

    /// Raw instance of the component at `index`
    pub(crate) fn raw(&self, index: usize) -> Result<Instance> {
        let definition = &self.definitions[index];
        match definition.lifetime() {
            Lifetime::Singleton => self.slots[index]
                .as_ref()
                .map(|slot| Arc::clone(&slot.raw))
                .ok_or_else(|| not_constructed(definition, None)),
            Lifetime::Prototype => self.construct(index, true),
        }
    }

    /// Typed views of every component tagged with `qualifier` that binds `T`
    pub(crate) fn all_views<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: &Qualifier,
        requester: Option<&ComponentDefinition>,
    ) -> Result<Vec<Arc<T>>> {
        let token = Token::of::<T>();
        let mut found = Vec::new();
        for &index in self.qualified(qualifier) {
            if self.definitions[index].binding(token).is_none() {
                continue;
            }
            let view = self.view(index, token, requester)?;
            if let Some(typed) = downcast_view::<T>(&view) {
                found.push(typed);
            }
        }
        Ok(found)
    }
}

fn not_constructed(definition: &ComponentDefinition, requester: Option<&ComponentDefinition>) -> DiError {
    match requester {
        Some(owner) => DiError::creation_failed(
            owner.token(),
            format!(
                "{} is not constructed yet; declare it as a dependency",
                definition.token()
            ),
        ),
        None => DiError::illegal_state(format!("{} is not constructed", definition.token())),
    }
}
