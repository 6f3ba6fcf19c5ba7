//! The injector
//!
//! `Injector::initialize` turns a set of definitions into live components:
//!
//! 1. drop definitions whose profiles are all inactive
//! 2. build the definition post-processors and let them rewrite every other definition
//! 3. validate the whole dependency graph (missing, ambiguous, circular) and
//!    derive the instantiation order
//! 4. build the instance post-processors
//! 5. build every remaining singleton, dependencies first, passing each one
//!    through the instance post-processors
//!
//! Once initialized the injector is frozen; its instance table is read-only.

use crate::config::Properties;
use crate::definition::{Capabilities, ComponentDefinition};
use crate::factory::{Instance, downcast_view};
use crate::processor::{DefinitionPostProcessor, InstancePostProcessor};
use crate::storage::ComponentStore;
use crate::{DiError, Lifetime, Qualifier, Result, Token};
use once_cell::sync::OnceCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, error, trace};

/// A managed component handed out by [`Injector::components`]
pub struct Managed<U: ?Sized> {
    /// Token of the component's own type
    pub token: Token,
    /// Declared ordering rank
    pub order: Option<i32>,
    pub instance: Arc<U>,
}

/// Resolves the dependency graph and owns the singleton instances.
///
/// # Examples
///
/// ```rust
/// use ioc_runtime::{BoxError, ComponentDefinition, Injector};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Database;
///
/// struct UserService {
///     db: Arc<Database>,
/// }
///
/// let injector = Injector::new();
/// injector
///     .initialize(
///         vec![
///             ComponentDefinition::builder(|deps| {
///                 Ok::<_, BoxError>(UserService { db: deps.get::<Database>()? })
///             })
///             .depends_on::<Database>()
///             .build(),
///             ComponentDefinition::of::<Database>().build(),
///         ],
///         &[],
///     )
///     .unwrap();
///
/// let users = injector.get::<UserService>().unwrap();
/// let db = injector.get::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&users.db, &db));
/// ```
pub struct Injector {
    store: OnceCell<ComponentStore>,
    properties: Arc<Properties>,
}

impl Injector {
    /// Create an injector with no configuration properties
    pub fn new() -> Self {
        Self::with_properties(Arc::new(Properties::new()))
    }

    /// Create an injector whose factories can read `properties`
    pub fn with_properties(properties: Arc<Properties>) -> Self {
        Self {
            store: OnceCell::new(),
            properties,
        }
    }

    /// Instantiate every active definition.
    ///
    /// Failures are reported as [`DiError::ContainerInitialization`] and leave
    /// the injector uninitialized.
    pub fn initialize<I>(&self, definitions: I, active_profiles: &[String]) -> Result<()>
    where
        I: IntoIterator<Item = ComponentDefinition>,
    {
        if self.store.get().is_some() {
            return Err(DiError::Frozen);
        }

        let store = build(definitions, active_profiles, Arc::clone(&self.properties))
            .map_err(DiError::initialization)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_runtime",
            definitions = store.definitions().len(),
            singletons = store.creation_order().len(),
            "Injector initialized"
        );

        self.store.set(store).map_err(|_| DiError::Frozen)
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.store.get().is_some()
    }

    fn store(&self) -> Result<&ComponentStore> {
        self.store
            .get()
            .ok_or_else(|| DiError::illegal_state("injector is not initialized"))
    }

    /// Resolve the raw instance bound to `token`.
    ///
    /// With a qualifier, only candidates tagged with it are considered. No
    /// candidate fails with `NoSuchComponent`, several with `AmbiguousComponent`.
    pub fn resolve(&self, token: Token, qualifier: Option<&Qualifier>) -> Result<Instance> {
        let store = self.store()?;
        let index = store.select(token, qualifier)?;
        store.raw(index)
    }

    /// Raw instances of every component tagged with `qualifier`, in registration order
    pub fn resolve_all(&self, qualifier: &Qualifier) -> Result<Vec<Instance>> {
        let store = self.store()?;
        store
            .qualified(qualifier)
            .iter()
            .map(|&index| store.raw(index))
            .collect()
    }

    /// Resolve the component bound to `T`
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.typed::<T>(None)
    }

    /// Resolve the component bound to `T` and tagged with `qualifier`
    pub fn get_qualified<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: &Qualifier,
    ) -> Result<Arc<T>> {
        self.typed::<T>(Some(qualifier))
    }

    /// Every component tagged with `qualifier` that is bound to `T`
    pub fn get_all<T: ?Sized + Send + Sync + 'static>(&self, qualifier: &Qualifier) -> Result<Vec<Arc<T>>> {
        self.store()?.all_views::<T>(qualifier, None)
    }

    fn typed<T: ?Sized + Send + Sync + 'static>(&self, qualifier: Option<&Qualifier>) -> Result<Arc<T>> {
        let store = self.store()?;
        let token = Token::of::<T>();
        let index = store.select(token, qualifier)?;
        let view = store.view(index, token, None)?;
        downcast_view::<T>(&view).ok_or_else(|| DiError::not_found(token, qualifier))
    }

    /// Components whose capabilities pass `filter`, viewed as `U`, in registration order
    pub fn components<U, F>(&self, filter: F) -> Result<Vec<Managed<U>>>
    where
        U: ?Sized + Send + Sync + 'static,
        F: Fn(Capabilities) -> bool,
    {
        let store = self.store()?;
        let token = Token::of::<U>();
        let mut found = Vec::new();
        for (index, definition) in store.definitions().iter().enumerate() {
            if !filter(definition.capabilities()) {
                continue;
            }
            let view = store.view(index, token, None)?;
            let instance = downcast_view::<U>(&view).ok_or_else(|| DiError::not_found(token, None))?;
            found.push(Managed {
                token: definition.token(),
                order: definition.order(),
                instance,
            });
        }
        Ok(found)
    }

    /// The active (post-processed) definition registered for `token`
    pub fn definition(&self, token: Token) -> Option<&ComponentDefinition> {
        let store = self.store.get()?;
        store.definitions().iter().find(|d| d.token() == token)
    }

    /// Tokens of the constructed singletons, in the order they were built
    pub fn instantiation_order(&self) -> Result<Vec<Token>> {
        let store = self.store()?;
        Ok(store
            .creation_order()
            .iter()
            .map(|&index| store.definitions()[index].token())
            .collect())
    }

    /// Number of constructed singletons
    pub fn len(&self) -> usize {
        self.store.get().map_or(0, |s| s.creation_order().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run pre-destroy hooks in reverse instantiation order and clear the
    /// instance table.
    ///
    /// A failing hook is logged and does not stop the others. Returns the
    /// number of hooks invoked.
    pub fn destroy(&mut self) -> usize {
        let Some(store) = self.store.take() else {
            return 0;
        };

        let mut invoked = 0;
        for &index in store.creation_order().iter().rev() {
            let definition = &store.definitions()[index];
            let Some(hook) = &definition.pre_destroy else {
                continue;
            };
            let Ok(raw) = store.raw(index) else {
                continue;
            };

            invoked += 1;
            match hook(&raw) {
                Ok(()) => {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "ioc_runtime",
                        component = definition.token().name(),
                        "Pre-destroy hook completed"
                    );
                }
                Err(_error) => {
                    #[cfg(feature = "logging")]
                    error!(
                        target: "ioc_runtime",
                        component = definition.token().name(),
                        error = %_error,
                        "Pre-destroy hook failed"
                    );
                }
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_runtime",
            singletons = store.creation_order().len(),
            hooks = invoked,
            "Injector destroyed"
        );

        invoked
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("initialized", &self.is_initialized())
            .field("singletons", &self.len())
            .finish()
    }
}

// =============================================================================
// Initialization
// =============================================================================

fn build<I>(definitions: I, active_profiles: &[String], properties: Arc<Properties>) -> Result<ComponentStore>
where
    I: IntoIterator<Item = ComponentDefinition>,
{
    let mut active = Vec::new();
    for definition in definitions {
        if definition.is_active(active_profiles) {
            active.push(definition);
        } else {
            #[cfg(feature = "logging")]
            debug!(
                target: "ioc_runtime",
                component = definition.token().name(),
                profiles = ?definition.profiles(),
                "Skipping component, no declared profile is active"
            );
        }
    }

    let mut store = ComponentStore::new(active, properties);

    // Definition post-processors
    let roots = indexes_where(&store, |c| c.definition_post_processor);
    if !roots.is_empty() {
        let order = Planner::new(&store, true).plan(&roots)?;
        instantiate(&mut store, &order, false)?;

        let processors = roots
            .iter()
            .map(|&index| typed_at::<dyn DefinitionPostProcessor>(&store, index))
            .collect::<Result<Vec<_>>>()?;

        for definition in store.definitions_mut() {
            if definition.capabilities().definition_post_processor {
                continue;
            }
            let token = definition.token();
            for processor in &processors {
                processor
                    .post_process(definition)
                    .map_err(|e| DiError::from_boxed(token, e))?;
            }
        }
        store.reindex();

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_runtime",
            processors = processors.len(),
            "Definition post-processors applied"
        );
    }

    // Whole graph, before anything else gets built
    let everything: Vec<usize> = (0..store.definitions().len()).collect();
    let order = Planner::new(&store, false).plan(&everything)?;

    // Instance post-processors
    let roots = indexes_where(&store, |c| c.instance_post_processor);
    if !roots.is_empty() {
        let early = Planner::new(&store, false).plan(&roots)?;
        for &index in &early {
            if !store.definitions()[index].capabilities().instance_post_processor {
                #[cfg(feature = "logging")]
                debug!(
                    target: "ioc_runtime",
                    component = store.definitions()[index].token().name(),
                    "Component built before instance post-processors, not eligible for post-processing"
                );
            }
        }
        instantiate(&mut store, &early, false)?;

        let processors = roots
            .iter()
            .map(|&index| typed_at::<dyn InstancePostProcessor>(&store, index))
            .collect::<Result<Vec<_>>>()?;
        store.set_post_processors(processors);
    }

    instantiate(&mut store, &order, true)?;
    Ok(store)
}

fn indexes_where(store: &ComponentStore, filter: impl Fn(&Capabilities) -> bool) -> Vec<usize> {
    store
        .definitions()
        .iter()
        .enumerate()
        .filter(|(_, d)| filter(&d.capabilities()))
        .map(|(index, _)| index)
        .collect()
}

fn typed_at<U: ?Sized + Send + Sync + 'static>(store: &ComponentStore, index: usize) -> Result<Arc<U>> {
    let token = Token::of::<U>();
    let view = store.view(index, token, None)?;
    downcast_view::<U>(&view).ok_or_else(|| DiError::not_found(token, None))
}

/// Build the singletons in `order` that are not built yet. Prototypes are skipped.
fn instantiate(store: &mut ComponentStore, order: &[usize], post_process: bool) -> Result<()> {
    for &index in order {
        if store.is_built(index) || store.definitions()[index].lifetime() == Lifetime::Prototype {
            continue;
        }
        let instance = store.construct(index, post_process)?;
        store.insert(index, instance)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_runtime",
            component = store.definitions()[index].token().name(),
            "Singleton instantiated"
        );
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Depth-first walk over declared dependencies producing a
/// dependencies-first order.
struct Planner<'a> {
    store: &'a ComponentStore,
    marks: Vec<Mark>,
    stack: Vec<usize>,
    order: Vec<usize>,
    /// Only definition post-processors may be reached
    post_processors_only: bool,
}

impl<'a> Planner<'a> {
    fn new(store: &'a ComponentStore, post_processors_only: bool) -> Self {
        Self {
            store,
            marks: vec![Mark::Unvisited; store.definitions().len()],
            stack: Vec::new(),
            order: Vec::new(),
            post_processors_only,
        }
    }

    fn plan(mut self, roots: &[usize]) -> Result<Vec<usize>> {
        for &root in roots {
            self.visit(root)?;
        }
        Ok(self.order)
    }

    fn visit(&mut self, index: usize) -> Result<()> {
        match self.marks[index] {
            Mark::Done => return Ok(()),
            Mark::Visiting => return Err(self.cycle(index)),
            Mark::Unvisited => {}
        }

        self.marks[index] = Mark::Visiting;
        self.stack.push(index);

        let store = self.store;
        let definition = &store.definitions()[index];
        for dependency in definition.dependencies() {
            let target = match store.select(dependency.token, dependency.qualifier.as_ref()) {
                Ok(target) => target,
                Err(DiError::NoSuchComponent { .. }) if !dependency.required => {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "ioc_runtime",
                        component = definition.token().name(),
                        dependency = dependency.token.name(),
                        "Optional dependency absent"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            let target_definition = &store.definitions()[target];
            if self.post_processors_only && !target_definition.capabilities().definition_post_processor {
                return Err(DiError::creation_failed(
                    definition.token(),
                    format!(
                        "definition post-processors may only depend on other definition post-processors, not {}",
                        target_definition.token()
                    ),
                ));
            }

            self.visit(target)?;
        }

        self.stack.pop();
        self.marks[index] = Mark::Done;
        self.order.push(index);
        Ok(())
    }

    fn cycle(&self, index: usize) -> DiError {
        let start = self.stack.iter().position(|&i| i == index).unwrap_or(0);
        let mut path: Vec<&'static str> = self.stack[start..]
            .iter()
            .map(|&i| self.store.definitions()[i].token().name())
            .collect();
        path.push(self.store.definitions()[index].token().name());
        DiError::CircularDependency { path }
    }
}
