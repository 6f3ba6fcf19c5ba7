//! Application context
//!
//! The context drives the startup/shutdown state machine:
//!
//! ```text
//! NotInitialized --start()--> Initializing --ok--> Ready --destroy()--> NotInitialized
//!                                          \--err--> NotInitialized
//! ```
//!
//! `start()` loads properties, registers discovered definitions, initializes
//! the injector, orders the aspects and wires controllers and interceptors into
//! a fresh router through the [`Dispatcher`]. Every read fails with
//! [`DiError::IllegalState`] unless the context is `Ready`.

use crate::config::{Properties, PropertySource};
use crate::definition::ComponentDefinition;
use crate::discovery::DiscoverySource;
use crate::dispatcher::{Controller, Dispatcher, Interceptor};
use crate::factory::Instance;
use crate::injector::Injector;
use crate::processor::Aspect;
use crate::provider::rank_key;
use crate::registry::ComponentRegistry;
use crate::router::{MemoryRouter, Router};
use crate::signal::{ExitSignal, Subscription};
use crate::{DiError, Qualifier, Result, Token};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(feature = "logging")]
use tracing::{debug, error, info};

/// Lifecycle state of an [`ApplicationContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    NotInitialized,
    Initializing,
    Ready,
}

type RouterFactory<R> = Arc<dyn Fn() -> R + Send + Sync>;

struct Running<R> {
    injector: Injector,
    dispatcher: Dispatcher,
    router: Arc<R>,
    profiles: Vec<String>,
    properties: Arc<Properties>,
    aspects: Vec<Arc<dyn Aspect>>,
}

enum State<R> {
    NotInitialized,
    Initializing,
    Ready(Running<R>),
}

impl<R> State<R> {
    fn kind(&self) -> ContextState {
        match self {
            State::NotInitialized => ContextState::NotInitialized,
            State::Initializing => ContextState::Initializing,
            State::Ready(_) => ContextState::Ready,
        }
    }
}

/// Owns the injector, the dispatcher and the wired router of a running application.
///
/// # Examples
///
/// ```rust
/// use ioc_runtime::{ApplicationContext, ComponentDefinition, ContextState};
///
/// #[derive(Default)]
/// struct Clock;
///
/// let context = ApplicationContext::builder()
///     .component(ComponentDefinition::of::<Clock>().build())
///     .build();
///
/// assert!(context.get_component::<Clock>().is_err());
///
/// context.start().unwrap();
/// assert_eq!(context.state(), ContextState::Ready);
/// assert!(context.get_component::<Clock>().is_ok());
///
/// context.destroy();
/// assert!(context.get_component::<Clock>().is_err());
/// ```
pub struct ApplicationContext<R: Router + Default = MemoryRouter> {
    definitions: Vec<ComponentDefinition>,
    discovery: Vec<Arc<dyn DiscoverySource>>,
    property_sources: Vec<Arc<dyn PropertySource>>,
    profiles: Option<Vec<String>>,
    router_factory: RouterFactory<R>,
    exit_signal: Arc<ExitSignal>,
    exit_subscription: Mutex<Option<Subscription>>,
    state: RwLock<State<R>>,
}

impl ApplicationContext {
    /// Builder for a context using the in-process [`MemoryRouter`]
    pub fn builder() -> ApplicationContextBuilder<MemoryRouter> {
        ApplicationContextBuilder::new()
    }
}

impl<R: Router + Default> ApplicationContext<R> {
    fn read(&self) -> RwLockReadGuard<'_, State<R>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State<R>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscription(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.exit_subscription.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn state(&self) -> ContextState {
        self.read().kind()
    }

    /// Start the application.
    ///
    /// Fails with `IllegalState` if already started (or starting). On failure
    /// nothing of the attempt stays reachable and `start()` may be retried.
    pub fn start(&self) -> Result<()> {
        {
            let mut state = self.write();
            match state.kind() {
                ContextState::Ready => {
                    return Err(DiError::illegal_state("application context is already started"));
                }
                ContextState::Initializing => {
                    return Err(DiError::illegal_state("application context is already starting"));
                }
                ContextState::NotInitialized => *state = State::Initializing,
            }
        }

        // Resets to NotInitialized on error or unwind
        let mut guard = StartGuard { context: Some(self) };

        #[cfg(feature = "logging")]
        debug!(target: "ioc_runtime", "Starting application context");

        match self.bootstrap() {
            Ok(running) => {
                #[cfg(feature = "logging")]
                info!(
                    target: "ioc_runtime",
                    components = running.injector.len(),
                    routes = running.dispatcher.routes().len(),
                    profiles = ?running.profiles,
                    "Application context started"
                );

                guard.context = None;
                *self.write() = State::Ready(running);
                Ok(())
            }
            Err(err) => {
                #[cfg(feature = "logging")]
                error!(target: "ioc_runtime", error = %err, "Application context failed to start");

                Err(err)
            }
        }
    }

    fn bootstrap(&self) -> Result<Running<R>> {
        let properties = Arc::new(Properties::load(
            self.property_sources
                .iter()
                .map(|source| -> &dyn PropertySource { source.as_ref() }),
        )?);
        let profiles = self
            .profiles
            .clone()
            .unwrap_or_else(|| properties.active_profiles());

        let registry = ComponentRegistry::new();
        for definition in &self.definitions {
            registry
                .register(definition.clone())
                .map_err(DiError::initialization)?;
        }
        for source in &self.discovery {
            for definition in source.discover().map_err(DiError::initialization)? {
                registry.register(definition).map_err(DiError::initialization)?;
            }
        }

        let injector = Injector::with_properties(Arc::clone(&properties));
        injector.initialize(registry.all_definitions(), &profiles)?;

        let mut aspects = injector
            .components::<dyn Aspect, _>(|c| c.aspect)
            .map_err(DiError::initialization)?;
        aspects.sort_by_key(|aspect| rank_key(aspect.order));

        let mut dispatcher = Dispatcher::new();
        for interceptor in injector
            .components::<dyn Interceptor, _>(|c| c.interceptor)
            .map_err(DiError::initialization)?
        {
            dispatcher.add_interceptor(interceptor.token, interceptor.instance, interceptor.order);
        }
        for controller in injector
            .components::<dyn Controller, _>(|c| c.controller)
            .map_err(DiError::initialization)?
        {
            let routes = injector
                .definition(controller.token)
                .map(|definition| definition.routes().to_vec())
                .unwrap_or_default();
            dispatcher.add_controller(controller.token, controller.instance, &routes);
        }

        let mut router = (self.router_factory)();
        dispatcher
            .configure(&mut router)
            .map_err(DiError::initialization)?;

        Ok(Running {
            injector,
            dispatcher,
            router: Arc::new(router),
            profiles,
            properties,
            aspects: aspects.into_iter().map(|aspect| aspect.instance).collect(),
        })
    }

    /// Shut the application down.
    ///
    /// Detaches the running state first, cancels the exit hook, drops the
    /// dispatcher and router, then runs pre-destroy hooks in reverse
    /// instantiation order. A no-op unless the context is `Ready`. Returns the
    /// number of hooks run.
    pub fn destroy(&self) -> usize {
        let running = {
            let mut state = self.write();
            if state.kind() != ContextState::Ready {
                return 0;
            }
            match std::mem::replace(&mut *state, State::NotInitialized) {
                State::Ready(running) => running,
                _ => return 0,
            }
        };

        if let Some(subscription) = self.subscription().take() {
            subscription.unsubscribe();
        }

        let Running {
            mut injector,
            dispatcher,
            router,
            ..
        } = running;
        drop(dispatcher);
        drop(router);

        let hooks = injector.destroy();

        #[cfg(feature = "logging")]
        info!(target: "ioc_runtime", hooks, "Application context destroyed");

        hooks
    }

    fn running<T>(&self, read: impl FnOnce(&Running<R>) -> Result<T>) -> Result<T> {
        match &*self.read() {
            State::Ready(running) => read(running),
            State::Initializing => Err(DiError::illegal_state("application context is still starting")),
            State::NotInitialized => Err(DiError::illegal_state("application context is not started")),
        }
    }

    /// The component bound to `T`
    pub fn get_component<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.running(|running| running.injector.get::<T>())
    }

    /// The component bound to `T` and tagged with `qualifier`
    pub fn get_component_with_token<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: &Qualifier,
    ) -> Result<Arc<T>> {
        self.running(|running| running.injector.get_qualified::<T>(qualifier))
    }

    /// Raw instances of every component tagged with `qualifier`, in registration order
    pub fn get_components_with_token(&self, qualifier: &Qualifier) -> Result<Vec<Instance>> {
        self.running(|running| running.injector.resolve_all(qualifier))
    }

    /// Components tagged with `qualifier` that are bound to `T`
    pub fn get_components_of<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: &Qualifier,
    ) -> Result<Vec<Arc<T>>> {
        self.running(|running| running.injector.get_all::<T>(qualifier))
    }

    /// Raw instance bound to `token`
    pub fn get_instance(&self, token: Token, qualifier: Option<&Qualifier>) -> Result<Instance> {
        self.running(|running| running.injector.resolve(token, qualifier))
    }

    /// The router wired at start
    pub fn get_router(&self) -> Result<Arc<R>> {
        self.running(|running| Ok(Arc::clone(&running.router)))
    }

    /// Profiles used for gating at start
    pub fn get_active_profiles(&self) -> Result<Vec<String>> {
        self.running(|running| Ok(running.profiles.clone()))
    }

    /// Aspects ordered by declared rank
    pub fn aspects(&self) -> Result<Vec<Arc<dyn Aspect>>> {
        self.running(|running| Ok(running.aspects.clone()))
    }

    /// Properties loaded at start
    pub fn properties(&self) -> Result<Arc<Properties>> {
        self.running(|running| Ok(Arc::clone(&running.properties)))
    }

    /// Tokens of the constructed singletons, in instantiation order
    pub fn instantiation_order(&self) -> Result<Vec<Token>> {
        self.running(|running| running.injector.instantiation_order())
    }

    /// Destroy this context when the exit signal fires.
    ///
    /// Registering again replaces the previous hook; `destroy()` cancels it.
    pub fn register_exit_hook(self: &Arc<Self>) {
        let context = Arc::downgrade(self);
        let subscription = self.exit_signal.subscribe(move || {
            if let Some(context) = context.upgrade() {
                context.destroy();
            }
        });

        #[cfg(feature = "logging")]
        debug!(target: "ioc_runtime", subscription = subscription.id(), "Exit hook registered");

        if let Some(previous) = self.subscription().replace(subscription) {
            previous.unsubscribe();
        }
    }
}

struct StartGuard<'a, R: Router + Default> {
    context: Option<&'a ApplicationContext<R>>,
}

impl<R: Router + Default> Drop for StartGuard<'_, R> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            *context.write() = State::NotInitialized;
        }
    }
}

impl<R: Router + Default> fmt::Debug for ApplicationContext<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("state", &self.state())
            .field("definitions", &self.definitions.len())
            .field("discovery_sources", &self.discovery.len())
            .field("property_sources", &self.property_sources.len())
            .finish()
    }
}

/// Builder for [`ApplicationContext`]
pub struct ApplicationContextBuilder<R: Router + Default = MemoryRouter> {
    definitions: Vec<ComponentDefinition>,
    discovery: Vec<Arc<dyn DiscoverySource>>,
    property_sources: Vec<Arc<dyn PropertySource>>,
    profiles: Option<Vec<String>>,
    router_factory: Option<RouterFactory<R>>,
    exit_signal: Option<Arc<ExitSignal>>,
}

impl<R: Router + Default> ApplicationContextBuilder<R> {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            discovery: Vec::new(),
            property_sources: Vec::new(),
            profiles: None,
            router_factory: None,
            exit_signal: None,
        }
    }

    /// Register a definition directly
    pub fn component(mut self, definition: ComponentDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Add a discovery source, consulted on every start in the order added
    pub fn discover(mut self, source: impl DiscoverySource + 'static) -> Self {
        self.discovery.push(Arc::new(source));
        self
    }

    /// Add a property source; later sources override earlier ones
    pub fn property_source(mut self, source: impl PropertySource + 'static) -> Self {
        self.property_sources.push(Arc::new(source));
        self
    }

    /// Use these profiles instead of the `profiles.active` property
    pub fn profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = Some(profiles.into_iter().map(Into::into).collect());
        self
    }

    /// Build the router with `factory` instead of `R::default()`
    pub fn router(mut self, factory: impl Fn() -> R + Send + Sync + 'static) -> Self {
        self.router_factory = Some(Arc::new(factory));
        self
    }

    /// Use `signal` instead of the process-wide exit signal
    pub fn exit_signal(mut self, signal: Arc<ExitSignal>) -> Self {
        self.exit_signal = Some(signal);
        self
    }

    pub fn build(self) -> ApplicationContext<R> {
        ApplicationContext {
            definitions: self.definitions,
            discovery: self.discovery,
            property_sources: self.property_sources,
            profiles: self.profiles,
            router_factory: self.router_factory.unwrap_or_else(|| Arc::new(R::default)),
            exit_signal: self.exit_signal.unwrap_or_else(ExitSignal::global),
            exit_subscription: Mutex::new(None),
            state: RwLock::new(State::NotInitialized),
        }
    }
}

impl<R: Router + Default> Default for ApplicationContextBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}
