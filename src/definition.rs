//! Component definitions
//!
//! A [`ComponentDefinition`] is the side-table record for one component type:
//! its capabilities, qualifiers, profiles, lifetime, ordering rank, declared
//! dependencies, route mappings (for controllers) and how to build it.
//!
//! Definitions are created through the typed [`DefinitionBuilder`], so every
//! capability flag is backed by a trait implementation checked at compile time.
//!
//! # Example
//!
//! ```rust
//! use ioc_runtime::{BoxError, ComponentDefinition};
//! use std::sync::Arc;
//!
//! struct Database { url: String }
//! struct UserRepository { db: Arc<Database> }
//!
//! let db = ComponentDefinition::builder(|_| {
//!     Ok::<_, BoxError>(Database { url: "postgres://localhost".into() })
//! })
//! .build();
//!
//! let repo = ComponentDefinition::builder(|deps| {
//!     Ok::<_, BoxError>(UserRepository { db: deps.get::<Database>()? })
//! })
//! .depends_on::<Database>()
//! .profile("dev")
//! .build();
//!
//! assert_eq!(repo.dependencies().len(), 1);
//! assert_eq!(repo.profiles(), ["dev"]);
//! # let _ = db;
//! ```

use crate::dispatcher::{Controller, Interceptor};
use crate::factory::{Binding, FactoryFn, HookFn, erase_factory, erase_hook};
use crate::http::Method;
use crate::processor::{Aspect, DefinitionPostProcessor, InstancePostProcessor};
use crate::{BoxError, Dependencies, Injectable, Lifetime, Qualifier, Token};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A declared dependency of a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Target token (own type or bound base type)
    pub token: Token,
    /// Restricts candidates to those tagged with this qualifier
    pub qualifier: Option<Qualifier>,
    /// Unresolved optional dependencies are left absent
    pub required: bool,
}

impl Dependency {
    /// Required dependency on `T`
    pub fn required<T: ?Sized + 'static>() -> Self {
        Self {
            token: Token::of::<T>(),
            qualifier: None,
            required: true,
        }
    }

    /// Optional dependency on `T`
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self {
            required: false,
            ..Self::required::<T>()
        }
    }

    /// Restrict this dependency to a qualifier
    pub fn qualified(mut self, qualifier: impl Into<Qualifier>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}

/// What a component is, beyond being a plain component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub controller: bool,
    pub configuration: bool,
    pub definition_post_processor: bool,
    pub instance_post_processor: bool,
    pub aspect: bool,
    pub interceptor: bool,
}

/// Route declared on a controller definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMapping {
    pub method: Method,
    pub path: String,
    /// Name passed to [`Controller::handle`]
    pub handler: String,
    /// View rendered with the handler's result, if any
    pub view: Option<String>,
}

/// Definition of a managed component.
///
/// Immutable once registered, except through a
/// [`DefinitionPostProcessor`] before instantiation.
#[derive(Clone)]
pub struct ComponentDefinition {
    token: Token,
    capabilities: Capabilities,
    qualifiers: Vec<Qualifier>,
    profiles: Vec<String>,
    lifetime: Lifetime,
    order: Option<i32>,
    dependencies: Vec<Dependency>,
    routes: Vec<RouteMapping>,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) factory: FactoryFn,
    pub(crate) post_construct: Option<HookFn>,
    pub(crate) pre_destroy: Option<HookFn>,
}

impl ComponentDefinition {
    /// Start a definition for `T` built by `factory`
    pub fn builder<T, F>(factory: F) -> DefinitionBuilder<T>
    where
        T: Injectable,
        F: Fn(&Dependencies<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        DefinitionBuilder {
            definition: ComponentDefinition {
                token: Token::of::<T>(),
                capabilities: Capabilities::default(),
                qualifiers: Vec::new(),
                profiles: Vec::new(),
                lifetime: Lifetime::Singleton,
                order: None,
                dependencies: Vec::new(),
                routes: Vec::new(),
                bindings: vec![Binding::identity::<T>()],
                factory: erase_factory(factory),
                post_construct: None,
                pre_destroy: None,
            },
            _marker: PhantomData,
        }
    }

    /// Start a definition for a `Default` component without dependencies
    pub fn of<T: Injectable + Default>() -> DefinitionBuilder<T> {
        Self::builder(|_| Ok(T::default()))
    }

    /// Start a definition that hands out clones of `value`
    pub fn value<T: Injectable + Clone>(value: T) -> DefinitionBuilder<T> {
        Self::builder(move |_| Ok(value.clone()))
    }

    #[inline]
    pub fn token(&self) -> Token {
        self.token
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[inline]
    pub fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }

    /// Whether this definition is tagged with `qualifier`
    #[inline]
    pub fn has_qualifier(&self, qualifier: &Qualifier) -> bool {
        self.qualifiers.contains(qualifier)
    }

    /// Declared profiles, empty when always active
    #[inline]
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// Active unless it declares profiles and none of them is active
    pub fn is_active(&self, active_profiles: &[String]) -> bool {
        self.profiles.is_empty() || self.profiles.iter().any(|p| active_profiles.contains(p))
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn set_lifetime(&mut self, lifetime: Lifetime) {
        self.lifetime = lifetime;
    }

    /// Declared ordering rank, `None` sorts last
    #[inline]
    pub fn order(&self) -> Option<i32> {
        self.order
    }

    pub fn set_order(&mut self, order: Option<i32>) {
        self.order = order;
    }

    #[inline]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn dependencies_mut(&mut self) -> &mut Vec<Dependency> {
        &mut self.dependencies
    }

    #[inline]
    pub fn routes(&self) -> &[RouteMapping] {
        &self.routes
    }

    /// Tokens this definition can be resolved by, its own first
    pub fn bound_tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.bindings.iter().map(|b| b.token)
    }

    pub(crate) fn binding(&self, token: Token) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.token == token)
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("token", &self.token)
            .field("capabilities", &self.capabilities)
            .field("qualifiers", &self.qualifiers)
            .field("profiles", &self.profiles)
            .field("lifetime", &self.lifetime)
            .field("order", &self.order)
            .field("dependencies", &self.dependencies)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// Typed builder for a [`ComponentDefinition`]
pub struct DefinitionBuilder<T> {
    definition: ComponentDefinition,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> DefinitionBuilder<T> {
    /// Declare a required dependency
    pub fn depends_on<D: ?Sized + 'static>(self) -> Self {
        self.dependency(Dependency::required::<D>())
    }

    /// Declare a required dependency restricted to `qualifier`
    pub fn depends_on_qualified<D: ?Sized + 'static>(self, qualifier: impl Into<Qualifier>) -> Self {
        self.dependency(Dependency::required::<D>().qualified(qualifier))
    }

    /// Declare an optional dependency
    pub fn optional<D: ?Sized + 'static>(self) -> Self {
        self.dependency(Dependency::optional::<D>())
    }

    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.definition.dependencies.push(dependency);
        self
    }

    /// Tag with a qualifier
    pub fn qualifier(mut self, qualifier: impl Into<Qualifier>) -> Self {
        self.definition.qualifiers.push(qualifier.into());
        self
    }

    /// Only instantiate when `profile` is active
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.definition.profiles.push(profile.into());
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.definition.lifetime = lifetime;
        self
    }

    /// Shortcut for `lifetime(Lifetime::Prototype)`
    pub fn prototype(self) -> Self {
        self.lifetime(Lifetime::Prototype)
    }

    /// Ordering rank (lower runs first)
    pub fn order(mut self, rank: i32) -> Self {
        self.definition.order = Some(rank);
        self
    }

    /// Mark as a configuration root
    pub fn configuration(mut self) -> Self {
        self.definition.capabilities.configuration = true;
        self
    }

    /// Make the component resolvable as `U`
    pub fn bind<U: ?Sized + Send + Sync + 'static>(mut self, cast: fn(Arc<T>) -> Arc<U>) -> Self {
        let binding = Binding::new::<T, U>(cast);
        if self.definition.binding(binding.token).is_none() {
            self.definition.bindings.push(binding);
        }
        self
    }

    /// Runs right after construction, before instance post-processors
    pub fn post_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.definition.post_construct = Some(erase_hook(hook));
        self
    }

    /// Runs when the context is destroyed, in reverse instantiation order
    pub fn pre_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.definition.pre_destroy = Some(erase_hook(hook));
        self
    }

    pub fn build(self) -> ComponentDefinition {
        self.definition
    }
}

impl<T: Controller> DefinitionBuilder<T> {
    /// Mark as a controller
    pub fn controller(mut self) -> Self {
        self.definition.capabilities.controller = true;
        self.bind::<dyn Controller>(|c| c)
    }

    /// Declare a route answered by handler `handler`
    pub fn route(self, method: Method, path: impl Into<String>, handler: impl Into<String>) -> Self {
        self.push_route(method, path.into(), handler.into(), None)
    }

    /// Declare a route whose result is rendered with `view`
    pub fn route_with_view(
        self,
        method: Method,
        path: impl Into<String>,
        handler: impl Into<String>,
        view: impl Into<String>,
    ) -> Self {
        self.push_route(method, path.into(), handler.into(), Some(view.into()))
    }

    fn push_route(mut self, method: Method, path: String, handler: String, view: Option<String>) -> Self {
        self.definition.routes.push(RouteMapping {
            method,
            path,
            handler,
            view,
        });
        self.controller()
    }
}

impl<T: Interceptor> DefinitionBuilder<T> {
    /// Mark as a request interceptor
    pub fn interceptor(mut self) -> Self {
        self.definition.capabilities.interceptor = true;
        self.bind::<dyn Interceptor>(|i| i)
    }
}

impl<T: Aspect> DefinitionBuilder<T> {
    /// Mark as an aspect
    pub fn aspect(mut self) -> Self {
        self.definition.capabilities.aspect = true;
        self.bind::<dyn Aspect>(|a| a)
    }
}

impl<T: DefinitionPostProcessor> DefinitionBuilder<T> {
    /// Mark as a definition post-processor
    pub fn definition_post_processor(mut self) -> Self {
        self.definition.capabilities.definition_post_processor = true;
        self.bind::<dyn DefinitionPostProcessor>(|p| p)
    }
}

impl<T: InstancePostProcessor> DefinitionBuilder<T> {
    /// Mark as an instance post-processor
    pub fn instance_post_processor(mut self) -> Self {
        self.definition.capabilities.instance_post_processor = true;
        self.bind::<dyn InstancePostProcessor>(|p| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Database;

    #[derive(Default)]
    struct Repository;

    #[test]
    fn test_builder_records_metadata() {
        let def = ComponentDefinition::of::<Repository>()
            .depends_on::<Database>()
            .optional::<String>()
            .qualifier("primary")
            .profile("dev")
            .order(3)
            .prototype()
            .build();

        assert_eq!(def.token(), Token::of::<Repository>());
        assert_eq!(def.dependencies().len(), 2);
        assert!(def.dependencies()[0].required);
        assert!(!def.dependencies()[1].required);
        assert!(def.has_qualifier(&Qualifier::new("primary")));
        assert_eq!(def.order(), Some(3));
        assert_eq!(def.lifetime(), Lifetime::Prototype);
    }

    #[test]
    fn test_profile_activation() {
        let always = ComponentDefinition::of::<Database>().build();
        let dev = ComponentDefinition::of::<Repository>().profile("dev").build();

        let none: Vec<String> = Vec::new();
        let active = vec!["dev".to_string()];

        assert!(always.is_active(&none));
        assert!(always.is_active(&active));
        assert!(!dev.is_active(&none));
        assert!(dev.is_active(&active));
        assert!(!dev.is_active(&["prod".to_string()]));
    }

    #[test]
    fn test_own_token_is_bound_first() {
        let def = ComponentDefinition::of::<Database>().build();
        let tokens: Vec<Token> = def.bound_tokens().collect();
        assert_eq!(tokens, vec![Token::of::<Database>()]);
    }

    #[test]
    fn test_definition_mutation() {
        let mut def = ComponentDefinition::of::<Repository>().build();
        def.dependencies_mut().push(Dependency::required::<Database>());
        def.set_order(Some(-1));
        def.set_lifetime(Lifetime::Prototype);

        assert_eq!(def.dependencies()[0].token, Token::of::<Database>());
        assert_eq!(def.order(), Some(-1));
        assert_eq!(def.lifetime(), Lifetime::Prototype);
    }
}
