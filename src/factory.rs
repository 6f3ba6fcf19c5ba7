//! Type-erased construction
//!
//! A [`ComponentDefinition`](crate::ComponentDefinition) is untyped once it
//! leaves its builder. This module holds the erased pieces it carries:
//!
//! - the factory closure, fed with [`Dependencies`]
//! - the bindings that turn a raw instance into typed views (`Arc<T>`,
//!   `Arc<dyn Trait>`)
//! - the post-construct / pre-destroy hooks

use crate::config::Properties;
use crate::definition::ComponentDefinition;
use crate::storage::ComponentStore;
use crate::{BoxError, DiError, Injectable, Qualifier, Result, Token};
use std::any::Any;
use std::sync::Arc;

/// A type-erased component instance. The inner value is the concrete component.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Erased factory function
pub(crate) type FactoryFn =
    Arc<dyn Fn(&Dependencies<'_>) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// Erased lifecycle hook
pub(crate) type HookFn = Arc<dyn Fn(&Instance) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Erased view constructor: raw instance in, `Arc<Arc<U>>` out
type CastFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

pub(crate) fn erase_factory<T, F>(factory: F) -> FactoryFn
where
    T: Injectable,
    F: Fn(&Dependencies<'_>) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
{
    Arc::new(move |deps: &Dependencies<'_>| {
        factory(deps).map(|value| Arc::new(value) as Instance)
    })
}

pub(crate) fn erase_hook<T, F>(hook: F) -> HookFn
where
    T: Injectable,
    F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(move |raw: &Instance| match (**raw).downcast_ref::<T>() {
        Some(value) => hook(value),
        None => Err(format!("instance is no longer a {}", std::any::type_name::<T>()).into()),
    })
}

/// A token under which a definition can be resolved, with the cast that
/// produces the matching view.
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) token: Token,
    cast: CastFn,
}

impl Binding {
    /// Binding of a component to its own type
    pub(crate) fn identity<T: Injectable>() -> Self {
        Self::new::<T, T>(|value| value)
    }

    /// Binding of a component to a base type `U` (usually `dyn Trait`)
    pub(crate) fn new<T, U>(cast: fn(Arc<T>) -> Arc<U>) -> Self
    where
        T: Injectable,
        U: ?Sized + Send + Sync + 'static,
    {
        Self {
            token: Token::of::<U>(),
            cast: Arc::new(move |raw: &Instance| {
                let typed = Arc::clone(raw).downcast::<T>().ok()?;
                Some(Arc::new(cast(typed)) as Instance)
            }),
        }
    }

    /// Build the view, `None` if the instance is not of the bound type
    #[inline]
    pub(crate) fn view(&self, raw: &Instance) -> Option<Instance> {
        (self.cast)(raw)
    }
}

/// Recover `Arc<T>` from a view built by a [`Binding`]
#[inline]
pub(crate) fn downcast_view<T: ?Sized + 'static>(view: &Instance) -> Option<Arc<T>> {
    (**view).downcast_ref::<Arc<T>>().cloned()
}

/// Dependency access handed to a component factory.
///
/// Only components that were declared as dependencies are guaranteed to be
/// constructed when the factory runs.
pub struct Dependencies<'a> {
    store: &'a ComponentStore,
    owner: &'a ComponentDefinition,
}

impl<'a> Dependencies<'a> {
    pub(crate) fn new(store: &'a ComponentStore, owner: &'a ComponentDefinition) -> Self {
        Self { store, owner }
    }

    /// Resolve the single component bound to `T`
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.lookup::<T>(None)
    }

    /// Resolve the component bound to `T` and tagged with `qualifier`
    pub fn get_qualified<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: &Qualifier,
    ) -> Result<Arc<T>> {
        self.lookup::<T>(Some(qualifier))
    }

    /// Resolve `T` if a component is bound to it
    pub fn optional<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        match self.lookup::<T>(None) {
            Ok(found) => Ok(Some(found)),
            Err(DiError::NoSuchComponent { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Every component tagged with `qualifier` that is bound to `T`, in registration order
    pub fn all<T: ?Sized + Send + Sync + 'static>(&self, qualifier: &Qualifier) -> Result<Vec<Arc<T>>> {
        self.store.all_views::<T>(qualifier, Some(self.owner))
    }

    /// Loaded configuration properties
    #[inline]
    pub fn properties(&self) -> &Properties {
        self.store.properties()
    }

    /// Shortcut for `properties().get(key)`
    #[inline]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.store.properties().get(key)
    }

    fn lookup<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> Result<Arc<T>> {
        let token = Token::of::<T>();
        let index = self.store.select(token, qualifier)?;
        let view = self.store.view(index, token, Some(self.owner))?;
        downcast_view::<T>(&view).ok_or_else(|| {
            DiError::creation_failed(self.owner.token(), format!("{token} resolved to a foreign type"))
        })
    }
}
