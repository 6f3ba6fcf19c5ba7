//! Post-processing and aspect hooks
//!
//! Definition post-processors run before anything else is instantiated and may
//! rewrite the remaining definitions. Instance post-processors see every
//! ordinary component right after construction and may replace it.

use crate::{BoxError, ComponentDefinition, Instance};

/// Rewrites definitions before instantiation.
///
/// May only depend on other definition post-processors.
///
/// # Example
///
/// ```rust
/// use ioc_runtime::{BoxError, ComponentDefinition, DefinitionPostProcessor, Lifetime};
///
/// /// Turns every definition tagged "request" into a prototype.
/// struct RequestScoped;
///
/// impl DefinitionPostProcessor for RequestScoped {
///     fn post_process(&self, definition: &mut ComponentDefinition) -> Result<(), BoxError> {
///         if definition.has_qualifier(&"request".into()) {
///             definition.set_lifetime(Lifetime::Prototype);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait DefinitionPostProcessor: Send + Sync + 'static {
    fn post_process(&self, definition: &mut ComponentDefinition) -> Result<(), BoxError>;
}

/// Transforms component instances right after construction.
///
/// The returned instance is what gets stored. It must keep the concrete type
/// of the component, wrapping is done by returning a different value of the
/// same type.
pub trait InstancePostProcessor: Send + Sync + 'static {
    fn post_process(
        &self,
        definition: &ComponentDefinition,
        instance: Instance,
    ) -> Result<Instance, BoxError>;
}

/// A component providing cross-cutting behaviour.
///
/// The application context exposes aspects ordered by their declared rank.
pub trait Aspect: Send + Sync + 'static {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
