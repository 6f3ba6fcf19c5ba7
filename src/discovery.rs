//! Component discovery
//!
//! A discovery source yields the definitions an application context should
//! register on start. There is no classpath to scan: sources are explicit
//! lists or functions returning definitions, usually one per module.

use crate::definition::ComponentDefinition;
use crate::Result;

/// Yields component definitions when the context starts
pub trait DiscoverySource: Send + Sync {
    fn discover(&self) -> Result<Vec<ComponentDefinition>>;
}

/// A fixed list of definitions, handed out again on every start
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    definitions: Vec<ComponentDefinition>,
}

impl StaticDiscovery {
    pub fn new(definitions: Vec<ComponentDefinition>) -> Self {
        Self { definitions }
    }

    pub fn with(mut self, definition: ComponentDefinition) -> Self {
        self.definitions.push(definition);
        self
    }
}

impl DiscoverySource for StaticDiscovery {
    fn discover(&self) -> Result<Vec<ComponentDefinition>> {
        Ok(self.definitions.clone())
    }
}

impl<F> DiscoverySource for F
where
    F: Fn() -> Vec<ComponentDefinition> + Send + Sync,
{
    fn discover(&self) -> Result<Vec<ComponentDefinition>> {
        Ok(self())
    }
}
