//! Configuration properties
//!
//! Properties are plain `key -> string` pairs merged from one or more
//! [`PropertySource`]s. The runtime itself reads a single key,
//! [`ACTIVE_PROFILES_KEY`], to decide which profile-gated components are
//! instantiated. Components can read any key through
//! [`Dependencies::property`](crate::Dependencies::property).

use crate::{BoxError, DiError, Result};
use ahash::RandomState;
use std::collections::HashMap;

/// Key holding the comma separated list of active profiles
pub const ACTIVE_PROFILES_KEY: &str = "profiles.active";

/// Default prefix for [`EnvPropertySource`]
pub const DEFAULT_ENV_PREFIX: &str = "APP_";

/// A source of configuration properties
pub trait PropertySource: Send + Sync {
    /// Name used in error messages and logs
    fn name(&self) -> &str;

    /// Load every property this source provides
    fn load(&self) -> std::result::Result<Vec<(String, String)>, BoxError>;
}

/// In-memory property source
#[derive(Debug, Clone, Default)]
pub struct MapPropertySource {
    name: String,
    entries: Vec<(String, String)>,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> std::result::Result<Vec<(String, String)>, BoxError> {
        Ok(self.entries.clone())
    }
}

/// Properties from environment variables.
///
/// `APP_PROFILES_ACTIVE=dev` becomes `profiles.active = dev`: the prefix is
/// stripped, the rest lowercased and `_` turned into `.`.
#[derive(Debug, Clone)]
pub struct EnvPropertySource {
    prefix: String,
    snapshot: Option<Vec<(String, String)>>,
}

impl EnvPropertySource {
    /// Read the process environment with `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            snapshot: None,
        }
    }

    /// Use a fixed set of variables instead of the process environment
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            snapshot: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn translate(&self, name: &str) -> Option<String> {
        let rest = name.strip_prefix(&self.prefix)?;
        if rest.is_empty() {
            return None;
        }
        Some(rest.to_ascii_lowercase().replace('_', "."))
    }
}

impl Default for EnvPropertySource {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

impl PropertySource for EnvPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn load(&self) -> std::result::Result<Vec<(String, String)>, BoxError> {
        let vars: Vec<(String, String)> = match &self.snapshot {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };
        Ok(vars
            .into_iter()
            .filter_map(|(name, value)| self.translate(&name).map(|key| (key, value)))
            .collect())
    }
}

/// Merged configuration properties. Later sources override earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    values: HashMap<String, String, RandomState>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and merge `sources` in order
    pub fn load<'a, I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a dyn PropertySource>,
    {
        let mut properties = Self::new();
        for source in sources {
            let entries = source
                .load()
                .map_err(|e| DiError::Configuration(format!("{}: {e}", source.name())))?;

            #[cfg(feature = "logging")]
            tracing::debug!(
                target: "ioc_runtime",
                source = source.name(),
                count = entries.len(),
                "Loaded property source"
            );

            properties.values.extend(entries);
        }
        Ok(properties)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Profiles listed under [`ACTIVE_PROFILES_KEY`]
    pub fn active_profiles(&self) -> Vec<String> {
        self.get(ACTIVE_PROFILES_KEY)
            .map(parse_profiles)
            .unwrap_or_default()
    }
}

/// Split a comma or whitespace separated profile list, dropping blanks and repeats
pub fn parse_profiles(raw: &str) -> Vec<String> {
    let mut profiles: Vec<String> = Vec::new();
    for name in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let name = name.trim();
        if !name.is_empty() && !profiles.iter().any(|p| p == name) {
            profiles.push(name.to_string());
        }
    }
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profiles() {
        assert_eq!(parse_profiles("dev, test ,,dev  local"), vec!["dev", "test", "local"]);
        assert!(parse_profiles(" , ").is_empty());
    }

    #[test]
    fn test_later_sources_override() {
        let defaults = MapPropertySource::new("defaults")
            .with(ACTIVE_PROFILES_KEY, "prod")
            .with("server.port", "8080");
        let overrides = MapPropertySource::new("overrides").with(ACTIVE_PROFILES_KEY, "dev,test");

        let sources: Vec<&dyn PropertySource> = vec![&defaults, &overrides];
        let properties = Properties::load(sources).unwrap();

        assert_eq!(properties.get("server.port"), Some("8080"));
        assert_eq!(properties.active_profiles(), vec!["dev", "test"]);
    }

    #[test]
    fn test_env_translation() {
        let env = EnvPropertySource::from_vars(
            "APP_",
            [
                ("APP_PROFILES_ACTIVE", "dev"),
                ("APP_SERVER_PORT", "9000"),
                ("HOME", "/root"),
                ("APP_", "ignored"),
            ],
        );

        let properties = Properties::load([&env as &dyn PropertySource]).unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties.get("server.port"), Some("9000"));
        assert_eq!(properties.active_profiles(), vec!["dev"]);
    }

    #[test]
    fn test_failing_source() {
        struct Broken;

        impl PropertySource for Broken {
            fn name(&self) -> &str {
                "broken"
            }

            fn load(&self) -> std::result::Result<Vec<(String, String)>, BoxError> {
                Err("unreadable".into())
            }
        }

        let err = Properties::load([&Broken as &dyn PropertySource]).unwrap_err();
        assert!(matches!(err, DiError::Configuration(msg) if msg == "broken: unreadable"));
    }
}
