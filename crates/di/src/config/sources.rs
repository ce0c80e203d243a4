use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::Environment;

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from the named environment variable
    EnvVar(&'static str),
    /// Taken from the preset of an environment
    Preset(Environment),
    /// Read from a YAML file
    File(PathBuf),
    /// Set through a `with_*` builder
    Programmatic,
}

impl ConfigSource {
    pub fn is_env_var(&self) -> bool {
        matches!(self, ConfigSource::EnvVar(_))
    }

    pub fn is_preset(&self) -> bool {
        matches!(self, ConfigSource::Preset(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, ConfigSource::File(_))
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::EnvVar(var) => write!(f, "environment variable {}", var),
            ConfigSource::Preset(environment) => write!(f, "{} preset", environment),
            ConfigSource::File(path) => write!(f, "file {}", path.display()),
            ConfigSource::Programmatic => f.write_str("set in code"),
        }
    }
}

/// Provenance of every field of a configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    fields: HashMap<&'static str, ConfigSource>,
}

impl ConfigSources {
    /// Every field in `fields` comes from the preset of `environment`
    pub(crate) fn preset(environment: Environment, fields: &[&'static str]) -> Self {
        let fields = fields
            .iter()
            .map(|field| (*field, ConfigSource::Preset(environment)))
            .collect();
        Self { fields }
    }

    pub(crate) fn record(&mut self, field: &'static str, source: ConfigSource) {
        self.fields.insert(field, source);
    }

    pub fn get(&self, field: &str) -> Option<&ConfigSource> {
        self.fields.get(field)
    }

    pub fn to_map(&self) -> HashMap<String, ConfigSource> {
        self.fields
            .iter()
            .map(|(field, source)| (field.to_string(), source.clone()))
            .collect()
    }
}
