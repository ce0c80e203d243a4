use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::sources::ConfigSources;
use crate::config::validation::parse_flag;
use crate::config::{ConfigError, ConfigSource};

pub const ENVIRONMENT_VAR: &str = "ELIF_DI_ENVIRONMENT";
pub const RUNTIME_CHECKS_VAR: &str = "ELIF_DI_RUNTIME_CHECKS";
pub const PREVENT_MULTIPLE_ROOT_SCOPES_VAR: &str = "ELIF_DI_PREVENT_MULTIPLE_ROOT_SCOPES";

const ENVIRONMENT_FIELD: &str = "environment";
const RUNTIME_CHECKS_FIELD: &str = "runtime_checks";
const PREVENT_MULTIPLE_ROOT_SCOPES_FIELD: &str = "prevent_multiple_root_scopes";
const FIELDS: [&str; 3] = [
    ENVIRONMENT_FIELD,
    RUNTIME_CHECKS_FIELD,
    PREVENT_MULTIPLE_ROOT_SCOPES_FIELD,
];

/// Configuration loadable from the process environment
pub trait EnvConfig: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Deployment environment selecting the preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Environment {
    const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Testing,
        Environment::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        }
    }

    /// Spellings accepted in environment variables and files
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Environment::Development => &["development", "dev"],
            Environment::Testing => &["testing", "test"],
            Environment::Production => &["production", "prod"],
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Runtime checks default to on everywhere but production
    pub fn runtime_checks(&self) -> bool {
        !self.is_production()
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Environment::ALL
            .into_iter()
            .find(|environment| environment.aliases().contains(&wanted.as_str()))
            .ok_or_else(|| {
                ConfigError::invalid_value(
                    ENVIRONMENT_FIELD,
                    s,
                    "development, testing, or production",
                )
            })
    }
}

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a YAML configuration file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    environment: Option<Environment>,
    runtime_checks: Option<bool>,
    prevent_multiple_root_scopes: Option<bool>,
}

/// Container behavior switches.
///
/// Every constructor starts from the preset of an environment and then
/// applies explicit values on top, so a missing value means the same thing
/// whether the configuration comes from the environment, a file or code.
/// Each field remembers where its value came from, see
/// [`EnvConfig::config_sources`].
#[derive(Debug, Clone)]
pub struct InjectionConfig {
    environment: Environment,
    runtime_checks: bool,
    prevent_multiple_root_scopes: bool,
    sources: ConfigSources,
}

impl InjectionConfig {
    /// Configuration for development: cycle detection on
    pub fn development() -> Self {
        Self::for_environment(Environment::Development)
    }

    pub fn testing() -> Self {
        Self::for_environment(Environment::Testing)
    }

    /// Configuration for production: no runtime checks
    pub fn production() -> Self {
        Self::for_environment(Environment::Production)
    }

    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            runtime_checks: environment.runtime_checks(),
            prevent_multiple_root_scopes: false,
            sources: ConfigSources::preset(environment, &FIELDS),
        }
    }

    pub fn with_prevent_multiple_root_scopes(mut self, prevent: bool) -> Self {
        self.set_prevent_multiple_root_scopes(prevent, ConfigSource::Programmatic);
        self
    }

    pub fn with_runtime_checks(mut self, enabled: bool) -> Self {
        self.set_runtime_checks(enabled, ConfigSource::Programmatic);
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Detect dependency cycles while resolving
    pub fn runtime_checks(&self) -> bool {
        self.runtime_checks
    }

    /// Refuse to open a second, unrelated root scope
    pub fn prevent_multiple_root_scopes(&self) -> bool {
        self.prevent_multiple_root_scopes
    }

    /// Load configuration from a YAML file.
    ///
    /// Keys missing from the file keep the preset of the file's environment,
    /// which itself defaults to development.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_yaml::from_str(&content)?;
        let origin = || ConfigSource::File(path.to_path_buf());

        let mut config = Self::for_environment(file.environment.unwrap_or(Environment::Development));
        if file.environment.is_some() {
            config.sources.record(ENVIRONMENT_FIELD, origin());
        }
        if let Some(enabled) = file.runtime_checks {
            config.set_runtime_checks(enabled, origin());
        }
        if let Some(prevent) = file.prevent_multiple_root_scopes {
            config.set_prevent_multiple_root_scopes(prevent, origin());
        }

        tracing::debug!("Loaded injection configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    fn set_runtime_checks(&mut self, enabled: bool, source: ConfigSource) {
        self.runtime_checks = enabled;
        self.sources.record(RUNTIME_CHECKS_FIELD, source);
    }

    fn set_prevent_multiple_root_scopes(&mut self, prevent: bool, source: ConfigSource) {
        self.prevent_multiple_root_scopes = prevent;
        self.sources.record(PREVENT_MULTIPLE_ROOT_SCOPES_FIELD, source);
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// Two configurations are equal when they behave the same, wherever their values came from
impl PartialEq for InjectionConfig {
    fn eq(&self, other: &Self) -> bool {
        self.environment == other.environment
            && self.runtime_checks == other.runtime_checks
            && self.prevent_multiple_root_scopes == other.prevent_multiple_root_scopes
    }
}

impl Eq for InjectionConfig {}

impl EnvConfig for InjectionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var(ENVIRONMENT_VAR) {
            Ok(value) => {
                let mut config = Self::for_environment(value.parse()?);
                config
                    .sources
                    .record(ENVIRONMENT_FIELD, ConfigSource::EnvVar(ENVIRONMENT_VAR));
                config
            }
            Err(_) => Self::development(),
        };

        if let Ok(value) = env::var(RUNTIME_CHECKS_VAR) {
            config.set_runtime_checks(
                parse_flag(RUNTIME_CHECKS_FIELD, &value)?,
                ConfigSource::EnvVar(RUNTIME_CHECKS_VAR),
            );
        }

        if let Ok(value) = env::var(PREVENT_MULTIPLE_ROOT_SCOPES_VAR) {
            config.set_prevent_multiple_root_scopes(
                parse_flag(PREVENT_MULTIPLE_ROOT_SCOPES_FIELD, &value)?,
                ConfigSource::EnvVar(PREVENT_MULTIPLE_ROOT_SCOPES_VAR),
            );
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.is_production() && self.runtime_checks {
            tracing::warn!("Runtime checks are enabled in production; resolution will be slower");
        }
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        self.sources.to_map()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tracing_test::traced_test;

    fn clear_env() {
        env::remove_var(ENVIRONMENT_VAR);
        env::remove_var(RUNTIME_CHECKS_VAR);
        env::remove_var(PREVENT_MULTIPLE_ROOT_SCOPES_VAR);
    }

    fn yaml_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_presets() {
        assert!(InjectionConfig::development().runtime_checks());
        assert!(InjectionConfig::testing().runtime_checks());
        assert!(!InjectionConfig::production().runtime_checks());
        assert_eq!(InjectionConfig::default(), InjectionConfig::development());

        let sources = InjectionConfig::testing().config_sources();
        assert_eq!(sources.len(), 3);
        assert!(sources.values().all(|source| source.is_preset()));
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!(" Test ".parse::<Environment>().unwrap(), Environment::Testing);
        assert_eq!(Environment::Development.to_string(), "development");

        let err = "staging".parse::<Environment>().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, ref value, .. } if field == "environment" && value == "staging"
        ));
    }

    #[test]
    fn test_builders_are_programmatic() {
        let config = InjectionConfig::production()
            .with_runtime_checks(true)
            .with_prevent_multiple_root_scopes(true);

        assert!(config.runtime_checks());
        assert!(config.prevent_multiple_root_scopes());

        let sources = config.config_sources();
        assert_eq!(sources["runtime_checks"], ConfigSource::Programmatic);
        assert_eq!(sources["prevent_multiple_root_scopes"], ConfigSource::Programmatic);
        assert_eq!(
            sources["environment"],
            ConfigSource::Preset(Environment::Production)
        );
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();

        let config = InjectionConfig::from_env().unwrap();
        assert_eq!(config, InjectionConfig::development());

        let sources = config.config_sources();
        assert!(sources["environment"].is_preset());
        assert!(sources["runtime_checks"].is_preset());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var(ENVIRONMENT_VAR, "production");
        env::set_var(PREVENT_MULTIPLE_ROOT_SCOPES_VAR, "yes");

        let config = InjectionConfig::from_env().unwrap();
        assert_eq!(config.environment(), Environment::Production);
        assert!(!config.runtime_checks());
        assert!(config.prevent_multiple_root_scopes());

        let sources = config.config_sources();
        assert_eq!(sources["environment"], ConfigSource::EnvVar(ENVIRONMENT_VAR));
        assert_eq!(
            sources["runtime_checks"],
            ConfigSource::Preset(Environment::Production)
        );

        env::set_var(RUNTIME_CHECKS_VAR, "true");
        let config = InjectionConfig::from_env().unwrap();
        assert!(config.runtime_checks());
        assert!(config.config_sources()["runtime_checks"].is_env_var());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_values() {
        clear_env();
        env::set_var(RUNTIME_CHECKS_VAR, "sometimes");

        let err = InjectionConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "runtime_checks"));

        clear_env();
        env::set_var(ENVIRONMENT_VAR, "staging");
        assert!(InjectionConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_load_yaml() {
        let file = yaml_file(&["environment: production", "prevent_multiple_root_scopes: true"]);

        let config = InjectionConfig::load(file.path()).unwrap();
        assert_eq!(config.environment(), Environment::Production);
        assert!(config.prevent_multiple_root_scopes());
        // missing keys keep the preset of the file's environment
        assert!(!config.runtime_checks());

        let sources = config.config_sources();
        assert_eq!(
            sources["environment"],
            ConfigSource::File(file.path().to_path_buf())
        );
        assert!(sources["prevent_multiple_root_scopes"].is_file());
        assert_eq!(
            sources["runtime_checks"],
            ConfigSource::Preset(Environment::Production)
        );
    }

    #[test]
    #[serial]
    fn test_file_and_env_agree_on_missing_values() {
        clear_env();
        env::set_var(ENVIRONMENT_VAR, "production");
        let from_env = InjectionConfig::from_env().unwrap();
        clear_env();

        let file = yaml_file(&["environment: production"]);
        let from_file = InjectionConfig::load(file.path()).unwrap();

        assert_eq!(from_env, from_file);
        assert_eq!(from_env.runtime_checks(), from_file.runtime_checks());
    }

    #[test]
    fn test_load_accepts_aliases_and_empty_files() {
        let file = yaml_file(&["environment: prod"]);
        assert_eq!(
            InjectionConfig::load(file.path()).unwrap().environment(),
            Environment::Production
        );

        let empty = yaml_file(&["{}"]);
        assert_eq!(
            InjectionConfig::load(empty.path()).unwrap(),
            InjectionConfig::development()
        );
    }

    #[test]
    fn test_load_rejects_unknown_keys_and_bad_environments() {
        let unknown = yaml_file(&["runtime_check: true"]);
        assert!(matches!(
            InjectionConfig::load(unknown.path()),
            Err(ConfigError::Yaml(_))
        ));

        let staging = yaml_file(&["environment: staging"]);
        assert!(matches!(
            InjectionConfig::load(staging.path()),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    #[traced_test]
    fn test_production_with_checks_warns() {
        let file = yaml_file(&["environment: production", "runtime_checks: true"]);

        let config = InjectionConfig::load(file.path()).unwrap();

        assert!(config.runtime_checks());
        assert!(logs_contain("Runtime checks are enabled in production"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = InjectionConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
