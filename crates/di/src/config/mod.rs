pub mod injection_config;
pub mod sources;
pub mod validation;

pub use injection_config::{EnvConfig, Environment, InjectionConfig};
pub use sources::{ConfigSource, ConfigSources};
pub use validation::ConfigError;
