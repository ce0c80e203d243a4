//! Scoped dependency injection for elif.rs.
//!
//! Instances are resolved from named [`Scope`]s opened through [`Injector`].
//! A scope first looks for explicit [`Module`] bindings in itself and its
//! ancestors, then falls back to the process-wide factory registry installed
//! with [`FactoryRegistryLocator::set_root_registry`]. Dependencies declared on
//! an existing value are filled by the member injector registry installed with
//! [`MemberInjectorRegistryLocator::set_root_registry`].

pub mod config;
pub mod errors;
pub mod factory;
pub mod injector;
pub mod key;
pub mod member_injector;
pub mod module;
pub mod provider;
pub mod registries;
mod runtime_checks;
pub mod scope;

pub use config::{ConfigError, ConfigSource, ConfigSources, EnvConfig, Environment, InjectionConfig};
pub use errors::{InjectionError, InjectionResult};
pub use factory::{ErasedFactory, Factory};
pub use injector::Injector;
pub use key::Key;
pub use member_injector::{ErasedMemberInjector, Injected, MemberInjector};
pub use module::{BindingBuilder, Module};
pub use provider::{Lazy, Provider, ScopedProvider};
pub use registries::{
    FactoryRegistry, FactoryRegistryLocator, FactoryTable, MemberInjectorRegistry,
    MemberInjectorRegistryLocator, MemberInjectorTable,
};
pub use scope::{Scope, SINGLETON_ANNOTATION};
