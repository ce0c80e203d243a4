//! Sample components for elif-di.
//!
//! A [`Computer`] gets its [`Multiplier`] through member injection when it is
//! resolved from a scope with the sample registries installed.

pub mod computer;
pub mod multiplier;
pub mod registries;

pub use computer::{Computer, ComputerFactory, ComputerMemberInjector};
pub use multiplier::{Multiplier, MultiplierFactory};
pub use registries::{FactoryRegistry, MemberInjectorRegistry};
