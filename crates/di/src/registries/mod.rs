pub mod factory;
pub mod locator;
pub mod member_injector;

pub use factory::{FactoryRegistry, FactoryTable};
pub use locator::{FactoryRegistryLocator, MemberInjectorRegistryLocator};
pub use member_injector::{MemberInjectorRegistry, MemberInjectorTable};
