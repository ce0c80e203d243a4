//! Process-wide root registries.
//!
//! Both slots start empty. Scopes consult them whenever an unnamed type has no
//! explicit binding, so they must be installed before the first resolution.

use once_cell::sync::Lazy;
use std::any::TypeId;
use std::sync::{Arc, RwLock};

use crate::errors::{InjectionError, InjectionResult};
use crate::factory::{downcast_factory, Factory};
use crate::member_injector::{downcast_member_injector, MemberInjector};
use crate::registries::factory::FactoryRegistry;
use crate::registries::member_injector::MemberInjectorRegistry;

/// A replaceable slot holding one root registry
struct RootSlot<R: ?Sized> {
    resource: &'static str,
    registry: RwLock<Option<Arc<R>>>,
}

impl<R: ?Sized> RootSlot<R> {
    const fn new(resource: &'static str) -> Self {
        Self {
            resource,
            registry: RwLock::new(None),
        }
    }

    fn install(&self, registry: Arc<R>) -> InjectionResult<bool> {
        let mut slot = self
            .registry
            .write()
            .map_err(|_| InjectionError::lock_poisoned(self.resource))?;
        Ok(slot.replace(registry).is_some())
    }

    fn clear(&self) -> InjectionResult<()> {
        let mut slot = self
            .registry
            .write()
            .map_err(|_| InjectionError::lock_poisoned(self.resource))?;
        slot.take();
        Ok(())
    }

    fn current(&self) -> InjectionResult<Option<Arc<R>>> {
        let slot = self
            .registry
            .read()
            .map_err(|_| InjectionError::lock_poisoned(self.resource))?;
        Ok(slot.clone())
    }
}

static ROOT_FACTORY_REGISTRY: Lazy<RootSlot<dyn FactoryRegistry>> =
    Lazy::new(|| RootSlot::new("root_factory_registry"));

static ROOT_MEMBER_INJECTOR_REGISTRY: Lazy<RootSlot<dyn MemberInjectorRegistry>> =
    Lazy::new(|| RootSlot::new("root_member_injector_registry"));

/// Access point for the process-wide factory registry
#[derive(Debug, Clone, Copy)]
pub struct FactoryRegistryLocator;

impl FactoryRegistryLocator {
    /// Install `registry` as the root factory lookup, replacing any previous one
    pub fn set_root_registry<R>(registry: R) -> InjectionResult<()>
    where
        R: FactoryRegistry + 'static,
    {
        let replaced = ROOT_FACTORY_REGISTRY.install(Arc::new(registry))?;
        if replaced {
            tracing::warn!("Replacing root factory registry");
        } else {
            tracing::info!("Installed root factory registry");
        }
        Ok(())
    }

    pub fn clear_root_registry() -> InjectionResult<()> {
        ROOT_FACTORY_REGISTRY.clear()
    }

    pub fn is_installed() -> bool {
        matches!(ROOT_FACTORY_REGISTRY.current(), Ok(Some(_)))
    }

    /// Look up the factory for `T` in the root registry
    pub fn factory_for<T>() -> InjectionResult<Arc<dyn Factory<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let registry = ROOT_FACTORY_REGISTRY
            .current()?
            .ok_or(InjectionError::registry_not_installed("factory"))?;

        let erased = registry
            .find(TypeId::of::<T>())
            .ok_or_else(InjectionError::no_factory::<T>)?;

        downcast_factory::<T>(&erased).ok_or_else(InjectionError::type_mismatch::<T>)
    }
}

/// Access point for the process-wide member injector registry
#[derive(Debug, Clone, Copy)]
pub struct MemberInjectorRegistryLocator;

impl MemberInjectorRegistryLocator {
    /// Install `registry` as the root member injector lookup, replacing any previous one
    pub fn set_root_registry<R>(registry: R) -> InjectionResult<()>
    where
        R: MemberInjectorRegistry + 'static,
    {
        let replaced = ROOT_MEMBER_INJECTOR_REGISTRY.install(Arc::new(registry))?;
        if replaced {
            tracing::warn!("Replacing root member injector registry");
        } else {
            tracing::info!("Installed root member injector registry");
        }
        Ok(())
    }

    pub fn clear_root_registry() -> InjectionResult<()> {
        ROOT_MEMBER_INJECTOR_REGISTRY.clear()
    }

    pub fn is_installed() -> bool {
        matches!(ROOT_MEMBER_INJECTOR_REGISTRY.current(), Ok(Some(_)))
    }

    /// Look up the member injector for `T` in the root registry
    pub fn member_injector_for<T>() -> InjectionResult<Arc<dyn MemberInjector<T>>>
    where
        T: Send + Sync + 'static,
    {
        let registry = ROOT_MEMBER_INJECTOR_REGISTRY
            .current()?
            .ok_or(InjectionError::registry_not_installed("member injector"))?;

        let erased = registry
            .find(TypeId::of::<T>())
            .ok_or_else(InjectionError::no_member_injector::<T>)?;

        downcast_member_injector::<T>(&erased).ok_or_else(InjectionError::type_mismatch::<T>)
    }
}
