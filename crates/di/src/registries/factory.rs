use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::factory::{erase_factory, ErasedFactory, Factory};

/// Maps a type to the factory that builds it
pub trait FactoryRegistry: Send + Sync {
    fn find(&self, type_id: TypeId) -> Option<ErasedFactory>;
}

/// Table-backed factory registry.
///
/// Lookups that miss the local table fall through to child registries in the
/// order they were added.
#[derive(Default)]
pub struct FactoryTable {
    factories: HashMap<TypeId, ErasedFactory>,
    type_names: HashMap<TypeId, &'static str>,
    children: Vec<Arc<dyn FactoryRegistry>>,
}

impl FactoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory used to build `T`
    pub fn register<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Factory<T>,
    {
        let type_id = TypeId::of::<T>();
        self.factories.insert(type_id, erase_factory::<T, F>(factory));
        self.type_names.insert(type_id, std::any::type_name::<T>());
        self
    }

    /// Add a registry consulted when this table has no entry
    pub fn add_child_registry<R>(&mut self, registry: R) -> &mut Self
    where
        R: FactoryRegistry + 'static,
    {
        self.children.push(Arc::new(registry));
        self
    }

    /// Check if `T` has a factory in this table (children excluded)
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Names of the types registered in this table
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.type_names.values().copied().collect();
        names.sort_unstable();
        names
    }
}

impl FactoryRegistry for FactoryTable {
    fn find(&self, type_id: TypeId) -> Option<ErasedFactory> {
        if let Some(factory) = self.factories.get(&type_id) {
            return Some(factory.clone());
        }
        self.children.iter().find_map(|child| child.find(type_id))
    }
}

impl fmt::Debug for FactoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryTable")
            .field("factories", &self.registered_types())
            .field("children", &self.children.len())
            .finish()
    }
}
