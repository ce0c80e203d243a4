use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::member_injector::{erase_member_injector, ErasedMemberInjector, MemberInjector};

/// Maps a type to the injector that fills its declared dependencies
pub trait MemberInjectorRegistry: Send + Sync {
    fn find(&self, type_id: TypeId) -> Option<ErasedMemberInjector>;
}

/// Table-backed member injector registry with optional child registries
#[derive(Default)]
pub struct MemberInjectorTable {
    injectors: HashMap<TypeId, ErasedMemberInjector>,
    type_names: HashMap<TypeId, &'static str>,
    children: Vec<Arc<dyn MemberInjectorRegistry>>,
}

impl MemberInjectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the member injector for `T`
    pub fn register<T, M>(&mut self, injector: M) -> &mut Self
    where
        T: Send + Sync + 'static,
        M: MemberInjector<T>,
    {
        let type_id = TypeId::of::<T>();
        self.injectors
            .insert(type_id, erase_member_injector::<T, M>(injector));
        self.type_names.insert(type_id, std::any::type_name::<T>());
        self
    }

    pub fn add_child_registry<R>(&mut self, registry: R) -> &mut Self
    where
        R: MemberInjectorRegistry + 'static,
    {
        self.children.push(Arc::new(registry));
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.injectors.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.injectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.injectors.is_empty()
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.type_names.values().copied().collect();
        names.sort_unstable();
        names
    }
}

impl MemberInjectorRegistry for MemberInjectorTable {
    fn find(&self, type_id: TypeId) -> Option<ErasedMemberInjector> {
        if let Some(injector) = self.injectors.get(&type_id) {
            return Some(injector.clone());
        }
        self.children.iter().find_map(|child| child.find(type_id))
    }
}

impl fmt::Debug for MemberInjectorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInjectorTable")
            .field("injectors", &self.registered_types())
            .field("children", &self.children.len())
            .finish()
    }
}
