//! Registries for the sample components.
//!
//! Install both before opening any scope:
//!
//! ```
//! use elif_di::{FactoryRegistryLocator, MemberInjectorRegistryLocator};
//! use elif_di_sample::{FactoryRegistry, MemberInjectorRegistry};
//!
//! MemberInjectorRegistryLocator::set_root_registry(MemberInjectorRegistry::new()).unwrap();
//! FactoryRegistryLocator::set_root_registry(FactoryRegistry::new()).unwrap();
//! ```

use std::any::TypeId;

use elif_di::FactoryRegistry as _;
use elif_di::MemberInjectorRegistry as _;
use elif_di::{ErasedFactory, ErasedMemberInjector, FactoryTable, MemberInjectorTable};

use crate::computer::{Computer, ComputerFactory, ComputerMemberInjector};
use crate::multiplier::{Multiplier, MultiplierFactory};

/// Factories for every sample component
#[derive(Debug)]
pub struct FactoryRegistry {
    table: FactoryTable,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        let mut table = FactoryTable::new();
        table
            .register::<Computer, _>(ComputerFactory)
            .register::<Multiplier, _>(MultiplierFactory);
        Self { table }
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl elif_di::FactoryRegistry for FactoryRegistry {
    fn find(&self, type_id: TypeId) -> Option<ErasedFactory> {
        self.table.find(type_id)
    }
}

/// Member injectors for sample components with injected members
#[derive(Debug)]
pub struct MemberInjectorRegistry {
    table: MemberInjectorTable,
}

impl MemberInjectorRegistry {
    pub fn new() -> Self {
        let mut table = MemberInjectorTable::new();
        table.register::<Computer, _>(ComputerMemberInjector);
        Self { table }
    }
}

impl Default for MemberInjectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl elif_di::MemberInjectorRegistry for MemberInjectorRegistry {
    fn find(&self, type_id: TypeId) -> Option<ErasedMemberInjector> {
        self.table.find(type_id)
    }
}
