use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::errors::{InjectionError, InjectionResult};
use crate::scope::Scope;

/// Populates the declared dependencies of an already constructed value
pub trait MemberInjector<T: Send + Sync + 'static>: Send + Sync + 'static {
    fn inject(&self, target: &mut T, scope: &Scope) -> InjectionResult<()>;
}

/// Type-erased member injector as stored by registries.
///
/// Always holds an `Arc<dyn MemberInjector<T>>` for the `T` it is registered under.
pub type ErasedMemberInjector = Arc<dyn Any + Send + Sync>;

pub(crate) fn erase_member_injector<T, M>(injector: M) -> ErasedMemberInjector
where
    T: Send + Sync + 'static,
    M: MemberInjector<T>,
{
    let typed: Arc<dyn MemberInjector<T>> = Arc::new(injector);
    Arc::new(typed)
}

pub(crate) fn downcast_member_injector<T>(
    erased: &ErasedMemberInjector,
) -> Option<Arc<dyn MemberInjector<T>>>
where
    T: Send + Sync + 'static,
{
    erased.downcast_ref::<Arc<dyn MemberInjector<T>>>().cloned()
}

/// Write-once slot for a member-injected dependency
pub struct Injected<T: ?Sized> {
    slot: OnceCell<Arc<T>>,
}

impl<T: ?Sized + 'static> Injected<T> {
    pub fn new() -> Self {
        Self {
            slot: OnceCell::new(),
        }
    }

    /// Fill the slot. A slot can only be filled once.
    pub fn set(&self, value: Arc<T>) -> InjectionResult<()> {
        self.slot
            .set(value)
            .map_err(|_| InjectionError::AlreadyInjected {
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    /// Get the injected dependency
    pub fn get(&self) -> InjectionResult<&Arc<T>> {
        self.slot.get().ok_or_else(|| InjectionError::NotInjected {
            type_name: std::any::type_name::<T>().to_string(),
        })
    }

    pub fn is_injected(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T: ?Sized + 'static> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("type", &std::any::type_name::<T>())
            .field("injected", &self.slot.get().is_some())
            .finish()
    }
}
