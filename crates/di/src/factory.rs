use std::any::Any;
use std::sync::Arc;

use crate::errors::InjectionResult;
use crate::scope::Scope;

/// Produces instances of `T` for a scope.
///
/// A factory is looked up through the root factory registry whenever a scope
/// has no explicit binding for an unnamed type. Besides building the value it
/// decides which scope owns the instance and whether that scope caches it.
///
/// An unscoped factory builds in the requesting scope on every call and its
/// other metadata is not consulted. A scoped factory builds in
/// [`target_scope`](Factory::target_scope), which also caches the instance
/// when [`has_singleton_annotation`](Factory::has_singleton_annotation) is set.
pub trait Factory<T: ?Sized + Send + Sync + 'static>: Send + Sync + 'static {
    /// Build a new instance, resolving dependencies from `scope`
    fn create_instance(&self, scope: &Scope) -> InjectionResult<Arc<T>>;

    /// The scope that owns instances built by this factory, read only when
    /// `has_scope_annotation` is set
    fn target_scope(&self, scope: &Scope) -> InjectionResult<Scope> {
        Ok(scope.clone())
    }

    /// Whether `T` is tied to an annotated scope rather than the caller's
    fn has_scope_annotation(&self) -> bool {
        false
    }

    /// Whether the target scope keeps a single instance of `T`
    fn has_singleton_annotation(&self) -> bool {
        false
    }

    /// Whether the cached singleton may be dropped by `Scope::release`
    fn has_releasable_annotation(&self) -> bool {
        false
    }
}

/// Type-erased factory as stored by registries.
///
/// Always holds an `Arc<dyn Factory<T>>` for the `T` it is registered under.
pub type ErasedFactory = Arc<dyn Any + Send + Sync>;

pub(crate) fn erase_factory<T, F>(factory: F) -> ErasedFactory
where
    T: ?Sized + Send + Sync + 'static,
    F: Factory<T>,
{
    let typed: Arc<dyn Factory<T>> = Arc::new(factory);
    Arc::new(typed)
}

pub(crate) fn downcast_factory<T>(erased: &ErasedFactory) -> Option<Arc<dyn Factory<T>>>
where
    T: ?Sized + Send + Sync + 'static,
{
    erased.downcast_ref::<Arc<dyn Factory<T>>>().cloned()
}
