use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

use crate::errors::InjectionResult;
use crate::key::Key;
use crate::scope::Scope;

/// Supplies instances of `T` on demand
pub trait Provider<T: ?Sized + Send + Sync + 'static>: Send + Sync + 'static {
    fn get(&self) -> InjectionResult<Arc<T>>;
}

/// Provider that resolves its key from a scope on every call.
///
/// Each call goes through the scope again, so unscoped types yield a new
/// instance while singletons yield the cached one.
pub struct ScopedProvider<T: ?Sized> {
    scope: Scope,
    key: Key,
    _marker: std::marker::PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ScopedProvider<T> {
    pub(crate) fn new(scope: Scope, key: Key) -> Self {
        Self {
            scope,
            key,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }
}

impl<T: ?Sized + Send + Sync + 'static> Provider<T> for ScopedProvider<T> {
    fn get(&self) -> InjectionResult<Arc<T>> {
        self.scope.resolve::<T>(&self.key)
    }
}

impl<T: ?Sized> fmt::Debug for ScopedProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedProvider")
            .field("scope", &self.scope.name())
            .field("key", &self.key)
            .finish()
    }
}

/// Resolves its key on first use and keeps the result
pub struct Lazy<T: ?Sized> {
    scope: Scope,
    key: Key,
    value: OnceCell<Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Lazy<T> {
    pub(crate) fn new(scope: Scope, key: Key) -> Self {
        Self {
            scope,
            key,
            value: OnceCell::new(),
        }
    }

    /// Resolve on the first call, then return the same instance
    pub fn get(&self) -> InjectionResult<Arc<T>> {
        self.value
            .get_or_try_init(|| self.scope.resolve::<T>(&self.key))
            .map(Arc::clone)
    }

    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Provider<T> for Lazy<T> {
    fn get(&self) -> InjectionResult<Arc<T>> {
        Lazy::get(self)
    }
}

impl<T: ?Sized> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("scope", &self.scope.name())
            .field("key", &self.key)
            .field("resolved", &self.value.get().is_some())
            .finish()
    }
}
