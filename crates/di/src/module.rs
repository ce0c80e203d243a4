//! Explicit bindings installed into a scope.
//!
//! ```ignore
//! let mut module = Module::new();
//! module.bind::<dyn Clock>().to_type::<SystemClock>(|clock| clock);
//! module.bind::<String>().named("greeting").to_instance(Arc::new("hi".to_string()));
//! scope.install_modules(vec![module])?;
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::{InjectionError, InjectionResult};
use crate::key::Key;
use crate::provider::Provider;
use crate::scope::Scope;

type ScopeFn<T> = dyn Fn(&Scope) -> InjectionResult<Arc<T>> + Send + Sync;

/// What a binding resolves to
enum Target<T: ?Sized> {
    Instance(Arc<T>),
    ProviderInstance(Arc<dyn Provider<T>>),
    Provider(Arc<ScopeFn<T>>),
}

/// A single type-erased binding
pub(crate) struct Binding {
    key: Key,
    target: Arc<dyn Any + Send + Sync>,
    kind: &'static str,
    singleton: bool,
    releasable: bool,
}

impl Binding {
    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    /// Whether the owning scope caches what this binding produces
    pub(crate) fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub(crate) fn is_releasable(&self) -> bool {
        self.releasable
    }

    /// Produce a value, resolving provider dependencies from `owner`
    pub(crate) fn provide<T>(&self, owner: &Scope) -> InjectionResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let target = self
            .target
            .downcast_ref::<Target<T>>()
            .ok_or_else(InjectionError::type_mismatch::<T>)?;

        match target {
            Target::Instance(instance) => Ok(instance.clone()),
            Target::ProviderInstance(provider) => provider.get(),
            Target::Provider(provide) => provide(owner),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("singleton", &self.singleton)
            .field("releasable", &self.releasable)
            .finish()
    }
}

/// A set of bindings to install into a scope
#[derive(Debug, Default)]
pub struct Module {
    bindings: Vec<Binding>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a binding for `T`
    pub fn bind<T>(&mut self) -> BindingBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        BindingBuilder {
            module: self,
            name: None,
            singleton: false,
            releasable: false,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn into_bindings(self) -> Vec<Binding> {
        self.bindings
    }
}

/// Fluent builder returned by [`Module::bind`].
///
/// Nothing is bound until one of the `to_*` methods is called.
#[must_use = "a binding is only recorded by one of the `to_*` methods"]
pub struct BindingBuilder<'m, T: ?Sized> {
    module: &'m mut Module,
    name: Option<String>,
    singleton: bool,
    releasable: bool,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<'m, T> BindingBuilder<'m, T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// Bind under a name; only `get_instance_named` will see it
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Cache the first provided value in the scope the module is installed in
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    /// Singleton that `Scope::release` may drop
    pub fn releasable(mut self) -> Self {
        self.singleton = true;
        self.releasable = true;
        self
    }

    /// Always resolve to `instance`
    pub fn to_instance(self, instance: Arc<T>) {
        self.finish("instance", Target::Instance(instance));
    }

    /// Delegate to a provider object
    pub fn to_provider_instance<P>(self, provider: P)
    where
        P: Provider<T>,
    {
        self.finish("provider_instance", Target::ProviderInstance(Arc::new(provider)));
    }

    /// Build with a closure that can resolve further dependencies from the scope
    pub fn to_provider<F>(self, provide: F)
    where
        F: Fn(&Scope) -> InjectionResult<Arc<T>> + Send + Sync + 'static,
    {
        self.finish("provider", Target::Provider(Arc::new(provide)));
    }

    /// Resolve `I` from the scope and convert it, typically an unsizing upcast
    pub fn to_type<I>(self, convert: fn(Arc<I>) -> Arc<T>)
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let provide = move |scope: &Scope| scope.get_instance::<I>().map(convert);
        self.finish("type", Target::Provider(Arc::new(provide)));
    }

    fn finish(self, kind: &'static str, target: Target<T>) {
        let key = match self.name {
            Some(name) => Key::named::<T>(name),
            None => Key::of::<T>(),
        };

        self.module.bindings.push(Binding {
            key,
            target: Arc::new(target),
            kind,
            singleton: self.singleton,
            releasable: self.releasable,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_bindings() {
        let mut module = Module::new();
        assert!(module.is_empty());

        module.bind::<u32>().to_instance(Arc::new(7));
        module
            .bind::<String>()
            .named("motto")
            .releasable()
            .to_provider(|_| Ok(Arc::new("carpe diem".to_string())));

        assert_eq!(module.len(), 2);

        let bindings = module.into_bindings();
        assert_eq!(bindings[0].key(), &Key::of::<u32>());
        assert!(!bindings[0].is_singleton());
        assert_eq!(bindings[1].key(), &Key::named::<String>("motto"));
        assert!(bindings[1].is_singleton());
        assert!(bindings[1].is_releasable());
    }

    #[test]
    fn test_debug_shows_kind() {
        let mut module = Module::new();
        module.bind::<u8>().singleton().to_instance(Arc::new(1));

        let rendered = format!("{:?}", module);
        assert!(rendered.contains("instance"));
        assert!(rendered.contains("singleton: true"));
    }
}
