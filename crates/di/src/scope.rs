use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use uuid::Uuid;

use crate::errors::{InjectionError, InjectionResult};
use crate::config::InjectionConfig;
use crate::injector::read_configuration;
use crate::key::Key;
use crate::module::{Binding, Module};
use crate::provider::{Lazy, ScopedProvider};
use crate::registries::{FactoryRegistryLocator, MemberInjectorRegistryLocator};
use crate::runtime_checks;

/// Scope annotation every root scope supports implicitly
pub const SINGLETON_ANNOTATION: &str = "Singleton";

/// Cached singleton owned by a scope
struct CachedInstance {
    value: Box<dyn Any + Send + Sync>,
    releasable: bool,
}

struct ScopeInner {
    id: Uuid,
    name: String,
    parent: RwLock<Option<Weak<ScopeInner>>>,
    children: RwLock<HashMap<String, Scope>>,
    bindings: RwLock<HashMap<Key, Arc<Binding>>>,
    test_bindings: RwLock<HashMap<Key, Arc<Binding>>>,
    instances: RwLock<HashMap<Key, CachedInstance>>,
    annotations: RwLock<HashSet<String>>,
    open: AtomicBool,
}

/// A named node of the scope tree.
///
/// Cloning a `Scope` is cheap and yields another handle to the same node.
/// Scopes are created through [`Injector`](crate::Injector); once closed, every resolution
/// fails with [`InjectionError::ScopeClosed`].
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id: Uuid::new_v4(),
                name: name.into(),
                parent: RwLock::new(None),
                children: RwLock::new(HashMap::new()),
                bindings: RwLock::new(HashMap::new()),
                test_bindings: RwLock::new(HashMap::new()),
                instances: RwLock::new(HashMap::new()),
                annotations: RwLock::new(HashSet::new()),
                open: AtomicBool::new(true),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Unique id of this scope instance; reopening a name yields a new id
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    pub fn is_root(&self) -> bool {
        matches!(self.parent(), Ok(None))
    }

    /// Get the direct parent scope
    pub fn parent_scope(&self) -> InjectionResult<Scope> {
        self.parent()?.ok_or_else(|| InjectionError::NoParentScope {
            scope: self.name().to_string(),
        })
    }

    /// Get the nearest scope, starting with this one, that supports `annotation`
    pub fn parent_scope_with_annotation(&self, annotation: &str) -> InjectionResult<Scope> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if scope.is_scope_annotation_supported(annotation) {
                return Ok(scope);
            }
            current = scope.parent()?;
        }

        Err(InjectionError::NoParentScopeWithAnnotation {
            scope: self.name().to_string(),
            annotation: annotation.to_string(),
        })
    }

    /// Walk up to the root of this scope's tree
    pub fn root_scope(&self) -> InjectionResult<Scope> {
        let mut current = self.clone();
        while let Some(parent) = current.parent()? {
            current = parent;
        }
        Ok(current)
    }

    /// Declare that this scope owns instances annotated with `annotation`
    pub fn support_scope_annotation(&self, annotation: impl Into<String>) -> InjectionResult<&Self> {
        self.write_lock(&self.inner.annotations, "scope_annotations")?
            .insert(annotation.into());
        Ok(self)
    }

    pub fn is_scope_annotation_supported(&self, annotation: &str) -> bool {
        if annotation == SINGLETON_ANNOTATION && self.is_root() {
            return true;
        }
        self.inner
            .annotations
            .read()
            .map(|annotations| annotations.contains(annotation))
            .unwrap_or(false)
    }

    /// Install the bindings of `modules`; later bindings replace earlier ones
    pub fn install_modules(&self, modules: impl IntoIterator<Item = Module>) -> InjectionResult<&Self> {
        self.install_into(&self.inner.bindings, modules, "scope_bindings")?;
        Ok(self)
    }

    /// Install bindings that take precedence over those of `install_modules`
    pub fn install_test_modules(
        &self,
        modules: impl IntoIterator<Item = Module>,
    ) -> InjectionResult<&Self> {
        self.install_into(&self.inner.test_bindings, modules, "scope_test_bindings")?;
        Ok(self)
    }

    /// Resolve an instance of `T`
    pub fn get_instance<T>(&self) -> InjectionResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve::<T>(&Key::of::<T>())
    }

    /// Resolve the instance of `T` bound under `name`
    pub fn get_instance_named<T>(&self, name: &str) -> InjectionResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve::<T>(&Key::named::<T>(name))
    }

    /// Provider resolving `T` from this scope on every `get`
    pub fn get_provider<T>(&self) -> ScopedProvider<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ScopedProvider::new(self.clone(), Key::of::<T>())
    }

    pub fn get_provider_named<T>(&self, name: &str) -> ScopedProvider<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ScopedProvider::new(self.clone(), Key::named::<T>(name))
    }

    /// Lazy handle resolving `T` from this scope on first `get`
    pub fn get_lazy<T>(&self) -> Lazy<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Lazy::new(self.clone(), Key::of::<T>())
    }

    pub fn get_lazy_named<T>(&self, name: &str) -> Lazy<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Lazy::new(self.clone(), Key::named::<T>(name))
    }

    /// Fill the declared dependencies of `target` with the registered member injector
    pub fn inject<T>(&self, target: &mut T) -> InjectionResult<()>
    where
        T: Send + Sync + 'static,
    {
        self.ensure_open()?;
        let injector = MemberInjectorRegistryLocator::member_injector_for::<T>()?;
        tracing::debug!(
            "Injecting members of {} in scope '{}'",
            std::any::type_name::<T>(),
            self.name()
        );
        injector.inject(target, self)
    }

    /// Drop releasable singletons held by this scope and its descendants
    pub fn release(&self) -> InjectionResult<()> {
        let released = {
            let mut instances = self.write_lock(&self.inner.instances, "scope_instances")?;
            let before = instances.len();
            instances.retain(|_, cached| !cached.releasable);
            before - instances.len()
        };
        if released > 0 {
            tracing::debug!("Released {} instance(s) in scope '{}'", released, self.name());
        }

        for child in self.children()? {
            child.release()?;
        }
        Ok(())
    }

    /// Number of singletons currently cached by this scope
    pub fn cached_instance_count(&self) -> usize {
        self.inner
            .instances
            .read()
            .map(|instances| instances.len())
            .unwrap_or(0)
    }

    pub fn children(&self) -> InjectionResult<Vec<Scope>> {
        let children = self.read_lock(&self.inner.children, "scope_children")?;
        Ok(children.values().cloned().collect())
    }

    pub(crate) fn resolve<T>(&self, key: &Key) -> InjectionResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.ensure_open()?;
        let _guard = runtime_checks::enter(key, read_configuration(InjectionConfig::runtime_checks))?;

        if let Some((owner, binding)) = self.lookup_binding(key)? {
            tracing::debug!(
                "Resolving {} from binding in scope '{}'",
                key,
                owner.name()
            );
            return if binding.is_singleton() {
                owner.cached_or_create(key, binding.is_releasable(), || binding.provide::<T>(&owner))
            } else {
                binding.provide::<T>(&owner)
            };
        }

        if key.is_named() {
            return Err(InjectionError::NoBinding {
                type_name: key.type_name().to_string(),
                name: key.name().unwrap_or_default().to_string(),
            });
        }

        let factory = FactoryRegistryLocator::factory_for::<T>()?;
        if !factory.has_scope_annotation() {
            tracing::debug!("Resolving {} from unscoped factory in scope '{}'", key, self.name());
            return factory.create_instance(self);
        }

        let target = factory.target_scope(self)?;
        target.ensure_open()?;
        tracing::debug!("Resolving {} from factory in scope '{}'", key, target.name());

        if factory.has_singleton_annotation() {
            let releasable = factory.has_releasable_annotation();
            target.cached_or_create(key, releasable, || factory.create_instance(&target))
        } else {
            factory.create_instance(&target)
        }
    }

    /// Return the cached instance for `key`, creating it with `create` if absent
    fn cached_or_create<T, F>(&self, key: &Key, releasable: bool, create: F) -> InjectionResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce() -> InjectionResult<Arc<T>>,
    {
        if let Some(existing) = self.cached::<T>(key)? {
            return Ok(existing);
        }

        // the lock is not held while creating, creation may resolve further keys
        let created = create()?;

        let mut instances = self.write_lock(&self.inner.instances, "scope_instances")?;
        let cached = instances.entry(key.clone()).or_insert_with(|| CachedInstance {
            value: Box::new(created),
            releasable,
        });
        cached
            .value
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(InjectionError::type_mismatch::<T>)
    }

    fn cached<T>(&self, key: &Key) -> InjectionResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instances = self.read_lock(&self.inner.instances, "scope_instances")?;
        match instances.get(key) {
            Some(cached) => cached
                .value
                .downcast_ref::<Arc<T>>()
                .cloned()
                .map(Some)
                .ok_or_else(InjectionError::type_mismatch::<T>),
            None => Ok(None),
        }
    }

    /// Find the nearest binding for `key`, from this scope up to the root
    fn lookup_binding(&self, key: &Key) -> InjectionResult<Option<(Scope, Arc<Binding>)>> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if let Some(binding) = scope.local_binding(key)? {
                return Ok(Some((scope, binding)));
            }
            current = scope.parent()?;
        }
        Ok(None)
    }

    fn local_binding(&self, key: &Key) -> InjectionResult<Option<Arc<Binding>>> {
        let test_bindings = self.read_lock(&self.inner.test_bindings, "scope_test_bindings")?;
        if let Some(binding) = test_bindings.get(key) {
            return Ok(Some(binding.clone()));
        }
        drop(test_bindings);

        let bindings = self.read_lock(&self.inner.bindings, "scope_bindings")?;
        Ok(bindings.get(key).cloned())
    }

    fn install_into(
        &self,
        table: &RwLock<HashMap<Key, Arc<Binding>>>,
        modules: impl IntoIterator<Item = Module>,
        resource: &str,
    ) -> InjectionResult<()> {
        self.ensure_open()?;
        let mut table = self.write_lock(table, resource)?;
        for module in modules {
            for binding in module.into_bindings() {
                tracing::debug!("Binding {} in scope '{}'", binding.key(), self.name());
                table.insert(binding.key().clone(), Arc::new(binding));
            }
        }
        Ok(())
    }

    pub(crate) fn parent(&self) -> InjectionResult<Option<Scope>> {
        let parent = self.read_lock(&self.inner.parent, "scope_parent")?;
        Ok(parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Scope { inner }))
    }

    pub(crate) fn add_child(&self, child: &Scope) -> InjectionResult<()> {
        *self.write_lock(&child.inner.parent, "scope_parent")? = Some(Arc::downgrade(&self.inner));
        self.write_lock(&self.inner.children, "scope_children")?
            .insert(child.name().to_string(), child.clone());
        Ok(())
    }

    pub(crate) fn remove_child(&self, name: &str) -> InjectionResult<()> {
        self.write_lock(&self.inner.children, "scope_children")?
            .remove(name);
        Ok(())
    }

    /// Mark closed and drop everything the scope holds
    pub(crate) fn close(&self) -> InjectionResult<()> {
        self.inner.open.store(false, Ordering::Release);
        self.write_lock(&self.inner.instances, "scope_instances")?.clear();
        self.write_lock(&self.inner.bindings, "scope_bindings")?.clear();
        self.write_lock(&self.inner.test_bindings, "scope_test_bindings")?
            .clear();
        self.write_lock(&self.inner.children, "scope_children")?.clear();
        Ok(())
    }

    fn ensure_open(&self) -> InjectionResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(InjectionError::scope_closed(self.name()))
        }
    }

    fn read_lock<'a, V>(
        &self,
        lock: &'a RwLock<V>,
        resource: &str,
    ) -> InjectionResult<std::sync::RwLockReadGuard<'a, V>> {
        lock.read().map_err(|_| InjectionError::lock_poisoned(resource))
    }

    fn write_lock<'a, V>(
        &self,
        lock: &'a RwLock<V>,
        resource: &str,
    ) -> InjectionResult<std::sync::RwLockWriteGuard<'a, V>> {
        lock.write().map_err(|_| InjectionError::lock_poisoned(resource))
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;
    use crate::injector::Injector;
    use crate::registries::FactoryTable;
    use serial_test::serial;
    use std::sync::atomic::AtomicUsize;

    static ENGINES_BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Engine {
        serial: usize,
    }

    struct EngineFactory {
        singleton: bool,
        releasable: bool,
    }

    impl Factory<Engine> for EngineFactory {
        fn create_instance(&self, _scope: &Scope) -> InjectionResult<Arc<Engine>> {
            let serial = ENGINES_BUILT.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Engine { serial }))
        }

        fn has_scope_annotation(&self) -> bool {
            self.singleton
        }

        fn has_singleton_annotation(&self) -> bool {
            self.singleton
        }

        fn has_releasable_annotation(&self) -> bool {
            self.releasable
        }
    }

    fn install_engine_factory(singleton: bool, releasable: bool) {
        let mut table = FactoryTable::new();
        table.register::<Engine, _>(EngineFactory {
            singleton,
            releasable,
        });
        FactoryRegistryLocator::set_root_registry(table).unwrap();
    }

    #[test]
    #[serial]
    fn test_unscoped_factory_builds_every_time() {
        Injector::reset().unwrap();
        install_engine_factory(false, false);
        let scope = Injector::open_scope("garage").unwrap();

        let first = scope.get_instance::<Engine>().unwrap();
        let second = scope.get_instance::<Engine>().unwrap();

        assert_ne!(first.serial, second.serial);
        assert_eq!(scope.cached_instance_count(), 0);
        Injector::reset().unwrap();
    }

    #[test]
    #[serial]
    fn test_singleton_factory_is_cached_and_released() {
        Injector::reset().unwrap();
        install_engine_factory(true, true);
        let scope = Injector::open_scope("garage").unwrap();

        let first = scope.get_instance::<Engine>().unwrap();
        let second = scope.get_instance::<Engine>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(scope.cached_instance_count(), 1);

        scope.release().unwrap();
        assert_eq!(scope.cached_instance_count(), 0);

        let third = scope.get_instance::<Engine>().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        Injector::reset().unwrap();
    }

    #[test]
    #[serial]
    fn test_non_releasable_singleton_survives_release() {
        Injector::reset().unwrap();
        install_engine_factory(true, false);
        let scope = Injector::open_scope("garage").unwrap();

        let first = scope.get_instance::<Engine>().unwrap();
        scope.release().unwrap();
        let second = scope.get_instance::<Engine>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        Injector::reset().unwrap();
    }

    struct Screen {
        built_in: String,
    }

    /// Tied to the nearest "ScreenScope" without being cached there
    struct ScreenFactory {
        singleton: bool,
    }

    impl Factory<Screen> for ScreenFactory {
        fn create_instance(&self, scope: &Scope) -> InjectionResult<Arc<Screen>> {
            Ok(Arc::new(Screen {
                built_in: scope.name().to_string(),
            }))
        }

        fn target_scope(&self, scope: &Scope) -> InjectionResult<Scope> {
            scope.parent_scope_with_annotation("ScreenScope")
        }

        fn has_scope_annotation(&self) -> bool {
            true
        }

        fn has_singleton_annotation(&self) -> bool {
            self.singleton
        }
    }

    fn install_screen_factory(singleton: bool) {
        let mut table = FactoryTable::new();
        table.register::<Screen, _>(ScreenFactory { singleton });
        FactoryRegistryLocator::set_root_registry(table).unwrap();
    }

    #[test]
    #[serial]
    fn test_scope_annotation_alone_builds_in_target_scope_without_caching() {
        Injector::reset().unwrap();
        install_screen_factory(false);
        let leaf = Injector::open_scopes(["app", "screen", "dialog"]).unwrap();
        let screen = leaf.parent_scope().unwrap();
        screen.support_scope_annotation("ScreenScope").unwrap();

        let first = leaf.get_instance::<Screen>().unwrap();
        let second = leaf.get_instance::<Screen>().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.built_in, "screen");
        assert_eq!(screen.cached_instance_count(), 0);
        assert_eq!(leaf.cached_instance_count(), 0);
        Injector::reset().unwrap();
    }

    #[test]
    #[serial]
    fn test_scoped_singleton_is_cached_in_target_scope() {
        Injector::reset().unwrap();
        install_screen_factory(true);
        let leaf = Injector::open_scopes(["app", "screen", "dialog"]).unwrap();
        let screen = leaf.parent_scope().unwrap();
        screen.support_scope_annotation("ScreenScope").unwrap();

        let from_leaf = leaf.get_instance::<Screen>().unwrap();
        let from_screen = screen.get_instance::<Screen>().unwrap();

        assert!(Arc::ptr_eq(&from_leaf, &from_screen));
        assert_eq!(screen.cached_instance_count(), 1);
        assert_eq!(leaf.cached_instance_count(), 0);
        Injector::reset().unwrap();
    }

    #[test]
    #[serial]
    fn test_scoped_factory_without_annotated_scope_fails() {
        Injector::reset().unwrap();
        install_screen_factory(false);
        let scope = Injector::open_scope("app").unwrap();

        assert!(matches!(
            scope.get_instance::<Screen>(),
            Err(InjectionError::NoParentScopeWithAnnotation { ref annotation, .. }) if annotation == "ScreenScope"
        ));
        Injector::reset().unwrap();
    }

    #[test]
    #[serial]
    fn test_unscoped_factory_ignores_target_scope() {
        struct Loose;
        struct LooseFactory;

        impl Factory<Loose> for LooseFactory {
            fn create_instance(&self, _scope: &Scope) -> InjectionResult<Arc<Loose>> {
                Ok(Arc::new(Loose))
            }

            fn target_scope(&self, scope: &Scope) -> InjectionResult<Scope> {
                scope.parent_scope_with_annotation("NowhereScope")
            }

            fn has_singleton_annotation(&self) -> bool {
                true
            }
        }

        Injector::reset().unwrap();
        let mut table = FactoryTable::new();
        table.register::<Loose, _>(LooseFactory);
        FactoryRegistryLocator::set_root_registry(table).unwrap();
        let scope = Injector::open_scope("app").unwrap();

        assert!(scope.get_instance::<Loose>().is_ok());
        assert_eq!(scope.cached_instance_count(), 0);
        Injector::reset().unwrap();
    }

    #[test]
    #[serial]
    fn test_annotations() {
        Injector::reset().unwrap();
        let child = Injector::open_scopes(["app", "activity"]).unwrap();
        let root = child.root_scope().unwrap();

        assert!(root.is_scope_annotation_supported(SINGLETON_ANNOTATION));
        assert!(!child.is_scope_annotation_supported(SINGLETON_ANNOTATION));

        child.support_scope_annotation("ActivityScope").unwrap();
        assert_eq!(
            child.parent_scope_with_annotation("ActivityScope").unwrap(),
            child
        );
        assert_eq!(
            child.parent_scope_with_annotation(SINGLETON_ANNOTATION).unwrap(),
            root
        );
        assert!(matches!(
            child.parent_scope_with_annotation("FragmentScope"),
            Err(InjectionError::NoParentScopeWithAnnotation { .. })
        ));
        Injector::reset().unwrap();
    }

    #[test]
    fn test_detached_scope_is_its_own_root() {
        let scope = Scope::new("detached");

        assert!(scope.is_root());
        assert_eq!(scope.root_scope().unwrap(), scope);
        assert!(matches!(
            scope.parent_scope(),
            Err(InjectionError::NoParentScope { .. })
        ));
        assert!(format!("{:?}", scope).contains("detached"));
    }
}
