//! Generated factories and member injectors resolved through real scopes

use elif_di::{
    Factory, FactoryRegistryLocator, FactoryTable, Injected, InjectionError, InjectionResult,
    Injector, Lazy, MemberInjectorRegistryLocator, MemberInjectorTable, Module, Provider,
    ScopedProvider,
};
use elif_di_derive::injectable;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static ENGINES_BUILT: AtomicUsize = AtomicUsize::new(0);

pub struct Engine {
    serial: usize,
}

/// Hand-written so the tests can count constructions
struct CountingEngineFactory;

impl Factory<Engine> for CountingEngineFactory {
    fn create_instance(&self, _scope: &elif_di::Scope) -> InjectionResult<Arc<Engine>> {
        let serial = ENGINES_BUILT.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Engine { serial }))
    }
}

pub trait Horn: Send + Sync {
    fn sound(&self) -> &'static str;
}

struct Beep;

impl Horn for Beep {
    fn sound(&self) -> &'static str {
        "beep"
    }
}

#[injectable]
#[derive(Debug, Default)]
pub struct Wheel;

#[injectable]
pub struct Car {
    engine: Arc<Engine>,
    #[inject(named = "front")]
    front_wheel: Arc<Wheel>,
    spare: Lazy<Wheel>,
    engines: ScopedProvider<Engine>,
    horn: Injected<dyn Horn>,
}

#[injectable(scope = "GarageScope", singleton)]
pub struct Garage {
    engine: Arc<Engine>,
}

#[injectable(singleton, releasable)]
pub struct Registry;

fn install_registries() {
    let mut factories = FactoryTable::new();
    factories
        .register::<Engine, _>(CountingEngineFactory)
        .register::<Wheel, _>(WheelFactory)
        .register::<Car, _>(CarFactory)
        .register::<Garage, _>(GarageFactory)
        .register::<Registry, _>(RegistryFactory);
    FactoryRegistryLocator::set_root_registry(factories).unwrap();

    let mut injectors = MemberInjectorTable::new();
    injectors.register::<Car, _>(CarMemberInjector);
    MemberInjectorRegistryLocator::set_root_registry(injectors).unwrap();
}

fn car_module(front: Arc<Wheel>) -> Module {
    let mut module = Module::new();
    module.bind::<Wheel>().named("front").to_instance(front);
    module.bind::<dyn Horn>().to_instance(Arc::new(Beep));
    module
}

#[test]
fn test_generated_metadata() {
    assert!(!WheelFactory.has_scope_annotation());
    assert!(!WheelFactory.has_singleton_annotation());

    assert!(GarageFactory.has_scope_annotation());
    assert!(GarageFactory.has_singleton_annotation());
    assert!(!GarageFactory.has_releasable_annotation());

    assert!(RegistryFactory.has_scope_annotation());
    assert!(RegistryFactory.has_releasable_annotation());
}

#[test]
#[serial]
fn test_constructor_and_member_dependencies() {
    Injector::reset().unwrap();
    install_registries();
    let scope = Injector::open_scope("street").unwrap();
    let front = Arc::new(Wheel);
    scope.install_modules(vec![car_module(front.clone())]).unwrap();

    let car = scope.get_instance::<Car>().unwrap();

    assert!(Arc::ptr_eq(&car.front_wheel, &front));
    assert_eq!(car.horn.get().unwrap().sound(), "beep");
    assert!(!car.spare.is_resolved());
    car.spare.get().unwrap();
    assert!(car.spare.is_resolved());

    let first = car.engines.get().unwrap();
    let second = car.engines.get().unwrap();
    assert_ne!(first.serial, second.serial);
    assert_ne!(car.engine.serial, first.serial);
    assert_eq!(scope.cached_instance_count(), 0);
    Injector::reset().unwrap();
}

#[test]
#[serial]
fn test_missing_named_binding_fails_construction() {
    Injector::reset().unwrap();
    install_registries();
    let scope = Injector::open_scope("street").unwrap();

    let err = scope.get_instance::<Car>().err().unwrap();

    assert!(matches!(
        err,
        InjectionError::NoBinding { ref name, .. } if name == "front"
    ));
    Injector::reset().unwrap();
}

#[test]
#[serial]
fn test_member_injection_goes_through_registry() {
    Injector::reset().unwrap();
    install_registries();
    MemberInjectorRegistryLocator::clear_root_registry().unwrap();
    let scope = Injector::open_scope("street").unwrap();
    scope.install_modules(vec![car_module(Arc::new(Wheel))]).unwrap();

    assert!(matches!(
        scope.get_instance::<Car>(),
        Err(InjectionError::RegistryNotInstalled { registry: "member injector" })
    ));
    Injector::reset().unwrap();
}

#[test]
#[serial]
fn test_scoped_singleton_lives_in_annotated_scope() {
    Injector::reset().unwrap();
    install_registries();
    let workshop = Injector::open_scopes(["city", "garage", "workshop"]).unwrap();
    let garage = workshop.parent_scope().unwrap();
    garage.support_scope_annotation("GarageScope").unwrap();

    let from_workshop = workshop.get_instance::<Garage>().unwrap();
    let from_garage = garage.get_instance::<Garage>().unwrap();

    assert!(Arc::ptr_eq(&from_workshop, &from_garage));
    assert_eq!(garage.cached_instance_count(), 1);
    assert_eq!(workshop.cached_instance_count(), 0);
    assert_eq!(from_workshop.engine.serial, from_garage.engine.serial);

    let elsewhere = Injector::open_scope("village").unwrap();
    assert!(matches!(
        elsewhere.get_instance::<Garage>(),
        Err(InjectionError::NoParentScopeWithAnnotation { .. })
    ));
    Injector::reset().unwrap();
}

#[test]
#[serial]
fn test_releasable_singleton_lives_in_root() {
    Injector::reset().unwrap();
    install_registries();
    let leaf = Injector::open_scopes(["app", "screen"]).unwrap();
    let root = leaf.root_scope().unwrap();

    let first = leaf.get_instance::<Registry>().unwrap();
    assert!(Arc::ptr_eq(&first, &root.get_instance::<Registry>().unwrap()));
    assert_eq!(root.cached_instance_count(), 1);

    root.release().unwrap();
    assert_eq!(root.cached_instance_count(), 0);
    assert!(!Arc::ptr_eq(&first, &leaf.get_instance::<Registry>().unwrap()));
    Injector::reset().unwrap();
}
