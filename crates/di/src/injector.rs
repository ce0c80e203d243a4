//! Process-wide scope tree.
//!
//! Every open scope is reachable by name. Opening a name that is already open
//! returns the existing scope; closing a scope closes its whole subtree.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::InjectionConfig;
use crate::errors::{InjectionError, InjectionResult};
use crate::scope::Scope;

/// Name used by [`Injector::open_root_scope`] when no root is open yet
pub const DEFAULT_ROOT_SCOPE: &str = "root";

static SCOPES: Lazy<RwLock<HashMap<String, Scope>>> = Lazy::new(|| RwLock::new(HashMap::new()));

static CONFIGURATION: Lazy<RwLock<InjectionConfig>> =
    Lazy::new(|| RwLock::new(InjectionConfig::default()));

/// Entry point for opening, closing and looking up scopes
#[derive(Debug, Clone, Copy)]
pub struct Injector;

impl Injector {
    /// Open the scope called `name`, or return it if it is already open.
    ///
    /// A newly opened scope is a root scope.
    pub fn open_scope(name: impl Into<String>) -> InjectionResult<Scope> {
        let name = name.into();
        let mut scopes = scopes_mut()?;
        open_in(&mut scopes, &name)
    }

    /// Open a chain of scopes, each a child of the previous one, returning the last
    pub fn open_scopes<I>(names: I) -> InjectionResult<Scope>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut scopes = scopes_mut()?;
        let mut names = names.into_iter().map(Into::into);

        let first = names.next().ok_or_else(|| InjectionError::ScopeNotFound {
            scope: String::new(),
        })?;
        let mut parent = open_in(&mut scopes, &first)?;

        for name in names {
            let child = match scopes.get(&name) {
                Some(existing) => {
                    match existing.parent()? {
                        Some(current) if current == parent => {}
                        Some(current) => {
                            return Err(InjectionError::ParentMismatch {
                                scope: name,
                                parent: current.name().to_string(),
                            })
                        }
                        None => {
                            if is_ancestor_or_self(existing, &parent)? {
                                return Err(InjectionError::ScopeCycle {
                                    scope: name,
                                    parent: parent.name().to_string(),
                                });
                            }
                            parent.add_child(existing)?
                        }
                    }
                    existing.clone()
                }
                None => {
                    let scope = Scope::new(name.clone());
                    parent.add_child(&scope)?;
                    scopes.insert(name, scope.clone());
                    tracing::debug!("Opened scope '{}' under '{}'", scope.name(), parent.name());
                    scope
                }
            };
            parent = child;
        }

        Ok(parent)
    }

    /// Return the single open root scope, opening one if none exists
    pub fn open_root_scope() -> InjectionResult<Scope> {
        let mut scopes = scopes_mut()?;
        let roots = roots(&scopes)?;
        match roots.as_slice() {
            [] => open_in(&mut scopes, DEFAULT_ROOT_SCOPE),
            [root] => Ok(root.clone()),
            [first, second, ..] => Err(InjectionError::MultipleRootScopes {
                existing: first.name().to_string(),
                requested: second.name().to_string(),
            }),
        }
    }

    /// Close `name` and all of its descendants. Closing an unknown name is a no-op.
    pub fn close_scope(name: &str) -> InjectionResult<()> {
        let mut scopes = scopes_mut()?;
        let Some(scope) = scopes.get(name).cloned() else {
            return Ok(());
        };

        if let Some(parent) = scope.parent()? {
            parent.remove_child(name)?;
        }
        close_subtree(&mut scopes, &scope)
    }

    pub fn is_scope_open(name: &str) -> bool {
        SCOPES
            .read()
            .map(|scopes| scopes.contains_key(name))
            .unwrap_or(false)
    }

    /// Look up an open scope without opening it
    pub fn find_scope(name: &str) -> InjectionResult<Scope> {
        scopes()?
            .get(name)
            .cloned()
            .ok_or_else(|| InjectionError::ScopeNotFound {
                scope: name.to_string(),
            })
    }

    /// Close every open scope
    pub fn reset() -> InjectionResult<()> {
        let mut scopes = scopes_mut()?;
        for (_, scope) in scopes.drain() {
            scope.close()?;
        }
        tracing::debug!("Closed all scopes");
        Ok(())
    }

    /// Fill the declared dependencies of `target` from `scope`
    pub fn inject<T>(target: &mut T, scope: &Scope) -> InjectionResult<()>
    where
        T: Send + Sync + 'static,
    {
        scope.inject(target)
    }

    pub fn set_configuration(config: InjectionConfig) -> InjectionResult<()> {
        let mut current = CONFIGURATION
            .write()
            .map_err(|_| InjectionError::lock_poisoned("injection_configuration"))?;
        tracing::info!(
            "Injection configuration set for {} (runtime checks: {})",
            config.environment(),
            config.runtime_checks()
        );
        *current = config;
        Ok(())
    }

    pub fn configuration() -> InjectionConfig {
        CONFIGURATION
            .read()
            .map(|config| config.clone())
            .unwrap_or_default()
    }
}

/// Read one switch of the current configuration without cloning it
pub(crate) fn read_configuration<R>(read: impl FnOnce(&InjectionConfig) -> R) -> R {
    match CONFIGURATION.read() {
        Ok(config) => read(&config),
        Err(_) => read(&InjectionConfig::default()),
    }
}

fn scopes() -> InjectionResult<RwLockReadGuard<'static, HashMap<String, Scope>>> {
    SCOPES
        .read()
        .map_err(|_| InjectionError::lock_poisoned("scopes"))
}

fn scopes_mut() -> InjectionResult<RwLockWriteGuard<'static, HashMap<String, Scope>>> {
    SCOPES
        .write()
        .map_err(|_| InjectionError::lock_poisoned("scopes"))
}

fn roots(scopes: &HashMap<String, Scope>) -> InjectionResult<Vec<Scope>> {
    let mut roots = Vec::new();
    for scope in scopes.values() {
        if scope.parent()?.is_none() {
            roots.push(scope.clone());
        }
    }
    roots.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(roots)
}

/// Whether `candidate` is `scope` itself or one of its ancestors
fn is_ancestor_or_self(candidate: &Scope, scope: &Scope) -> InjectionResult<bool> {
    let mut current = Some(scope.clone());
    while let Some(node) = current {
        if node == *candidate {
            return Ok(true);
        }
        current = node.parent()?;
    }
    Ok(false)
}

fn open_in(scopes: &mut HashMap<String, Scope>, name: &str) -> InjectionResult<Scope> {
    if let Some(existing) = scopes.get(name) {
        return Ok(existing.clone());
    }

    if read_configuration(InjectionConfig::prevent_multiple_root_scopes) {
        if let Some(existing) = roots(scopes)?.into_iter().next() {
            return Err(InjectionError::MultipleRootScopes {
                existing: existing.name().to_string(),
                requested: name.to_string(),
            });
        }
    }

    let scope = Scope::new(name);
    scopes.insert(name.to_string(), scope.clone());
    tracing::debug!("Opened root scope '{}' ({})", name, scope.id());
    Ok(scope)
}

fn close_subtree(scopes: &mut HashMap<String, Scope>, scope: &Scope) -> InjectionResult<()> {
    for child in scope.children()? {
        close_subtree(scopes, &child)?;
    }
    scopes.remove(scope.name());
    scope.close()?;
    tracing::debug!("Closed scope '{}'", scope.name());
    Ok(())
}
