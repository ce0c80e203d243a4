use thiserror::Error;

/// Error raised while opening scopes or resolving instances
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("No {registry} registry installed; install one before resolving instances")]
    RegistryNotInstalled { registry: &'static str },

    #[error("No factory registered for '{type_name}'")]
    NoFactory { type_name: String },

    #[error("No member injector registered for '{type_name}'")]
    NoMemberInjector { type_name: String },

    #[error("No binding for '{type_name}' named '{name}'")]
    NoBinding { type_name: String, name: String },

    #[error("Circular dependency detected: {path} (cycle at: {type_name})")]
    CyclicDependency { path: String, type_name: String },

    #[error("Scope '{scope}' is closed")]
    ScopeClosed { scope: String },

    #[error("Scope '{scope}' is not open")]
    ScopeNotFound { scope: String },

    #[error("Scope '{scope}' has no parent scope")]
    NoParentScope { scope: String },

    #[error("No scope supporting annotation '{annotation}' above '{scope}'")]
    NoParentScopeWithAnnotation { scope: String, annotation: String },

    #[error("Root scope '{existing}' is already open, cannot open root scope '{requested}'")]
    MultipleRootScopes { existing: String, requested: String },

    #[error("Scope '{scope}' is already a child of '{parent}'")]
    ParentMismatch { scope: String, parent: String },

    #[error("Scope '{scope}' is an ancestor of '{parent}' and cannot become its child")]
    ScopeCycle { scope: String, parent: String },

    #[error("Registered entry for '{type_name}' has an unexpected type")]
    TypeMismatch { type_name: String },

    #[error("Dependency '{type_name}' has not been injected")]
    NotInjected { type_name: String },

    #[error("Dependency '{type_name}' was already injected")]
    AlreadyInjected { type_name: String },

    #[error("Construction of '{type_name}' failed: {source}")]
    ConstructionFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Lock error on resource: {resource}")]
    LockPoisoned { resource: String },
}

impl InjectionError {
    /// Create a registry-not-installed error
    pub fn registry_not_installed(registry: &'static str) -> Self {
        Self::RegistryNotInstalled { registry }
    }

    /// Create a missing factory error for `T`
    pub fn no_factory<T: ?Sized + 'static>() -> Self {
        Self::NoFactory {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }

    /// Create a missing member injector error for `T`
    pub fn no_member_injector<T: ?Sized + 'static>() -> Self {
        Self::NoMemberInjector {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }

    /// Create a closed scope error
    pub fn scope_closed(scope: impl Into<String>) -> Self {
        Self::ScopeClosed {
            scope: scope.into(),
        }
    }

    /// Create a lock error
    pub fn lock_poisoned(resource: impl Into<String>) -> Self {
        Self::LockPoisoned {
            resource: resource.into(),
        }
    }

    /// Create a type mismatch error for `T`
    pub fn type_mismatch<T: ?Sized + 'static>() -> Self {
        Self::TypeMismatch {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }

    /// Wrap an arbitrary construction failure of `T`
    pub fn construction_failed<T: ?Sized + 'static>(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ConstructionFailed {
            type_name: std::any::type_name::<T>().to_string(),
            source: source.into(),
        }
    }

    /// Check if the error happened while looking up how to build a type
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::RegistryNotInstalled { .. }
                | Self::NoFactory { .. }
                | Self::NoMemberInjector { .. }
                | Self::NoBinding { .. }
                | Self::CyclicDependency { .. }
        )
    }

    /// Check if the error is about the scope tree rather than a type
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            Self::ScopeClosed { .. }
                | Self::ScopeNotFound { .. }
                | Self::NoParentScope { .. }
                | Self::NoParentScopeWithAnnotation { .. }
                | Self::MultipleRootScopes { .. }
                | Self::ParentMismatch { .. }
                | Self::ScopeCycle { .. }
        )
    }

    /// Check if the error is a cycle
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CyclicDependency { .. })
    }
}
