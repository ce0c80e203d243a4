use std::any::TypeId;
use std::fmt;

/// Binding key combining a type and an optional name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<String>,
}

impl Key {
    /// Create an unnamed key for a type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: None,
        }
    }

    /// Create a named key for a type
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: Some(name.into()),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}@{}", self.type_name, name),
            None => write!(f, "{}", self.type_name),
        }
    }
}
