pub mod injection;

pub use injection::InjectionError;

/// Result alias used throughout the container
pub type InjectionResult<T> = Result<T, InjectionError>;
