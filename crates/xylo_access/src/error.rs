use thiserror::Error;

use crate::node::Node;

// -----------------------------------------------------------------------------
// ConfigError

/// Fatal registry-construction and property-resolution errors.
///
/// Every variant names the offending tag or property and its owning type, so
/// a misconfigured mapping can be located without a debugger.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Two declarations for one tag name both carry a set accessor.
    #[error("duplicate set accessor for tag `{tag}` on type `{owner}`")]
    DuplicateSetter { tag: String, owner: &'static str },

    /// Two declarations for one tag name and neither carries a set accessor.
    #[error("neither declaration for tag `{tag}` on type `{owner}` carries a set accessor")]
    NoSetterInPair { tag: String, owner: &'static str },

    /// More than one body accessor declared for a type, from any sources.
    #[error("duplicate body accessor on type `{owner}`")]
    DuplicateBody { owner: &'static str },

    /// A property lookup named an accessor the registry does not hold.
    #[error("property `{name}` of type `{owner}` not found")]
    PropertyNotFound { name: String, owner: &'static str },

    /// A property write named an accessor without a set accessor.
    #[error("property `{name}` of type `{owner}` is not writable")]
    PropertyNotWritable { name: String, owner: &'static str },
}

// -----------------------------------------------------------------------------
// AccessError

/// Failures raised while invoking a resolved accessor or leaf renderer.
#[derive(Debug, Clone, Error)]
pub enum AccessError {
    /// An invocation handle received a value of the wrong concrete type.
    #[error("accessor expected type `{expected}`, value is `{actual}`")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// No leaf renderer is registered for the value's concrete type.
    #[error("no leaf renderer registered for type `{type_name}`")]
    NoLeafRenderer { type_name: &'static str },

    /// A user-supplied accessor reported its own failure.
    #[error("{0}")]
    Message(String),
}

impl AccessError {
    /// A [`TypeMismatch`](AccessError::TypeMismatch) for `value` where a `T`
    /// was expected.
    pub fn mismatch<T: 'static>(value: &dyn Node) -> Self {
        AccessError::TypeMismatch {
            expected: core::any::type_name::<T>(),
            actual: value.type_name(),
        }
    }
}

// -----------------------------------------------------------------------------
// PropertyError

/// Either side of a property operation failure: the registry did not hold a
/// usable accessor, or the accessor itself failed.
#[derive(Debug, Clone, Error)]
pub enum PropertyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Access(#[from] AccessError),
}
