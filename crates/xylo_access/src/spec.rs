use core::fmt;
use std::sync::Arc;

use crate::decl::{AccessorDecl, AccessorForm, Arity, Fetched, Getter, Setter, TypeRef};
use crate::error::AccessError;
use crate::node::Node;

// -----------------------------------------------------------------------------
// AccessorSpec

/// One fused, immutable property binding of an [`AccessorRegistry`].
///
/// Specs are produced by the registry builder from condensed
/// [`AccessorDecl`]s, and are shared by reference across every traversal of
/// the owning type. A spec with [`can_set`](AccessorSpec::can_set) `false`
/// is never handed a value to write; [`AccessorRegistry::set_property`]
/// enforces this before invocation.
///
/// [`AccessorRegistry`]: crate::AccessorRegistry
/// [`AccessorRegistry::set_property`]: crate::AccessorRegistry::set_property
#[derive(Clone)]
pub struct AccessorSpec {
    tag: Arc<str>,
    form: AccessorForm,
    arity: Arity,
    declared: Option<TypeRef>,
    getter: Option<Getter>,
    setter: Option<Setter>,
}

impl AccessorSpec {
    pub(crate) fn from_decl(decl: AccessorDecl) -> Self {
        let (tag, form, arity, declared, getter, setter) = decl.into_parts();
        Self {
            tag: Arc::from(&*tag),
            form,
            arity,
            declared,
            getter,
            setter,
        }
    }

    /// Returns the tag name this binding is rendered under.
    #[inline]
    pub fn tag_name(&self) -> &str {
        &self.tag
    }

    /// Returns the tag name as a shared handle.
    #[inline]
    pub fn shared_tag(&self) -> Arc<str> {
        self.tag.clone()
    }

    /// Returns the markup form.
    #[inline]
    pub fn form(&self) -> AccessorForm {
        self.form
    }

    /// Returns the arity.
    #[inline]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Returns the declared property type. After fusion this is the setter
    /// side's type, which is typically the narrower one.
    #[inline]
    pub fn declared_type(&self) -> Option<TypeRef> {
        self.declared
    }

    /// Returns `true` if the binding can be read.
    #[inline]
    pub fn can_get(&self) -> bool {
        self.getter.is_some()
    }

    /// Returns `true` if the binding can be written.
    #[inline]
    pub fn can_set(&self) -> bool {
        self.setter.is_some()
    }

    /// Reads the bound property from `obj`.
    ///
    /// A spec without a get accessor yields [`Fetched::Absent`].
    pub fn fetch<'v>(&self, obj: &'v dyn Node) -> Result<Fetched<'v>, AccessError> {
        match &self.getter {
            Some(getter) => getter.invoke(obj),
            None => Ok(Fetched::Absent),
        }
    }

    /// Writes `value` into the bound property of `obj`.
    pub fn store(&self, obj: &mut dyn Node, value: Box<dyn Node>) -> Result<(), AccessError> {
        match &self.setter {
            Some(setter) => setter.invoke(obj, value),
            None => Err(AccessError::Message(format!(
                "tag `{}` carries no set accessor",
                self.tag
            ))),
        }
    }
}

impl fmt::Debug for AccessorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorSpec")
            .field("tag", &self.tag)
            .field("form", &self.form)
            .field("arity", &self.arity)
            .field("declared", &self.declared.map(|t| t.name()))
            .field("can_get", &self.can_get())
            .field("can_set", &self.can_set())
            .finish()
    }
}
