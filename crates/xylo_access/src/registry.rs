use std::sync::Arc;

use xylo_utils::hash::HashMap;

use crate::capability::{ExtraAttrs, ExtraAttrsFn, SelfTagFn, SelfTagged};
use crate::decl::{Arity, Fetched, TypeRef};
use crate::error::{ConfigError, PropertyError};
use crate::node::Node;
use crate::spec::AccessorSpec;

// -----------------------------------------------------------------------------
// AccessorRegistry

/// The discovered accessor set of one concrete type.
///
/// Holds the ordered tag-form specs, the ordered attribute-form specs, at
/// most one body spec, and a flattened list of every readable spec. Within
/// each bucket tag names are unique (condensation fuses duplicates or fails
/// construction).
///
/// Registries are built once per type by the [`MappingContext`], then shared
/// immutably by every traversal; concurrent reads need no coordination.
///
/// [`MappingContext`]: crate::MappingContext
pub struct AccessorRegistry {
    owner: TypeRef,
    tag_specs: Box<[AccessorSpec]>,
    attr_specs: Box<[AccessorSpec]>,
    body: Option<AccessorSpec>,
    readable: Box<[AccessorSpec]>,
    tag_index: HashMap<Arc<str>, usize>,
    attr_index: HashMap<Arc<str>, usize>,
    extra_attrs: Option<ExtraAttrsFn>,
    self_tag: Option<SelfTagFn>,
}

impl AccessorRegistry {
    pub(crate) fn assemble(
        owner: TypeRef,
        tag_specs: Vec<AccessorSpec>,
        attr_specs: Vec<AccessorSpec>,
        body: Option<AccessorSpec>,
        extra_attrs: Option<ExtraAttrsFn>,
        self_tag: Option<SelfTagFn>,
    ) -> Self {
        let index = |specs: &[AccessorSpec]| {
            specs
                .iter()
                .enumerate()
                .map(|(at, spec)| (spec.shared_tag(), at))
                .collect::<HashMap<_, _>>()
        };
        let tag_index = index(&tag_specs);
        let attr_index = index(&attr_specs);

        let readable = tag_specs
            .iter()
            .chain(attr_specs.iter())
            .chain(body.iter())
            .filter(|spec| spec.can_get())
            .cloned()
            .collect();

        Self {
            owner,
            tag_specs: tag_specs.into_boxed_slice(),
            attr_specs: attr_specs.into_boxed_slice(),
            body,
            readable,
            tag_index,
            attr_index,
            extra_attrs,
            self_tag,
        }
    }

    /// Returns the owning type.
    #[inline]
    pub fn owner(&self) -> TypeRef {
        self.owner
    }

    /// Returns the tag-form specs in discovery order.
    #[inline]
    pub fn tag_specs(&self) -> &[AccessorSpec] {
        &self.tag_specs
    }

    /// Returns the attribute-form specs in discovery order.
    #[inline]
    pub fn attr_specs(&self) -> &[AccessorSpec] {
        &self.attr_specs
    }

    /// Returns the body spec, if one was declared.
    #[inline]
    pub fn body_spec(&self) -> Option<&AccessorSpec> {
        self.body.as_ref()
    }

    /// Returns every readable spec: tags, then attributes, then the body.
    #[inline]
    pub fn readable(&self) -> &[AccessorSpec] {
        &self.readable
    }

    /// Looks a spec up by tag name, searching the tag bucket before the
    /// attribute bucket.
    pub fn find(&self, name: &str) -> Option<&AccessorSpec> {
        if let Some(&at) = self.tag_index.get(name) {
            return self.tag_specs.get(at);
        }
        self.attr_index
            .get(name)
            .and_then(|&at| self.attr_specs.get(at))
    }

    /// Returns `true` if `name` resolves to a readable accessor.
    pub fn can_get(&self, name: &str) -> bool {
        self.find(name).is_some_and(AccessorSpec::can_get)
    }

    /// Returns `true` if `name` resolves to a writable accessor.
    pub fn can_set(&self, name: &str) -> bool {
        self.find(name).is_some_and(AccessorSpec::can_set)
    }

    /// Reads the property `name` from `obj`.
    pub fn get_property<'v>(
        &self,
        obj: &'v dyn Node,
        name: &str,
    ) -> Result<Fetched<'v>, PropertyError> {
        let spec = self.find(name).ok_or_else(|| self.not_found(name))?;
        Ok(spec.fetch(obj)?)
    }

    /// Writes `value` into the property `name` of `obj`.
    ///
    /// A name without a set accessor fails with
    /// [`ConfigError::PropertyNotWritable`] before the value is touched.
    pub fn set_property(
        &self,
        obj: &mut dyn Node,
        name: &str,
        value: Box<dyn Node>,
    ) -> Result<(), PropertyError> {
        let spec = self.find(name).ok_or_else(|| self.not_found(name))?;
        if !spec.can_set() {
            return Err(ConfigError::PropertyNotWritable {
                name: name.to_owned(),
                owner: self.owner.name(),
            }
            .into());
        }
        Ok(spec.store(obj, value)?)
    }

    /// Returns the declared type of the property `name`.
    pub fn property_type(&self, name: &str) -> Result<Option<TypeRef>, ConfigError> {
        match self.find(name) {
            Some(spec) => Ok(spec.declared_type()),
            None => Err(self.not_found(name)),
        }
    }

    /// Returns the arity of the property `name`.
    pub fn property_arity(&self, name: &str) -> Result<Arity, ConfigError> {
        match self.find(name) {
            Some(spec) => Ok(spec.arity()),
            None => Err(self.not_found(name)),
        }
    }

    /// Resolves the open-ended attribute capability for `obj`, when the
    /// owning type registered one.
    pub fn as_extra_attrs<'v>(&self, obj: &'v dyn Node) -> Option<&'v dyn ExtraAttrs> {
        self.extra_attrs.and_then(|thunk| thunk(obj))
    }

    /// Resolves the self-tagging capability for `obj`, when the owning type
    /// registered one.
    pub fn as_self_tagged<'v>(&self, obj: &'v dyn Node) -> Option<&'v dyn SelfTagged> {
        self.self_tag.and_then(|thunk| thunk(obj))
    }

    fn not_found(&self, name: &str) -> ConfigError {
        ConfigError::PropertyNotFound {
            name: name.to_owned(),
            owner: self.owner.name(),
        }
    }
}

impl core::fmt::Debug for AccessorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessorRegistry")
            .field("owner", &self.owner.name())
            .field("tag_specs", &self.tag_specs)
            .field("attr_specs", &self.attr_specs)
            .field("body", &self.body)
            .finish()
    }
}
