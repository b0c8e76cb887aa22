use core::any::TypeId;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;
use xylo_utils::TypeIdMap;

use crate::builder::build_registry;
use crate::capability::{ExtraAttrs, SelfTagged, StaticAccessors, StaticSource};
use crate::capability::{ExtraAttrsFn, SelfTagFn};
use crate::decl::TypeRef;
use crate::error::ConfigError;
use crate::leaf::LeafTable;
use crate::node::Node;
use crate::registry::AccessorRegistry;
use crate::sources::{AccessorInferrer, MappingProvider};

// -----------------------------------------------------------------------------
// MappingContext

/// The shared hub of accessor discovery.
///
/// A context is configured once (provider, inferrer, static declarations,
/// capabilities, nicknames, leaves), then frozen behind an [`Arc`] and
/// shared by every traversal. The only interior mutability is the registry
/// cache, a process-lifetime memoization from concrete type to its built
/// [`AccessorRegistry`].
///
/// # Concurrency
///
/// Lookups may race on a not-yet-built type: each racing thread builds the
/// registry outside the lock, and the first insert wins. Redundant builds
/// are tolerated by design, since registries for one type are always equal
/// in content; every lookup after the first insert returns the identical
/// cached instance.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use xylo_access::{AccessorDecl, Getter, MappingContext, MappingTable, TypeRef};
///
/// struct Point { x: u32 }
///
/// let mut table = MappingTable::new();
/// table.insert::<Point>(vec![
///     AccessorDecl::attr("x", Getter::value(|p: &Point| &p.x)),
/// ]);
///
/// let mut ctx = MappingContext::new();
/// ctx.set_provider(table);
/// let ctx = Arc::new(ctx);
///
/// let registry = ctx.registry_for(TypeRef::of::<Point>()).unwrap();
/// assert_eq!(registry.attr_specs().len(), 1);
///
/// // The cache returns the identical instance.
/// let again = ctx.registry_for(TypeRef::of::<Point>()).unwrap();
/// assert!(Arc::ptr_eq(&registry, &again));
/// ```
pub struct MappingContext {
    provider: Option<Arc<dyn MappingProvider>>,
    inferrer: Option<Arc<dyn AccessorInferrer>>,
    statics: TypeIdMap<StaticSource>,
    extra_attrs: TypeIdMap<ExtraAttrsFn>,
    self_tags: TypeIdMap<SelfTagFn>,
    nicks: TypeIdMap<Box<str>>,
    leaves: LeafTable,
    cache: RwLock<TypeIdMap<Arc<AccessorRegistry>>>,
}

impl MappingContext {
    /// Creates a context with the primitive leaf types registered and no
    /// other configuration.
    pub fn new() -> Self {
        Self {
            provider: None,
            inferrer: None,
            statics: TypeIdMap::new(),
            extra_attrs: TypeIdMap::new(),
            self_tags: TypeIdMap::new(),
            nicks: TypeIdMap::new(),
            leaves: LeafTable::new(),
            cache: RwLock::new(TypeIdMap::new()),
        }
    }

    /// Installs the explicit per-type mapping provider.
    pub fn set_provider(&mut self, provider: impl MappingProvider + 'static) {
        self.provider = Some(Arc::new(provider));
    }

    /// Installs the fallback inferrer.
    pub fn set_inferrer(&mut self, inferrer: impl AccessorInferrer + 'static) {
        self.inferrer = Some(Arc::new(inferrer));
    }

    /// Registers `T`'s own static accessor declarations (discovery source 2).
    pub fn register_static<T: StaticAccessors + 'static>(&mut self) {
        self.statics.insert_type::<T>(StaticSource::of::<T>());
    }

    /// Registers `T`'s open-ended attribute capability.
    pub fn register_extra_attrs<T: Node + ExtraAttrs>(&mut self) {
        self.extra_attrs
            .insert_type::<T>(crate::capability::extra_attrs_thunk::<T>());
    }

    /// Registers `T`'s self-tagging capability.
    pub fn register_self_tagged<T: Node + SelfTagged>(&mut self) {
        self.self_tags
            .insert_type::<T>(crate::capability::self_tag_thunk::<T>());
    }

    /// Registers the polymorphism nickname for `T`.
    ///
    /// The nickname is written as a `type="…"` discriminator attribute when
    /// a value of type `T` appears where another type was declared.
    pub fn register_nick<T: ?Sized + 'static>(&mut self, nick: impl Into<Box<str>>) {
        self.nicks.insert_type::<T>(nick.into());
    }

    /// Returns the nickname registered for `ty`, if any.
    pub fn nick_for(&self, ty: TypeId) -> Option<&str> {
        self.nicks.get(&ty).map(AsRef::as_ref)
    }

    /// Returns the leaf table.
    #[inline]
    pub fn leaves(&self) -> &LeafTable {
        &self.leaves
    }

    /// Returns the leaf table for further registration.
    #[inline]
    pub fn leaves_mut(&mut self) -> &mut LeafTable {
        &mut self.leaves
    }

    /// Resolves the self-reported element tag of `node`, when its type
    /// registered the capability.
    pub fn self_tag_of<'v>(&self, node: &'v dyn Node) -> Option<&'v str> {
        let thunk = self.self_tags.get(&node.ty_id())?;
        thunk(node).map(SelfTagged::element_tag)
    }

    /// Collects every compile-time submitted static-accessor registration.
    ///
    /// Repeated calls are cheap; re-registering a type overwrites its
    /// earlier entry with an identical one.
    #[cfg(feature = "auto_register")]
    pub fn auto_register(&mut self) {
        for registration in inventory::iter::<crate::sources::StaticRegistration> {
            registration.register_into(self);
        }
    }

    // -------------------------------------------------------------------------
    // Registry cache

    /// Returns the accessor registry for `owner`, building and caching it on
    /// first use.
    ///
    /// Every call for one type returns the identical cached instance once an
    /// insert has happened; see the type-level notes on build races.
    pub fn registry_for(&self, owner: TypeRef) -> Result<Arc<AccessorRegistry>, ConfigError> {
        if let Some(found) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&owner.id())
        {
            return Ok(found.clone());
        }

        // Built outside the lock; a racing thread may do the same, and the
        // first insert wins.
        trace!(owner = owner.name(), "registry cache miss");
        let built = Arc::new(build_registry(owner, self)?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(cache.get_or_insert(owner.id(), || built).clone())
    }

    /// Returns the accessor registry for a value's concrete type.
    pub fn registry_of(&self, node: &dyn Node) -> Result<Arc<AccessorRegistry>, ConfigError> {
        self.registry_for(TypeRef::of_val(node))
    }

    pub(crate) fn provider(&self) -> Option<&dyn MappingProvider> {
        self.provider.as_deref()
    }

    pub(crate) fn inferrer(&self) -> Option<&dyn AccessorInferrer> {
        self.inferrer.as_deref()
    }

    pub(crate) fn static_source(&self, ty: TypeId) -> Option<&StaticSource> {
        self.statics.get(&ty)
    }

    pub(crate) fn extra_attrs_fn(&self, ty: TypeId) -> Option<ExtraAttrsFn> {
        self.extra_attrs.get(&ty).copied()
    }

    pub(crate) fn self_tag_fn(&self, ty: TypeId) -> Option<SelfTagFn> {
        self.self_tags.get(&ty).copied()
    }
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{AccessorDecl, Getter, MappingEntry};
    use crate::sources::MappingTable;

    struct Point {
        x: u32,
    }

    fn point_context() -> MappingContext {
        let mut table = MappingTable::new();
        table.insert::<Point>(vec![AccessorDecl::attr(
            "x",
            Getter::value(|p: &Point| &p.x),
        )]);
        let mut ctx = MappingContext::new();
        ctx.set_provider(table);
        ctx
    }

    #[test]
    fn cache_returns_identical_instance() {
        let ctx = point_context();
        let owner = TypeRef::of::<Point>();

        let first = ctx.registry_for(owner).unwrap();
        let second = ctx.registry_for(owner).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn concurrent_lookups_agree() {
        let ctx = Arc::new(point_context());
        let owner = TypeRef::of::<Point>();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || ctx.registry_for(owner).unwrap())
            })
            .collect();

        let reference = ctx.registry_for(owner).unwrap();
        for handle in handles {
            let got = handle.join().unwrap();
            assert!(Arc::ptr_eq(&reference, &got));
        }
    }

    #[test]
    fn unknown_type_builds_an_empty_registry() {
        struct Bare;
        let ctx = MappingContext::new();
        let registry = ctx.registry_for(TypeRef::of::<Bare>()).unwrap();
        assert!(registry.tag_specs().is_empty());
        assert!(registry.attr_specs().is_empty());
        assert!(registry.body_spec().is_none());
    }

    struct Inferred {
        n: u8,
    }

    struct FixedInferrer;

    impl crate::sources::AccessorInferrer for FixedInferrer {
        fn infer(&self, _ty: TypeRef, base: Option<MappingEntry>) -> MappingEntry {
            let mut entry = base.unwrap_or_default();
            entry.push(AccessorDecl::tag("n", Getter::value(|i: &Inferred| &i.n)));
            entry
        }
    }

    #[test]
    fn inferrer_fills_unmapped_types() {
        let mut ctx = MappingContext::new();
        ctx.set_inferrer(FixedInferrer);

        let registry = ctx.registry_for(TypeRef::of::<Inferred>()).unwrap();
        assert_eq!(registry.tag_specs().len(), 1);
        assert_eq!(registry.tag_specs()[0].tag_name(), "n");
    }

    #[test]
    fn default_inferrible_entry_reaches_the_inferrer_as_base() {
        let mut table = MappingTable::new();
        table.insert_entry::<Inferred>(
            MappingEntry::new(vec![AccessorDecl::attr(
                "explicit",
                Getter::value(|i: &Inferred| &i.n),
            )])
            .default_inferrible(),
        );

        let mut ctx = MappingContext::new();
        ctx.set_provider(table);
        ctx.set_inferrer(FixedInferrer);

        let registry = ctx.registry_for(TypeRef::of::<Inferred>()).unwrap();
        // The explicit attr arrived through the inferrer's base material,
        // and the inferred tag was appended after it.
        assert_eq!(registry.attr_specs().len(), 1);
        assert_eq!(registry.tag_specs().len(), 1);
    }
}
