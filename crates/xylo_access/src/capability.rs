use crate::decl::AccessorDecl;
use crate::node::Node;

// -----------------------------------------------------------------------------
// Capability traits
//
// A small closed set of optional per-type behaviors. Each is resolved once
// into a downcasting thunk when the type is registered, then checked by the
// engine without any per-node type tests.

/// A type that declares its own accessors statically.
///
/// This is the second discovery source of the registry builder: consulted
/// only when no explicit mapping entry exists for the type.
///
/// # Examples
///
/// ```
/// use xylo_access::{AccessorDecl, Getter, StaticAccessors};
///
/// struct Tick { count: u64 }
///
/// impl StaticAccessors for Tick {
///     fn attr_decls() -> Vec<AccessorDecl> {
///         vec![AccessorDecl::attr("count", Getter::value(|t: &Tick| &t.count))]
///     }
/// }
/// ```
pub trait StaticAccessors {
    /// Tag-form (child element) declarations.
    fn tag_decls() -> Vec<AccessorDecl> {
        Vec::new()
    }

    /// Attribute-form declarations.
    fn attr_decls() -> Vec<AccessorDecl> {
        Vec::new()
    }

    /// The body declaration, if the type has direct text content.
    fn body_decl() -> Option<AccessorDecl> {
        None
    }
}

/// An object exposing an open-ended attribute list.
///
/// The pairs are emitted after the declared attribute specs, in the order
/// this method yields them.
pub trait ExtraAttrs {
    /// Attribute name → rendered text pairs, in emission order.
    fn extra_attrs(&self) -> Vec<(String, String)>;
}

/// A child that reports its own element tag name.
///
/// Consulted for the elements of a sequence-valued accessor, overriding the
/// sequence's shared tag name.
pub trait SelfTagged {
    /// The element tag to emit this value under.
    fn element_tag(&self) -> &str;
}

// -----------------------------------------------------------------------------
// Resolved thunks

pub(crate) type ExtraAttrsFn = fn(&dyn Node) -> Option<&dyn ExtraAttrs>;
pub(crate) type SelfTagFn = fn(&dyn Node) -> Option<&dyn SelfTagged>;

pub(crate) fn extra_attrs_thunk<T: Node + ExtraAttrs>() -> ExtraAttrsFn {
    |node: &dyn Node| {
        node.downcast_ref::<T>()
            .map(|target| target as &dyn ExtraAttrs)
    }
}

pub(crate) fn self_tag_thunk<T: Node + SelfTagged>() -> SelfTagFn {
    |node: &dyn Node| {
        node.downcast_ref::<T>()
            .map(|target| target as &dyn SelfTagged)
    }
}

/// The static-source table entry for one registered type.
pub(crate) struct StaticSource {
    pub(crate) tag_decls: fn() -> Vec<AccessorDecl>,
    pub(crate) attr_decls: fn() -> Vec<AccessorDecl>,
    pub(crate) body_decl: fn() -> Option<AccessorDecl>,
}

impl StaticSource {
    pub(crate) fn of<T: StaticAccessors>() -> Self {
        Self {
            tag_decls: T::tag_decls,
            attr_decls: T::attr_decls,
            body_decl: T::body_decl,
        }
    }
}
