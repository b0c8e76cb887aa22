use xylo_utils::TypeIdMap;

use crate::decl::{AccessorDecl, MappingEntry, TypeRef};

// -----------------------------------------------------------------------------
// MappingProvider

/// The explicit per-type mapping source, highest-precedence of the three
/// discovery sources.
///
/// Implementations are shared across threads and consulted once per type,
/// at registry-construction time.
pub trait MappingProvider: Send + Sync {
    /// Returns the explicit entry for `ty`, if one is configured.
    fn entry(&self, ty: TypeRef) -> Option<MappingEntry>;
}

// -----------------------------------------------------------------------------
// MappingTable

/// A [`MappingProvider`] backed by a plain per-type table.
///
/// # Examples
///
/// ```
/// use xylo_access::{AccessorDecl, Getter, MappingTable};
///
/// struct Point { x: u32 }
///
/// let mut table = MappingTable::new();
/// table.insert::<Point>(vec![
///     AccessorDecl::attr("x", Getter::value(|p: &Point| &p.x)),
/// ]);
/// ```
#[derive(Default)]
pub struct MappingTable {
    entries: TypeIdMap<MappingEntry>,
}

impl MappingTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: TypeIdMap::new(),
        }
    }

    /// Maps type `T` to a declaration list.
    pub fn insert<T: ?Sized + 'static>(&mut self, decls: Vec<AccessorDecl>) {
        self.insert_entry::<T>(MappingEntry::new(decls));
    }

    /// Maps type `T` to a full entry (declarations plus flags).
    pub fn insert_entry<T: ?Sized + 'static>(&mut self, entry: MappingEntry) {
        self.entries.insert_type::<T>(entry);
    }
}

impl MappingProvider for MappingTable {
    fn entry(&self, ty: TypeRef) -> Option<MappingEntry> {
        self.entries.get(&ty.id()).cloned()
    }
}

// -----------------------------------------------------------------------------
// AccessorInferrer

/// The fallback discovery source: proposes accessor declarations for types
/// that declared none, or that are flagged default-inferrible.
///
/// For a default-inferrible type the explicit mapping entry is *not*
/// absorbed directly; it is handed to [`infer`](AccessorInferrer::infer) as
/// base material and the inferrer decides how the two combine.
pub trait AccessorInferrer: Send + Sync {
    /// Whether `ty` should be inferred even when an explicit or static
    /// source yielded bindings.
    fn is_default_inferrible(&self, ty: TypeRef) -> bool {
        let _ = ty;
        false
    }

    /// Proposes the entry for `ty`. `base` carries the explicit mapping
    /// entry when the type is default-inferrible.
    fn infer(&self, ty: TypeRef, base: Option<MappingEntry>) -> MappingEntry;
}

// -----------------------------------------------------------------------------
// Compile-time registration

#[cfg(feature = "auto_register")]
pub use self::auto::StaticRegistration;

#[cfg(feature = "auto_register")]
mod auto {
    use crate::capability::StaticAccessors;
    use crate::context::MappingContext;

    /// One compile-time submitted static-accessor registration.
    ///
    /// Collected by [`MappingContext::auto_register`]; submit instances with
    /// [`submit_static_accessors!`](crate::submit_static_accessors).
    pub struct StaticRegistration {
        apply: fn(&mut MappingContext),
    }

    impl StaticRegistration {
        /// The registration for type `T`.
        pub const fn of<T: StaticAccessors + 'static>() -> Self {
            Self {
                apply: |ctx| ctx.register_static::<T>(),
            }
        }

        pub(crate) fn register_into(&self, ctx: &mut MappingContext) {
            (self.apply)(ctx);
        }
    }

    inventory::collect!(StaticRegistration);
}

/// Submits a type's [`StaticAccessors`](crate::StaticAccessors)
/// implementation for collection by
/// [`MappingContext::auto_register`](crate::MappingContext::auto_register).
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! submit_static_accessors {
    ($ty:ty) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::StaticRegistration::of::<$ty>()
        }
    };
}
