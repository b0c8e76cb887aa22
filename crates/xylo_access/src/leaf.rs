use core::any::TypeId;
use core::fmt::{Display, Write};
use std::sync::Arc;

use xylo_utils::TypeIdMap;

use crate::error::AccessError;
use crate::node::Node;

type RenderFn = Arc<dyn Fn(&dyn Node, &mut String) -> Result<(), AccessError> + Send + Sync>;

// -----------------------------------------------------------------------------
// LeafTable

/// The leaf classifier and renderer.
///
/// A type registered here is a *leaf*: a terminal value with no further
/// decomposable structure. Leaves are never examined for accessors; their
/// element is always a single open/text/close triple, and attribute and
/// body values are rendered through the same table.
///
/// Registration is independent of accessor discovery. [`LeafTable::new`]
/// pre-registers the primitive types; [`LeafTable::empty`] starts blank.
///
/// # Examples
///
/// ```
/// use xylo_access::LeafTable;
///
/// let mut table = LeafTable::new();
/// assert!(table.is_leaf_type::<u32>());
///
/// struct Celsius(f32);
/// impl std::fmt::Display for Celsius {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "{}C", self.0)
///     }
/// }
/// table.register::<Celsius>();
///
/// let mut text = String::new();
/// table.render(&Celsius(21.5), &mut text).unwrap();
/// assert_eq!(text, "21.5C");
/// ```
pub struct LeafTable {
    renderers: TypeIdMap<RenderFn>,
}

impl LeafTable {
    /// Creates a table with no registrations.
    pub fn empty() -> Self {
        Self {
            renderers: TypeIdMap::new(),
        }
    }

    /// Creates a table with the primitive types pre-registered.
    ///
    /// - `bool` `char`
    /// - `i8 - i128` `isize`
    /// - `u8 - u128` `usize`
    /// - `f32` `f64`
    /// - `String` `&'static str`
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.register::<bool>();
        table.register::<char>();
        table.register::<u8>();
        table.register::<u16>();
        table.register::<u32>();
        table.register::<u64>();
        table.register::<u128>();
        table.register::<usize>();
        table.register::<i8>();
        table.register::<i16>();
        table.register::<i32>();
        table.register::<i64>();
        table.register::<i128>();
        table.register::<isize>();
        table.register::<f32>();
        table.register::<f64>();
        table.register::<String>();
        table.register::<&'static str>();
        table
    }

    /// Registers `T` as a leaf rendered through its [`Display`] impl.
    pub fn register<T: Node + Display>(&mut self) {
        self.register_with::<T>(|value, out| {
            write!(out, "{value}").map_err(|err| AccessError::Message(err.to_string()))
        });
    }

    /// Registers `T` as a leaf with a custom renderer.
    pub fn register_with<T: Node>(
        &mut self,
        render: impl Fn(&T, &mut String) -> Result<(), AccessError> + Send + Sync + 'static,
    ) {
        self.renderers.insert_type::<T>(Arc::new(move |node: &dyn Node, out: &mut String| {
            match node.downcast_ref::<T>() {
                Some(value) => render(value, out),
                None => Err(AccessError::mismatch::<T>(node)),
            }
        }));
    }

    /// Whether the type identified by `ty` is a leaf.
    #[inline]
    pub fn is_leaf(&self, ty: TypeId) -> bool {
        self.renderers.contains(&ty)
    }

    /// Whether `T` is a leaf.
    #[inline]
    pub fn is_leaf_type<T: ?Sized + 'static>(&self) -> bool {
        self.is_leaf(TypeId::of::<T>())
    }

    /// Renders `value` as text into `out`.
    ///
    /// The text is appended unescaped; entity escaping belongs to the
    /// output path.
    pub fn render(&self, value: &dyn Node, out: &mut String) -> Result<(), AccessError> {
        match self.renderers.get(&value.ty_id()) {
            Some(render) => render(value, out),
            None => Err(AccessError::NoLeafRenderer {
                type_name: value.type_name(),
            }),
        }
    }
}

impl Default for LeafTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_leaves() {
        let table = LeafTable::new();
        assert!(table.is_leaf_type::<u32>());
        assert!(table.is_leaf_type::<String>());
        assert!(!table.is_leaf_type::<Vec<u32>>());
    }

    #[test]
    fn renders_through_display() {
        let table = LeafTable::new();
        let mut out = String::new();
        table.render(&42_u8, &mut out).unwrap();
        table.render(&true, &mut out).unwrap();
        assert_eq!(out, "42true");
    }

    #[test]
    fn unregistered_type_is_an_error() {
        let table = LeafTable::new();
        let mut out = String::new();
        let err = table.render(&vec![1_u8], &mut out).unwrap_err();
        assert!(matches!(err, AccessError::NoLeafRenderer { .. }));
    }
}
