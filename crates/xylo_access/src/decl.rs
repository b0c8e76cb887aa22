use core::any::TypeId;
use core::fmt;
use std::sync::Arc;

use crate::error::AccessError;
use crate::node::Node;

// -----------------------------------------------------------------------------
// AccessorForm / Arity

/// The markup form an accessor's value is rendered in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccessorForm {
    /// Rendered as a child element.
    Tag,
    /// Rendered as an attribute on the current element.
    Attr,
    /// Supplies the element's direct text content. At most one per type.
    Body,
}

impl fmt::Display for AccessorForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessorForm::Tag => "tag",
            AccessorForm::Attr => "attribute",
            AccessorForm::Body => "body",
        })
    }
}

/// Whether an accessor yields one child or a sequence of children.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Arity {
    #[default]
    Single,
    Many,
}

// -----------------------------------------------------------------------------
// TypeRef

/// A declared-type token: a [`TypeId`] paired with the type's name.
///
/// Comparison and hashing use the id alone; the name travels along for
/// diagnostics and wildcard tags.
#[derive(Copy, Clone, Debug, Eq)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
}

impl TypeRef {
    /// The token for type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    /// The token for a value's concrete type.
    pub fn of_val(node: &dyn Node) -> Self {
        Self {
            id: node.ty_id(),
            name: node.type_name(),
        }
    }

    /// Returns the type's identity.
    #[inline]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type's full name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeRef {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl core::hash::Hash for TypeRef {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// -----------------------------------------------------------------------------
// Fetched

/// The outcome of one get-accessor invocation.
#[derive(Debug)]
pub enum Fetched<'v> {
    /// The property holds no value; no child is emitted.
    Absent,
    /// A single child value.
    One(&'v dyn Node),
    /// A sequence of children, in source order. May be empty.
    Many(Vec<&'v dyn Node>),
}

// -----------------------------------------------------------------------------
// Getter / Setter

type GetterFn = dyn for<'v> Fn(&'v dyn Node) -> Result<Fetched<'v>, AccessError> + Send + Sync;

/// A shared get-invocation handle, resolved once at declaration time.
///
/// The typed constructors downcast the receiver internally; handing the
/// resulting handle a value of the wrong concrete type yields an
/// [`AccessError::TypeMismatch`] rather than a panic.
#[derive(Clone)]
pub struct Getter {
    fun: Arc<GetterFn>,
}

impl Getter {
    /// Wraps a raw, fallible accessor over the type-erased receiver.
    pub fn with<F>(f: F) -> Self
    where
        F: for<'v> Fn(&'v dyn Node) -> Result<Fetched<'v>, AccessError> + Send + Sync + 'static,
    {
        Self { fun: Arc::new(f) }
    }

    /// A getter for an always-present single-valued property.
    ///
    /// # Examples
    ///
    /// ```
    /// use xylo_access::Getter;
    ///
    /// struct Point { x: u32 }
    /// let getter = Getter::value(|p: &Point| &p.x);
    /// ```
    pub fn value<T, R, F>(f: F) -> Self
    where
        T: Node,
        R: Node,
        F: Fn(&T) -> &R + Send + Sync + 'static,
    {
        Self::with(move |node: &dyn Node| {
            let target = downcast::<T>(node)?;
            Ok(Fetched::One(f(target) as &dyn Node))
        })
    }

    /// A getter for an optional single-valued property; `None` yields no
    /// child at all.
    pub fn opt<T, R, F>(f: F) -> Self
    where
        T: Node,
        R: Node,
        F: Fn(&T) -> Option<&R> + Send + Sync + 'static,
    {
        Self::with(move |node: &dyn Node| {
            let target = downcast::<T>(node)?;
            Ok(match f(target) {
                Some(value) => Fetched::One(value as &dyn Node),
                None => Fetched::Absent,
            })
        })
    }

    /// A getter for a homogeneous sequence-valued property.
    ///
    /// An empty slice yields zero children, not an error.
    pub fn seq<T, R, F>(f: F) -> Self
    where
        T: Node,
        R: Node,
        F: Fn(&T) -> &[R] + Send + Sync + 'static,
    {
        Self::with(move |node: &dyn Node| {
            let target = downcast::<T>(node)?;
            let items = f(target).iter().map(|item| item as &dyn Node).collect();
            Ok(Fetched::Many(items))
        })
    }

    /// Invokes the handle against a type-erased receiver.
    #[inline]
    pub fn invoke<'v>(&self, node: &'v dyn Node) -> Result<Fetched<'v>, AccessError> {
        (self.fun)(node)
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Getter")
    }
}

fn downcast<'v, T: Node>(node: &'v dyn Node) -> Result<&'v T, AccessError> {
    node.downcast_ref::<T>()
        .ok_or_else(|| AccessError::mismatch::<T>(node))
}

type SetterFn = dyn Fn(&mut dyn Node, Box<dyn Node>) -> Result<(), AccessError> + Send + Sync;

/// A shared set-invocation handle, resolved once at declaration time.
#[derive(Clone)]
pub struct Setter {
    fun: Arc<SetterFn>,
}

impl Setter {
    /// Wraps a raw, fallible mutator over the type-erased receiver.
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&mut dyn Node, Box<dyn Node>) -> Result<(), AccessError> + Send + Sync + 'static,
    {
        Self { fun: Arc::new(f) }
    }

    /// A setter assigning a typed value into a typed receiver.
    ///
    /// # Examples
    ///
    /// ```
    /// use xylo_access::Setter;
    ///
    /// struct Point { x: u32 }
    /// let setter = Setter::assign(|p: &mut Point, x: u32| p.x = x);
    /// ```
    pub fn assign<T, R, F>(f: F) -> Self
    where
        T: Node,
        R: Node,
        F: Fn(&mut T, R) + Send + Sync + 'static,
    {
        Self::with(move |node: &mut dyn Node, value: Box<dyn Node>| {
            let value = match value.take::<R>() {
                Ok(value) => value,
                Err(back) => return Err(AccessError::mismatch::<R>(&*back)),
            };
            match node.downcast_mut::<T>() {
                Some(target) => {
                    f(target, value);
                    Ok(())
                }
                None => Err(AccessError::mismatch::<T>(node)),
            }
        })
    }

    /// Invokes the handle against a type-erased receiver.
    #[inline]
    pub fn invoke(&self, node: &mut dyn Node, value: Box<dyn Node>) -> Result<(), AccessError> {
        (self.fun)(node, value)
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Setter")
    }
}

// -----------------------------------------------------------------------------
// AccessorDecl

/// One declared property binding, before condensation.
///
/// Declarations from different sources that share a tag name are fused by
/// the registry builder; see the crate-level documentation for the fusion
/// rules.
#[derive(Clone, Debug)]
pub struct AccessorDecl {
    tag: Box<str>,
    form: AccessorForm,
    arity: Arity,
    declared: Option<TypeRef>,
    getter: Option<Getter>,
    setter: Option<Setter>,
}

impl AccessorDecl {
    fn new(tag: impl Into<Box<str>>, form: AccessorForm) -> Self {
        Self {
            tag: tag.into(),
            form,
            arity: Arity::Single,
            declared: None,
            getter: None,
            setter: None,
        }
    }

    /// A readable tag-form (child element) declaration.
    pub fn tag(tag: impl Into<Box<str>>, getter: Getter) -> Self {
        Self::new(tag, AccessorForm::Tag).with_getter(getter)
    }

    /// A readable attribute-form declaration.
    pub fn attr(tag: impl Into<Box<str>>, getter: Getter) -> Self {
        Self::new(tag, AccessorForm::Attr).with_getter(getter)
    }

    /// A readable body-form declaration.
    pub fn body(getter: Getter) -> Self {
        Self::new("", AccessorForm::Body).with_getter(getter)
    }

    /// A write-only tag-form declaration.
    pub fn tag_writer(tag: impl Into<Box<str>>, setter: Setter) -> Self {
        Self::new(tag, AccessorForm::Tag).with_setter(setter)
    }

    /// A write-only attribute-form declaration.
    pub fn attr_writer(tag: impl Into<Box<str>>, setter: Setter) -> Self {
        Self::new(tag, AccessorForm::Attr).with_setter(setter)
    }

    /// Marks the declaration as sequence-valued.
    pub fn many(mut self) -> Self {
        self.arity = Arity::Many;
        self
    }

    /// Attaches a get accessor.
    pub fn with_getter(mut self, getter: Getter) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Attaches a set accessor.
    pub fn with_setter(mut self, setter: Setter) -> Self {
        self.setter = Some(setter);
        self
    }

    /// Records the declared property type.
    pub fn declared<T: ?Sized + 'static>(mut self) -> Self {
        self.declared = Some(TypeRef::of::<T>());
        self
    }

    /// Returns the declared tag name.
    #[inline]
    pub fn tag_name(&self) -> &str {
        &self.tag
    }

    /// Returns the markup form.
    #[inline]
    pub fn form(&self) -> AccessorForm {
        self.form
    }

    /// Returns the declared arity.
    #[inline]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Returns the declared property type, if recorded.
    #[inline]
    pub fn declared_type(&self) -> Option<TypeRef> {
        self.declared
    }

    /// Returns the get accessor, if any.
    #[inline]
    pub fn getter(&self) -> Option<&Getter> {
        self.getter.as_ref()
    }

    /// Returns the set accessor, if any.
    #[inline]
    pub fn setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }

    // Fusion support for the registry builder: the newer declaration's
    // setter side is authoritative for the declared type.
    pub(crate) fn fuse_setter_side(&mut self, other: &AccessorDecl) {
        self.setter = other.setter.clone();
        self.declared = other.declared;
    }

    pub(crate) fn replace_getter(&mut self, getter: Getter) {
        self.getter = Some(getter);
    }

    pub(crate) fn widen_arity(&mut self, other: Arity) {
        if other == Arity::Many {
            self.arity = Arity::Many;
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Box<str>,
        AccessorForm,
        Arity,
        Option<TypeRef>,
        Option<Getter>,
        Option<Setter>,
    ) {
        (
            self.tag,
            self.form,
            self.arity,
            self.declared,
            self.getter,
            self.setter,
        )
    }
}

// -----------------------------------------------------------------------------
// MappingEntry

/// The explicit per-type mapping supplied by a [`MappingProvider`].
///
/// [`MappingProvider`]: crate::MappingProvider
#[derive(Clone, Debug, Default)]
pub struct MappingEntry {
    decls: Vec<AccessorDecl>,
    default_inferrible: bool,
}

impl MappingEntry {
    /// Creates an entry from a declaration list.
    pub fn new(decls: Vec<AccessorDecl>) -> Self {
        Self {
            decls,
            default_inferrible: false,
        }
    }

    /// Flags the owning type as default-inferrible: the inferrer is
    /// consulted even though this explicit entry exists, receiving the entry
    /// as base material.
    pub fn default_inferrible(mut self) -> Self {
        self.default_inferrible = true;
        self
    }

    /// Appends one declaration.
    pub fn push(&mut self, decl: AccessorDecl) {
        self.decls.push(decl);
    }

    /// Returns the declarations in declaration order.
    #[inline]
    pub fn decls(&self) -> &[AccessorDecl] {
        &self.decls
    }

    /// Consumes the entry, yielding its declarations.
    pub fn into_decls(self) -> Vec<AccessorDecl> {
        self.decls
    }

    /// Returns the default-inferrible flag.
    #[inline]
    pub fn is_default_inferrible(&self) -> bool {
        self.default_inferrible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        left: u32,
        right: u32,
    }

    #[test]
    fn value_getter_fetches_one() {
        let getter = Getter::value(|p: &Pair| &p.left);
        let pair = Pair { left: 4, right: 5 };

        match getter.invoke(&pair).unwrap() {
            Fetched::One(node) => assert_eq!(node.downcast_ref::<u32>(), Some(&4)),
            other => panic!("expected One, got {other:?}"),
        }
        assert_eq!(pair.right, 5);
    }

    #[test]
    fn getter_rejects_foreign_receiver() {
        let getter = Getter::value(|p: &Pair| &p.left);
        let err = getter.invoke(&"not a pair").unwrap_err();
        assert!(matches!(err, AccessError::TypeMismatch { .. }));
    }

    #[test]
    fn assign_setter_writes_through() {
        let setter = Setter::assign(|p: &mut Pair, v: u32| p.right = v);
        let mut pair = Pair { left: 0, right: 0 };

        setter.invoke(&mut pair, Box::new(9_u32)).unwrap();
        assert_eq!(pair.right, 9);
    }

    #[test]
    fn assign_setter_rejects_wrong_payload() {
        let setter = Setter::assign(|p: &mut Pair, v: u32| p.right = v);
        let mut pair = Pair { left: 0, right: 0 };

        let err = setter.invoke(&mut pair, Box::new("nine")).unwrap_err();
        assert!(matches!(err, AccessError::TypeMismatch { .. }));
        assert_eq!(pair.right, 0);
    }
}
