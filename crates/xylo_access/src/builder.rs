use tracing::debug;

use crate::context::MappingContext;
use crate::decl::{AccessorDecl, AccessorForm, TypeRef};
use crate::error::ConfigError;
use crate::registry::AccessorRegistry;
use crate::spec::AccessorSpec;

// -----------------------------------------------------------------------------
// build_registry

/// Discovers and condenses the accessor set of `owner`.
///
/// Sources, in strict precedence order:
///
/// 1. the explicit mapping entry from the context's provider;
/// 2. the type's own static declarations, only when no explicit entry
///    exists;
/// 3. the inferrer, when the prior sources yielded no tag or attribute
///    bindings, or when the type is default-inferrible. A default-inferrible
///    type's explicit entry is not absorbed directly; the inferrer receives
///    it as base material and decides the combination.
pub(crate) fn build_registry(
    owner: TypeRef,
    ctx: &MappingContext,
) -> Result<AccessorRegistry, ConfigError> {
    let entry = ctx.provider().and_then(|provider| provider.entry(owner));
    let default_inferrible = match ctx.inferrer() {
        Some(inferrer) => {
            inferrer.is_default_inferrible(owner)
                || entry.as_ref().is_some_and(|e| e.is_default_inferrible())
        }
        None => false,
    };

    let mut tags: Vec<AccessorDecl> = Vec::new();
    let mut attrs: Vec<AccessorDecl> = Vec::new();
    let mut body: Option<AccessorDecl> = None;

    if let Some(entry) = &entry {
        // Skipped for a default-inferrible type; the inferrer absorbs the
        // entry itself below.
        if !default_inferrible {
            absorb(
                owner,
                entry.decls().iter().cloned(),
                &mut tags,
                &mut attrs,
                &mut body,
            )?;
        }
    } else if let Some(source) = ctx.static_source(owner.id()) {
        let declared = (source.tag_decls)()
            .into_iter()
            .chain((source.attr_decls)())
            .chain((source.body_decl)());
        absorb(owner, declared, &mut tags, &mut attrs, &mut body)?;
    }

    if let Some(inferrer) = ctx.inferrer() {
        if (tags.is_empty() && attrs.is_empty()) || default_inferrible {
            let inferred = inferrer.infer(owner, entry);
            absorb(
                owner,
                inferred.into_decls(),
                &mut tags,
                &mut attrs,
                &mut body,
            )?;
        }
    }

    debug!(
        owner = owner.name(),
        tags = tags.len(),
        attrs = attrs.len(),
        body = body.is_some(),
        "built accessor registry"
    );

    Ok(AccessorRegistry::assemble(
        owner,
        tags.into_iter().map(AccessorSpec::from_decl).collect(),
        attrs.into_iter().map(AccessorSpec::from_decl).collect(),
        body.map(AccessorSpec::from_decl),
        ctx.extra_attrs_fn(owner.id()),
        ctx.self_tag_fn(owner.id()),
    ))
}

// -----------------------------------------------------------------------------
// Condensation

fn absorb(
    owner: TypeRef,
    decls: impl IntoIterator<Item = AccessorDecl>,
    tags: &mut Vec<AccessorDecl>,
    attrs: &mut Vec<AccessorDecl>,
    body: &mut Option<AccessorDecl>,
) -> Result<(), ConfigError> {
    for decl in decls {
        match decl.form() {
            AccessorForm::Tag => condense_into(owner, tags, decl)?,
            AccessorForm::Attr => condense_into(owner, attrs, decl)?,
            AccessorForm::Body => {
                if body.is_some() {
                    return Err(ConfigError::DuplicateBody {
                        owner: owner.name(),
                    });
                }
                *body = Some(decl);
            }
        }
    }
    Ok(())
}

/// Fuses `next` into a same-named declaration already in `bucket`, or
/// appends it.
///
/// Exactly one side of a fused pair must carry the set accessor; the fused
/// declared type is the setter side's, and a getter on the newer declaration
/// replaces the prior one.
fn condense_into(
    owner: TypeRef,
    bucket: &mut Vec<AccessorDecl>,
    next: AccessorDecl,
) -> Result<(), ConfigError> {
    let Some(prev) = bucket
        .iter_mut()
        .find(|decl| decl.tag_name() == next.tag_name())
    else {
        bucket.push(next);
        return Ok(());
    };

    match (prev.setter().is_some(), next.setter().is_some()) {
        (true, true) => {
            return Err(ConfigError::DuplicateSetter {
                tag: next.tag_name().to_owned(),
                owner: owner.name(),
            });
        }
        (false, false) => {
            return Err(ConfigError::NoSetterInPair {
                tag: next.tag_name().to_owned(),
                owner: owner.name(),
            });
        }
        (false, true) => prev.fuse_setter_side(&next),
        (true, false) => {}
    }

    if let Some(getter) = next.getter() {
        prev.replace_getter(getter.clone());
    }
    prev.widen_arity(next.arity());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Arity, Getter, Setter};

    struct Sample {
        value: u32,
    }

    fn read_decl() -> AccessorDecl {
        AccessorDecl::tag("value", Getter::value(|s: &Sample| &s.value))
    }

    fn write_decl() -> AccessorDecl {
        AccessorDecl::tag_writer("value", Setter::assign(|s: &mut Sample, v: u32| s.value = v))
            .declared::<u32>()
    }

    fn condense_all(decls: Vec<AccessorDecl>) -> Result<Vec<AccessorDecl>, ConfigError> {
        let owner = TypeRef::of::<Sample>();
        let mut tags = Vec::new();
        let mut attrs = Vec::new();
        let mut body = None;
        absorb(owner, decls, &mut tags, &mut attrs, &mut body)?;
        Ok(tags)
    }

    #[test]
    fn fuses_getter_and_setter_pairs() {
        let tags = condense_all(vec![read_decl(), write_decl()]).unwrap();

        assert_eq!(tags.len(), 1);
        let fused = &tags[0];
        assert!(fused.getter().is_some());
        assert!(fused.setter().is_some());
        // Declared type comes from the setter side.
        assert_eq!(fused.declared_type(), Some(TypeRef::of::<u32>()));
    }

    #[test]
    fn duplicate_setters_are_fatal() {
        let err = condense_all(vec![write_decl(), write_decl()]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSetter { .. }));
    }

    #[test]
    fn setterless_pairs_are_fatal() {
        let err = condense_all(vec![read_decl(), read_decl()]).unwrap_err();
        assert!(matches!(err, ConfigError::NoSetterInPair { .. }));
    }

    #[test]
    fn duplicate_bodies_are_fatal() {
        let owner = TypeRef::of::<Sample>();
        let mut tags = Vec::new();
        let mut attrs = Vec::new();
        let mut body = None;

        let decls = vec![
            AccessorDecl::body(Getter::value(|s: &Sample| &s.value)),
            AccessorDecl::body(Getter::value(|s: &Sample| &s.value)),
        ];
        let err = absorb(owner, decls, &mut tags, &mut attrs, &mut body).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateBody { .. }));
    }

    #[test]
    fn fusion_widens_arity() {
        let many = AccessorDecl::tag_writer(
            "value",
            Setter::assign(|s: &mut Sample, v: u32| s.value = v),
        )
        .many();
        let tags = condense_all(vec![read_decl(), many]).unwrap();
        assert_eq!(tags[0].arity(), Arity::Many);
    }
}
