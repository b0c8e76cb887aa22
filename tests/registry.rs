use std::sync::Arc;

use xylograph::access::{
    AccessorDecl, AccessorForm, AccessorInferrer, Arity, ConfigError, Fetched, Getter,
    MappingContext, MappingEntry, MappingTable, PropertyError, Setter, StaticAccessors, TypeRef,
};
use xylograph::emit::Serializer;

// -----------------------------------------------------------------------------
// Fixtures

struct Account {
    owner: String,
    balance: i64,
}

fn account_decls() -> Vec<AccessorDecl> {
    vec![
        AccessorDecl::attr("owner", Getter::value(|a: &Account| &a.owner))
            .with_setter(Setter::assign(|a: &mut Account, v: String| a.owner = v))
            .declared::<String>(),
        AccessorDecl::tag("balance", Getter::value(|a: &Account| &a.balance)),
    ]
}

fn account_context() -> MappingContext {
    let mut table = MappingTable::new();
    table.insert::<Account>(account_decls());
    let mut ctx = MappingContext::new();
    ctx.set_provider(table);
    ctx
}

// -----------------------------------------------------------------------------
// Construction errors

struct Clash {
    n: u32,
}

fn clash_registry(decls: Vec<AccessorDecl>) -> Result<(), ConfigError> {
    let mut table = MappingTable::new();
    table.insert::<Clash>(decls);
    let mut ctx = MappingContext::new();
    ctx.set_provider(table);
    ctx.registry_for(TypeRef::of::<Clash>()).map(|_| ())
}

#[test]
fn duplicate_setter_fails_at_build_time() {
    let err = clash_registry(vec![
        AccessorDecl::tag_writer("n", Setter::assign(|c: &mut Clash, v: u32| c.n = v)),
        AccessorDecl::tag_writer("n", Setter::assign(|c: &mut Clash, v: u32| c.n = v)),
    ])
    .unwrap_err();

    match err {
        ConfigError::DuplicateSetter { tag, owner } => {
            assert_eq!(tag, "n");
            assert!(owner.contains("Clash"));
        }
        other => panic!("expected DuplicateSetter, got {other}"),
    }
}

#[test]
fn setterless_pair_fails_at_build_time() {
    let err = clash_registry(vec![
        AccessorDecl::tag("n", Getter::value(|c: &Clash| &c.n)),
        AccessorDecl::tag("n", Getter::value(|c: &Clash| &c.n)),
    ])
    .unwrap_err();
    assert!(matches!(err, ConfigError::NoSetterInPair { .. }));
}

#[test]
fn duplicate_body_fails_at_build_time() {
    let err = clash_registry(vec![
        AccessorDecl::body(Getter::value(|c: &Clash| &c.n)),
        AccessorDecl::body(Getter::value(|c: &Clash| &c.n)),
    ])
    .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateBody { .. }));
}

/// The inferrer is a second source; a body it proposes on top of a
/// statically declared one must fail during construction, not traversal.
#[test]
fn duplicate_body_across_sources_fails_at_build_time() {
    struct Texty {
        text: String,
    }
    impl StaticAccessors for Texty {
        fn body_decl() -> Option<AccessorDecl> {
            Some(AccessorDecl::body(Getter::value(|t: &Texty| &t.text)))
        }
    }

    struct BodyInferrer;
    impl AccessorInferrer for BodyInferrer {
        fn infer(&self, _ty: TypeRef, base: Option<MappingEntry>) -> MappingEntry {
            let mut entry = base.unwrap_or_default();
            entry.push(AccessorDecl::body(Getter::value(|t: &Texty| &t.text)));
            entry
        }
    }

    let mut ctx = MappingContext::new();
    ctx.register_static::<Texty>();
    ctx.set_inferrer(BodyInferrer);

    let err = ctx.registry_for(TypeRef::of::<Texty>()).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateBody { .. }));
}

#[test]
fn fused_declared_type_is_the_setter_side() {
    let mut table = MappingTable::new();
    table.insert::<Clash>(vec![
        AccessorDecl::tag("n", Getter::value(|c: &Clash| &c.n)).declared::<u64>(),
        AccessorDecl::tag_writer("n", Setter::assign(|c: &mut Clash, v: u32| c.n = v))
            .declared::<u32>(),
    ]);
    let mut ctx = MappingContext::new();
    ctx.set_provider(table);

    let registry = ctx.registry_for(TypeRef::of::<Clash>()).unwrap();
    let declared = registry.property_type("n").unwrap();
    assert_eq!(declared, Some(TypeRef::of::<u32>()));
}

// -----------------------------------------------------------------------------
// Registry shape

#[test]
fn registry_partitions_by_form() {
    let ctx = account_context();
    let registry = ctx.registry_for(TypeRef::of::<Account>()).unwrap();

    assert_eq!(registry.attr_specs().len(), 1);
    assert_eq!(registry.tag_specs().len(), 1);
    assert_eq!(registry.attr_specs()[0].form(), AccessorForm::Attr);
    assert_eq!(registry.tag_specs()[0].tag_name(), "balance");
    assert!(registry.body_spec().is_none());

    // Readable flattening: tags first, then attributes.
    let readable: Vec<_> = registry
        .readable()
        .iter()
        .map(|spec| spec.tag_name().to_owned())
        .collect();
    assert_eq!(readable, ["balance", "owner"]);
}

#[test]
fn find_prefers_the_tag_bucket() {
    struct Both {
        n: u32,
    }
    let mut table = MappingTable::new();
    table.insert::<Both>(vec![
        AccessorDecl::attr("n", Getter::value(|b: &Both| &b.n)),
        AccessorDecl::tag("n", Getter::value(|b: &Both| &b.n)),
    ]);
    let mut ctx = MappingContext::new();
    ctx.set_provider(table);

    let registry = ctx.registry_for(TypeRef::of::<Both>()).unwrap();
    let found = registry.find("n").unwrap();
    assert_eq!(found.form(), AccessorForm::Tag);
}

// -----------------------------------------------------------------------------
// Property operations

#[test]
fn property_get_and_set_round_trip() {
    let ctx = account_context();
    let registry = ctx.registry_for(TypeRef::of::<Account>()).unwrap();
    let mut account = Account {
        owner: "ada".to_owned(),
        balance: 10,
    };

    registry
        .set_property(&mut account, "owner", Box::new("grace".to_owned()))
        .unwrap();
    assert_eq!(account.owner, "grace");

    match registry.get_property(&account, "owner").unwrap() {
        Fetched::One(node) => {
            assert_eq!(node.downcast_ref::<String>().map(String::as_str), Some("grace"));
        }
        other => panic!("expected One, got {other:?}"),
    }
}

#[test]
fn missing_property_is_reported_with_owner() {
    let ctx = account_context();
    let registry = ctx.registry_for(TypeRef::of::<Account>()).unwrap();
    let account = Account {
        owner: "ada".to_owned(),
        balance: 0,
    };

    let err = registry.get_property(&account, "missing").unwrap_err();
    match err {
        PropertyError::Config(ConfigError::PropertyNotFound { name, owner }) => {
            assert_eq!(name, "missing");
            assert!(owner.contains("Account"));
        }
        other => panic!("expected PropertyNotFound, got {other}"),
    }
}

#[test]
fn setterless_property_rejects_writes_before_invocation() {
    let ctx = account_context();
    let registry = ctx.registry_for(TypeRef::of::<Account>()).unwrap();
    let mut account = Account {
        owner: "ada".to_owned(),
        balance: 0,
    };

    let err = registry
        .set_property(&mut account, "balance", Box::new(5_i64))
        .unwrap_err();
    assert!(matches!(
        err,
        PropertyError::Config(ConfigError::PropertyNotWritable { .. })
    ));
    assert_eq!(account.balance, 0);
}

#[test]
fn property_metadata_is_exposed() {
    let ctx = account_context();
    let registry = ctx.registry_for(TypeRef::of::<Account>()).unwrap();

    assert!(registry.can_get("owner"));
    assert!(registry.can_set("owner"));
    assert!(registry.can_get("balance"));
    assert!(!registry.can_set("balance"));
    assert_eq!(registry.property_arity("balance").unwrap(), Arity::Single);
}

// -----------------------------------------------------------------------------
// Source precedence

struct Doubly {
    a: u32,
    b: u32,
}

impl StaticAccessors for Doubly {
    fn attr_decls() -> Vec<AccessorDecl> {
        vec![AccessorDecl::attr("b", Getter::value(|d: &Doubly| &d.b))]
    }
}

#[test]
fn explicit_mapping_beats_static_declarations() {
    let mut table = MappingTable::new();
    table.insert::<Doubly>(vec![AccessorDecl::attr(
        "a",
        Getter::value(|d: &Doubly| &d.a),
    )]);
    let mut ctx = MappingContext::new();
    ctx.set_provider(table);
    ctx.register_static::<Doubly>();

    let out = Serializer::new(Arc::new(ctx))
        .to_markup_string(&Doubly { a: 1, b: 2 }, "d")
        .unwrap();
    assert_eq!(out, r#"<d a="1"/>"#);
}

#[test]
fn static_declarations_used_without_explicit_mapping() {
    let mut ctx = MappingContext::new();
    ctx.register_static::<Doubly>();

    let out = Serializer::new(Arc::new(ctx))
        .to_markup_string(&Doubly { a: 1, b: 2 }, "d")
        .unwrap();
    assert_eq!(out, r#"<d b="2"/>"#);
}

#[test]
fn inferrer_skipped_once_bindings_exist() {
    struct LoudInferrer;
    impl AccessorInferrer for LoudInferrer {
        fn infer(&self, _ty: TypeRef, base: Option<MappingEntry>) -> MappingEntry {
            let mut entry = base.unwrap_or_default();
            entry.push(AccessorDecl::attr(
                "inferred",
                Getter::value(|d: &Doubly| &d.a),
            ));
            entry
        }
    }

    let mut ctx = MappingContext::new();
    ctx.register_static::<Doubly>();
    ctx.set_inferrer(LoudInferrer);

    let registry = ctx.registry_for(TypeRef::of::<Doubly>()).unwrap();
    let names: Vec<_> = registry
        .attr_specs()
        .iter()
        .map(|spec| spec.tag_name().to_owned())
        .collect();
    assert_eq!(names, ["b"]);
}

// -----------------------------------------------------------------------------
// Cache behavior

#[test]
fn registries_are_cached_per_type() {
    let ctx = account_context();
    let owner = TypeRef::of::<Account>();

    let first = ctx.registry_for(owner).unwrap();
    let second = ctx.registry_for(owner).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

// -----------------------------------------------------------------------------
// Compile-time registration

#[cfg(feature = "auto_register")]
mod auto_register {
    use super::*;

    struct Stamp {
        id: u32,
    }

    impl StaticAccessors for Stamp {
        fn attr_decls() -> Vec<AccessorDecl> {
            vec![AccessorDecl::attr("id", Getter::value(|s: &Stamp| &s.id))]
        }
    }

    xylograph::access::submit_static_accessors!(Stamp);

    #[test]
    fn submitted_types_register_through_the_context() {
        let mut ctx = MappingContext::new();
        ctx.auto_register();

        let out = Serializer::new(Arc::new(ctx))
            .to_markup_string(&Stamp { id: 7 }, "stamp")
            .unwrap();
        assert_eq!(out, r#"<stamp id="7"/>"#);
    }
}
