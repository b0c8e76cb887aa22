#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Modules

mod builder;
mod capability;
mod context;
mod decl;
mod error;
mod leaf;
mod node;
mod registry;
mod sources;
mod spec;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use capability::{ExtraAttrs, SelfTagged, StaticAccessors};
pub use context::MappingContext;
pub use decl::{AccessorDecl, AccessorForm, Arity, Fetched, MappingEntry, TypeRef};
pub use decl::{Getter, Setter};
pub use error::{AccessError, ConfigError, PropertyError};
pub use leaf::LeafTable;
pub use node::{Node, short_type_name};
pub use registry::AccessorRegistry;
pub use sources::{AccessorInferrer, MappingProvider, MappingTable};
pub use spec::AccessorSpec;

#[cfg(feature = "auto_register")]
pub use sources::StaticRegistration;

// -----------------------------------------------------------------------------
// Macro support

#[cfg(feature = "auto_register")]
#[doc(hidden)]
pub mod __macro_exports {
    pub use inventory;
}
