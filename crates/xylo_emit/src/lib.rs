#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Modules

mod engine;
mod error;
mod forbid;
mod writer;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use engine::{IndentMode, Serializer};
pub use error::EmitError;
pub use forbid::Forbidder;
pub use writer::MarkupWriter;
