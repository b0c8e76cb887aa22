#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Modules

pub mod hash;

mod type_map;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use type_map::TypeIdMap;
