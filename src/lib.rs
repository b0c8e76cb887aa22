#![doc = include_str!("../README.md")]

pub use xylo_access as access;
pub use xylo_emit as emit;
pub use xylo_utils as utils;
