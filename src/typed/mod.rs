//! Typed module - Conversion between node trees and native Rust values.

mod convert;
mod strict;

pub use convert::*;
