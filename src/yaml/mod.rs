//! YAML module - A comment-carrying node tree with its parser and emitter.
//!
//! The tree keeps head, line and foot comments on every node so that a
//! resource can be read, edited in place and written back without losing
//! the comments of fields that were not touched.

mod convert;
mod emitter;
mod node;
mod parser;
mod scalar;

pub use convert::*;
pub use emitter::*;
pub use node::*;
pub use parser::*;
pub use scalar::{format_float, needs_quotes, resolve_tag, string_style};
