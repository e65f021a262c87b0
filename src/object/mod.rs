//! Object model: resources, nested maps and collections.

mod error;
mod kubeobject;
mod objects;
pub mod selector;
mod subobject;

pub use error::*;
pub use kubeobject::*;
pub use objects::*;
pub use subobject::SubObject;

pub(crate) use error::short_type_name;
