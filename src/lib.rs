//! # KRM functions
//!
//! An SDK for writing KRM functions: programs that read a `ResourceList`
//! of Kubernetes resources, transform or validate them, and write the
//! updated list back out.
//!
//! Resources are edited in place through path based accessors that keep
//! the comments and layout of the input intact.
//!
//! ## Modules
//!
//! - [`yaml`] - Comment-carrying YAML node tree, parser and emitter
//! - [`variant`] - Map, sequence and scalar views over the node tree, with nested get/set/remove
//! - [`typed`] - Conversion between node trees and serde types
//! - [`object`] - `KubeObject`, `SubObject` and `KubeObjects`
//! - [`identity`] - Resource identifiers, upstream origin tracking and duplicate detection
//! - [`resourcelist`] - The `ResourceList` format, results and the function pipeline
//!
//! ## Example
//!
//! ```no_run
//! use krm_fn::object::selector::is_gvk;
//! use krm_fn::resourcelist::{as_main, ResourceList};
//!
//! fn main() -> krm_fn::Result<()> {
//!     as_main(&mut |rl: &mut ResourceList| -> krm_fn::Result<bool> {
//!         for deployment in rl.items.where_(is_gvk("apps", "", "Deployment")).iter() {
//!             deployment.set(&3, &["spec", "replicas"])?;
//!         }
//!         Ok(true)
//!     })
//! }
//! ```

pub mod error;
pub mod identity;
pub mod log;
pub mod object;
pub mod resourcelist;
pub mod typed;
pub mod variant;
pub mod yaml;

pub use error::{Error, Result};
pub use identity::ResourceIdentifier;
pub use object::{KubeObject, KubeObjectFieldsError, KubeObjects, SubObject, SubObjectFieldsError};
pub use resourcelist::{ResourceList, ResourceListProcessor, Results, Runner, RunnerProcessor, Severity};
pub use variant::{FieldPath, MapVariant, SliceVariant, Variant};
