//! Resource identity: identifiers, scope inference, upstream origin and
//! duplicate detection.

mod duplicate;
mod identifier;
mod origin;
mod scope;

pub use duplicate::*;
pub use identifier::*;
pub use scope::{builtin_scope, Scope};

/// Annotation recording the identity a resource had upstream. It can only
/// be written through [`KubeObject::set_origin_id`](crate::object::KubeObject::set_origin_id).
pub const UPSTREAM_IDENTIFIER: &str = "internal.kpt.dev/upstream-identifier";

/// Annotation marking a resource as local configuration.
pub const LOCAL_CONFIG_ANNOTATION: &str = "config.kubernetes.io/local-config";

/// Namespace of a kind whose scope cannot be determined.
pub const UNKNOWN_NAMESPACE: &str = "~C";

pub const DEFAULT_NAMESPACE: &str = "default";
