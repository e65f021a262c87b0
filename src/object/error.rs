//! Structured field errors raised by object accessors.

use thiserror::Error;

use crate::variant::VariantError;

/// KubeObjectFieldsError reports a failed Get/Set/Remove/As on a field of a
/// top-level object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Resource(apiVersion={api_version}, kind={kind}, name={name}) has unmatched field type {expected:?} in fieldpath {path}: {cause}"
)]
pub struct KubeObjectFieldsError {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub path: String,
    pub expected: String,
    #[source]
    pub cause: VariantError,
}

/// SubObjectFieldsError reports a failed Get/Set/Remove on a field of a
/// nested map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SubObject has unmatched field type {expected:?} in fieldpath {path}: {cause}")]
pub struct SubObjectFieldsError {
    pub path: String,
    pub expected: String,
    #[source]
    pub cause: VariantError,
}

/// Returns the name of `T` without module paths, e.g. `Vec<String>`.
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or_default());
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or_default());
    out
}
