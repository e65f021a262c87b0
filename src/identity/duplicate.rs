use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::object::KubeObject;

/// Fails if two objects share apiVersion, kind, namespace and name.
/// Namespaces are compared after defaulting, so a ConfigMap without a
/// namespace collides with the same ConfigMap in `default`.
pub fn check_resource_duplication<'a, I>(objects: I) -> Result<()>
where
    I: IntoIterator<Item = &'a KubeObject>,
{
    let mut seen = HashSet::new();
    for obj in objects {
        let id = obj.id();
        if !seen.insert((obj.api_version(), id.kind, id.namespace, id.name)) {
            return Err(Error::DuplicateResource {
                api_version: obj.api_version(),
                kind: obj.kind(),
                namespace: obj.namespace(),
                name: obj.name(),
            });
        }
    }
    Ok(())
}
