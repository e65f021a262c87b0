//! Current and origin identity of objects.

use tracing::warn;

use crate::error::Result;
use crate::object::{parse_api_version, KubeObject};
use crate::variant::FieldPath;

use super::scope::{builtin_scope, Scope};
use super::{ResourceIdentifier, DEFAULT_NAMESPACE, UNKNOWN_NAMESPACE, UPSTREAM_IDENTIFIER};

impl KubeObject {
    fn scope(&self) -> Option<Scope> {
        let api_version = self.api_version();
        let (group, _) = parse_api_version(&api_version);
        builtin_scope(group, &self.kind())
    }

    /// Returns true if the object lives in a namespace. Kinds without a
    /// known scope are namespaced when they carry `metadata.namespace`.
    pub fn is_namespace_scoped(&self) -> bool {
        match self.scope() {
            Some(scope) => scope == Scope::Namespaced,
            None => self.has_namespace(),
        }
    }

    pub fn is_cluster_scoped(&self) -> bool {
        !self.is_namespace_scoped()
    }

    /// Returns the identifier derived from the current field values.
    ///
    /// Namespaced built-in kinds without a namespace resolve to `default`,
    /// cluster-scoped built-in kinds to the empty namespace, and kinds of
    /// unknown scope to [`UNKNOWN_NAMESPACE`].
    pub fn id(&self) -> ResourceIdentifier {
        let api_version = self.api_version();
        let (group, version) = parse_api_version(&api_version);
        let namespace = match (self.namespace(), self.scope()) {
            (ns, _) if !ns.is_empty() => ns,
            (_, Some(Scope::Namespaced)) => DEFAULT_NAMESPACE.to_string(),
            (_, Some(Scope::Cluster)) => String::new(),
            (_, None) => UNKNOWN_NAMESPACE.to_string(),
        };
        ResourceIdentifier {
            group: group.to_string(),
            version: version.to_string(),
            kind: self.kind(),
            namespace,
            name: self.name(),
        }
    }

    /// Returns the identifier the object had upstream, read from the
    /// upstream identifier annotation. Falls back to [`KubeObject::id`] when
    /// the annotation is absent or malformed.
    pub fn origin_id(&self) -> ResourceIdentifier {
        let annotation = self.annotation(UPSTREAM_IDENTIFIER);
        if annotation.is_empty() {
            return self.id();
        }
        match annotation.parse() {
            Ok(id) => id,
            Err(err) => {
                warn!(object = %self.id(), %err, "ignoring malformed upstream identifier");
                self.id()
            }
        }
    }

    /// Records the upstream identity of the object. This is the only way to
    /// write the upstream identifier annotation.
    pub fn set_origin_id(&self, id: &ResourceIdentifier) -> Result<()> {
        let path = FieldPath::fields(&["metadata", "annotations", UPSTREAM_IDENTIFIER]);
        self.map_variant()
            .set_nested_string(&id.to_string(), &path)
            .map_err(|e| self.field_error(&path, "string", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WITH_ORIGIN: &str = r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: cm
  annotations:
    internal.kpt.dev/upstream-identifier: '|ConfigMap|example|example'
"#;

    const CUSTOM: &str = r#"apiVersion: test.kpt.dev/v1
kind: Custom
metadata:
  name: cm
"#;

    #[test]
    fn test_origin() {
        let obj = KubeObject::parse(WITH_ORIGIN).unwrap();
        assert_eq!(obj.origin_id().to_string(), "|ConfigMap|example|example");
        assert_eq!(obj.id().to_string(), "|ConfigMap|default|cm");

        let custom = KubeObject::parse(CUSTOM).unwrap();
        assert_eq!(custom.origin_id().to_string(), custom.id().to_string());
        assert_eq!(custom.id().namespace, UNKNOWN_NAMESPACE);
    }

    #[test]
    fn test_cluster_scoped_builtin() {
        let obj = KubeObject::parse(
            "apiVersion: rbac.authorization.k8s.io/v1\nkind: ClusterRoleBinding\nmetadata:\n  name: admin\n",
        )
        .unwrap();
        assert_eq!(obj.id().namespace, "");
        assert!(obj.is_cluster_scoped());
        assert_eq!(obj.id().to_string(), "rbac.authorization.k8s.io|ClusterRoleBinding||admin");
    }

    #[test]
    fn test_scope_of_unknown_kind() {
        let custom = KubeObject::parse(CUSTOM).unwrap();
        assert!(custom.is_cluster_scoped());
        custom.set_namespace("team").unwrap();
        assert!(custom.is_namespace_scoped());
        assert_eq!(custom.id().namespace, "team");
    }

    #[test]
    fn test_malformed_origin_falls_back() {
        let obj = KubeObject::parse(&WITH_ORIGIN.replace("|ConfigMap|example|example", "broken")).unwrap();
        assert_eq!(obj.origin_id(), obj.id());
    }

    #[test]
    fn test_set_origin_id() {
        let obj = KubeObject::parse(CUSTOM).unwrap();
        let origin = obj.id();
        obj.set_name("renamed").unwrap();
        obj.set_origin_id(&origin).unwrap();
        assert_eq!(obj.origin_id().to_string(), "test.kpt.dev|Custom|~C|cm");
        assert_eq!(obj.id().name, "renamed");
    }
}
