//! Scope of well-known resource kinds.
//!
//! Without schema information the scope of a custom kind cannot be known;
//! callers fall back to a best-effort guess for kinds not listed here.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Scope of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Namespaced,
    Cluster,
}

static BUILTIN_SCOPES: Lazy<HashMap<String, Scope>> = Lazy::new(|| {
    use Scope::{Cluster, Namespaced};
    [
        ("", "Binding", Namespaced),
        ("", "ConfigMap", Namespaced),
        ("", "Endpoints", Namespaced),
        ("", "Event", Namespaced),
        ("", "LimitRange", Namespaced),
        ("", "PersistentVolumeClaim", Namespaced),
        ("", "Pod", Namespaced),
        ("", "PodTemplate", Namespaced),
        ("", "ReplicationController", Namespaced),
        ("", "ResourceQuota", Namespaced),
        ("", "Secret", Namespaced),
        ("", "Service", Namespaced),
        ("", "ServiceAccount", Namespaced),
        ("", "ComponentStatus", Cluster),
        ("", "Namespace", Cluster),
        ("", "Node", Cluster),
        ("", "PersistentVolume", Cluster),
        ("apps", "ControllerRevision", Namespaced),
        ("apps", "DaemonSet", Namespaced),
        ("apps", "Deployment", Namespaced),
        ("apps", "ReplicaSet", Namespaced),
        ("apps", "StatefulSet", Namespaced),
        ("autoscaling", "HorizontalPodAutoscaler", Namespaced),
        ("batch", "CronJob", Namespaced),
        ("batch", "Job", Namespaced),
        ("coordination.k8s.io", "Lease", Namespaced),
        ("discovery.k8s.io", "EndpointSlice", Namespaced),
        ("events.k8s.io", "Event", Namespaced),
        ("networking.k8s.io", "Ingress", Namespaced),
        ("networking.k8s.io", "NetworkPolicy", Namespaced),
        ("networking.k8s.io", "IngressClass", Cluster),
        ("policy", "PodDisruptionBudget", Namespaced),
        ("rbac.authorization.k8s.io", "Role", Namespaced),
        ("rbac.authorization.k8s.io", "RoleBinding", Namespaced),
        ("rbac.authorization.k8s.io", "ClusterRole", Cluster),
        ("rbac.authorization.k8s.io", "ClusterRoleBinding", Cluster),
        ("storage.k8s.io", "CSIStorageCapacity", Namespaced),
        ("storage.k8s.io", "CSIDriver", Cluster),
        ("storage.k8s.io", "CSINode", Cluster),
        ("storage.k8s.io", "StorageClass", Cluster),
        ("storage.k8s.io", "VolumeAttachment", Cluster),
        ("apiextensions.k8s.io", "CustomResourceDefinition", Cluster),
        ("apiregistration.k8s.io", "APIService", Cluster),
        ("admissionregistration.k8s.io", "MutatingWebhookConfiguration", Cluster),
        ("admissionregistration.k8s.io", "ValidatingWebhookConfiguration", Cluster),
        ("certificates.k8s.io", "CertificateSigningRequest", Cluster),
        ("flowcontrol.apiserver.k8s.io", "FlowSchema", Cluster),
        ("flowcontrol.apiserver.k8s.io", "PriorityLevelConfiguration", Cluster),
        ("node.k8s.io", "RuntimeClass", Cluster),
        ("scheduling.k8s.io", "PriorityClass", Cluster),
    ]
    .into_iter()
    .map(|(group, kind, scope)| (group_kind(group, kind), scope))
    .collect()
});

/// Returns the scope of a built-in kind, or None for kinds this table does
/// not know about.
pub fn builtin_scope(group: &str, kind: &str) -> Option<Scope> {
    BUILTIN_SCOPES.get(&group_kind(group, kind)).copied()
}

fn group_kind(group: &str, kind: &str) -> String {
    format!("{kind}.{group}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scope() {
        assert_eq!(builtin_scope("", "ConfigMap"), Some(Scope::Namespaced));
        assert_eq!(builtin_scope("rbac.authorization.k8s.io", "ClusterRoleBinding"), Some(Scope::Cluster));
        assert_eq!(builtin_scope("test.kpt.dev", "Custom"), None);
        assert_eq!(builtin_scope("", "Deployment"), None);
    }
}
