//! KubeObject: a resource with Kubernetes object semantics.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::identity::{LOCAL_CONFIG_ANNOTATION, UPSTREAM_IDENTIFIER};
use crate::resourcelist::provenance::{self, ID_ANNOTATION, INDEX_ANNOTATION, PATH_ANNOTATION};
use crate::typed;
use crate::variant::{Document, FieldPath, MapVariant};
use crate::yaml::{self, SequenceIndent};

use super::error::short_type_name;
use super::subobject::{die, SubObject};

const META_GROUP: &str = "kpt.dev";
const META_KIND: &str = "Kptfile";

/// KubeObject is a top-level resource such as a Deployment or ConfigMap.
///
/// It dereferences to [`SubObject`] for generic path access. The identity
/// accessors (`api_version`, `kind`, `name`, ...) are total: they return an
/// empty value on an empty or malformed object instead of failing.
///
/// Cloning a KubeObject clones the handle, not the document.
#[derive(Debug, Clone)]
pub struct KubeObject {
    sub: SubObject,
    pub(crate) provenance: Option<provenance::Snapshot>,
}

impl Deref for KubeObject {
    type Target = SubObject;

    fn deref(&self) -> &SubObject {
        &self.sub
    }
}

/// Splits an apiVersion into group and version. The core group is empty.
pub fn parse_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

impl Default for KubeObject {
    fn default() -> Self {
        KubeObject::new_empty()
    }
}

impl KubeObject {
    /// Creates an object with no fields. It reads as empty everywhere and
    /// can be filled in place.
    pub fn new_empty() -> Self {
        KubeObject::from_map(MapVariant::new())
    }

    pub(crate) fn from_map(map: MapVariant) -> Self {
        KubeObject {
            sub: SubObject::object(map),
            provenance: None,
        }
    }

    /// Parses a single object from YAML.
    pub fn parse(input: &str) -> Result<Self> {
        let doc = Document::parse(input)?;
        let mut objects = doc.objects().map_err(Error::parse)?;
        if objects.len() != 1 {
            return Err(Error::parse(format!("expected exactly one object, got {}", objects.len())));
        }
        let map = objects.remove(0);
        Ok(KubeObject::from_map(map))
    }

    /// Builds an object from a typed value, e.g. a struct mirroring a
    /// Kubernetes type.
    pub fn from_typed<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        match typed::typed_object_to_map_variant(value) {
            Ok(map) => Ok(KubeObject::from_map(map)),
            Err(e) => Err(KubeObject::new_empty().field_error(&FieldPath::new(), &short_type_name::<T>(), e)),
        }
    }

    /// Decodes the whole object into `T`.
    pub fn as_typed<T: DeserializeOwned>(&self) -> Result<T> {
        typed::map_variant_to_typed_object(self.map_variant())
            .map_err(|e| self.field_error(&FieldPath::new(), &short_type_name::<T>(), e))
    }

    pub fn as_typed_or_die<T: DeserializeOwned>(&self) -> T {
        self.as_typed().unwrap_or_else(|e| die(e))
    }

    /// Serializes the object as a YAML document.
    pub fn to_yaml_string(&self) -> String {
        let node = self.node().borrow();
        yaml::emit_node(&node, SequenceIndent::default())
    }

    /// Returns a deep copy that shares nothing with this object.
    pub fn copy(&self) -> KubeObject {
        let node = self.node().borrow().deep_copy();
        KubeObject::from_map(MapVariant::from_node(node.into_ref()).unwrap_or_default())
    }

    fn string_at(&self, fields: &[&str]) -> String {
        self.nested_string(fields).ok().flatten().unwrap_or_default()
    }

    fn string_map_at(&self, fields: &[&str]) -> BTreeMap<String, String> {
        self.nested_string_map(fields).ok().flatten().unwrap_or_default()
    }

    pub fn api_version(&self) -> String {
        self.string_at(&["apiVersion"])
    }

    pub fn set_api_version(&self, api_version: &str) -> Result<()> {
        self.set(api_version, &["apiVersion"])
    }

    pub fn kind(&self) -> String {
        self.string_at(&["kind"])
    }

    pub fn set_kind(&self, kind: &str) -> Result<()> {
        self.set(kind, &["kind"])
    }

    pub fn name(&self) -> String {
        self.string_at(&["metadata", "name"])
    }

    pub fn set_name(&self, name: &str) -> Result<()> {
        self.set(name, &["metadata", "name"])
    }

    pub fn namespace(&self) -> String {
        self.string_at(&["metadata", "namespace"])
    }

    /// Returns true if `metadata.namespace` is present, even if empty.
    pub fn has_namespace(&self) -> bool {
        matches!(self.get_node(&["metadata", "namespace"]), Ok(Some(_)))
    }

    pub fn set_namespace(&self, namespace: &str) -> Result<()> {
        self.set(namespace, &["metadata", "namespace"])
    }

    pub fn label(&self, key: &str) -> String {
        self.string_at(&["metadata", "labels", key])
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map_at(&["metadata", "labels"])
    }

    pub fn set_label(&self, key: &str, value: &str) -> Result<()> {
        self.map_variant()
            .set_nested_string(value, &FieldPath::fields(&["metadata", "labels", key]))
            .map_err(|e| self.field_error(&FieldPath::fields(&["metadata", "labels", key]), "string", e))
    }

    /// Replaces all labels.
    pub fn set_labels(&self, labels: &BTreeMap<String, String>) -> Result<()> {
        self.set(labels, &["metadata", "labels"])
    }

    pub fn remove_label(&self, key: &str) -> Result<bool> {
        let path = FieldPath::fields(&["metadata", "labels", key]);
        self.map_variant()
            .remove_nested_field(&path)
            .map_err(|e| self.field_error(&path, "string", e))
    }

    pub fn annotation(&self, key: &str) -> String {
        self.string_at(&["metadata", "annotations", key])
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map_at(&["metadata", "annotations"])
    }

    /// Sets one annotation. The upstream identifier annotation is rejected.
    pub fn set_annotation(&self, key: &str, value: &str) -> Result<()> {
        if key == UPSTREAM_IDENTIFIER {
            return Err(Error::AttemptToTouchUpstreamIdentifier);
        }
        let path = FieldPath::fields(&["metadata", "annotations", key]);
        self.map_variant()
            .set_nested_string(value, &path)
            .map_err(|e| self.field_error(&path, "string", e))
    }

    /// Replaces all annotations. The upstream identifier annotation, if
    /// present, is kept and must not appear in `annotations`.
    pub fn set_annotations(&self, annotations: &BTreeMap<String, String>) -> Result<()> {
        if annotations.contains_key(UPSTREAM_IDENTIFIER) {
            return Err(Error::AttemptToTouchUpstreamIdentifier);
        }
        let mut annotations = annotations.clone();
        let upstream = self.annotation(UPSTREAM_IDENTIFIER);
        if !upstream.is_empty() {
            annotations.insert(UPSTREAM_IDENTIFIER.to_string(), upstream);
        }
        self.set(&annotations, &["metadata", "annotations"])
    }

    pub fn remove_annotation(&self, key: &str) -> Result<bool> {
        self.remove(&["metadata", "annotations", key])
    }

    /// Removes `metadata.annotations` when it holds no entries.
    pub fn remove_annotations_if_empty(&self) -> Result<()> {
        if let Some(annotations) = self.nested_string_map(&["metadata", "annotations"])? {
            if annotations.is_empty() {
                self.remove(&["metadata", "annotations"])?;
            }
        }
        Ok(())
    }

    pub fn path_annotation(&self) -> String {
        self.annotation(PATH_ANNOTATION)
    }

    /// Returns the index annotation, or -1 if absent.
    pub fn index_annotation(&self) -> i64 {
        parse_index(&self.annotation(INDEX_ANNOTATION))
    }

    /// Returns the id annotation, or -1 if absent.
    pub fn id_annotation(&self) -> i64 {
        parse_index(&self.annotation(ID_ANNOTATION))
    }

    /// Returns true if the object is marked as local configuration, which
    /// excludes it from being applied to a cluster.
    pub fn is_local_config(&self) -> bool {
        !matches!(self.annotation(LOCAL_CONFIG_ANNOTATION).as_str(), "" | "false")
    }

    /// Returns true for package metadata resources such as the Kptfile.
    pub fn is_meta_resource(&self) -> bool {
        self.is_group_kind(META_GROUP, META_KIND)
    }

    /// Matches group, version and kind. A blank argument matches anything.
    pub fn is_gvk(&self, group: &str, version: &str, kind: &str) -> bool {
        let api_version = self.api_version();
        let (g, v) = parse_api_version(&api_version);
        (group.is_empty() || g == group) && (version.is_empty() || v == version) && (kind.is_empty() || self.kind() == kind)
    }

    /// Matches the full apiVersion string and kind. A blank argument matches
    /// anything.
    pub fn is_api_version_kind(&self, api_version: &str, kind: &str) -> bool {
        (api_version.is_empty() || self.api_version() == api_version) && (kind.is_empty() || self.kind() == kind)
    }

    pub fn is_group_kind(&self, group: &str, kind: &str) -> bool {
        self.is_gvk(group, "", kind)
    }
}

fn parse_index(value: &str) -> i64 {
    if value.is_empty() {
        return -1;
    }
    value.parse().unwrap_or(0)
}

impl fmt::Display for KubeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_yaml_string())
    }
}
