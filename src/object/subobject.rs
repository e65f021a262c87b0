//! SubObject: path based access to a map inside a resource.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::identity::UPSTREAM_IDENTIFIER;
use crate::typed;
use crate::variant::{FieldPath, MapVariant, PathElement, VariantError};
use crate::yaml::{Node, NodeRef, Style};

use super::error::{short_type_name, KubeObjectFieldsError, SubObjectFieldsError};

/// SubObject is a view over a map inside a resource, such as `.spec` or
/// `.spec.template`.
///
/// Field arguments are path segments; a segment of the form `key=value`
/// selects the element of a sequence whose `key` equals `value`.
///
/// Fallible accessors return [`Error::SubObjectFields`] (or
/// [`Error::KubeObjectFields`] when called on a whole object). The
/// `*_or_die` variants panic with the same structured error instead; the
/// pipeline driver recovers those panics and reports them as results.
#[derive(Debug, Clone)]
pub struct SubObject {
    obj: MapVariant,
    root: MapVariant,
    base: FieldPath,
    top_level: bool,
}

/// Panics with the structured field error so the pipeline driver can
/// recover it.
pub(crate) fn die(err: Error) -> ! {
    match err {
        Error::KubeObjectFields(e) => std::panic::panic_any(e),
        Error::SubObjectFields(e) => std::panic::panic_any(e),
        other => std::panic::panic_any(other.to_string()),
    }
}

fn upstream_identifier_path() -> FieldPath {
    FieldPath::fields(&["metadata", "annotations", UPSTREAM_IDENTIFIER])
}

fn scalar_at(node: &Node, rest: &[PathElement]) -> Option<String> {
    match rest.split_first() {
        None => (node.is_scalar() && !node.is_null()).then(|| node.value.clone()),
        Some((PathElement::FieldName(name), tail)) => {
            let child = node.field(name)?;
            let child = child.borrow();
            scalar_at(&child, tail)
        }
        Some(_) => None,
    }
}

fn string_field(map: &MapVariant, fields: &[&str]) -> String {
    map.get_nested_string(&FieldPath::fields(fields))
        .ok()
        .flatten()
        .unwrap_or_default()
}

impl SubObject {
    /// Creates the view of a whole object.
    pub(crate) fn object(obj: MapVariant) -> Self {
        SubObject {
            root: obj.clone(),
            obj,
            base: FieldPath::new(),
            top_level: true,
        }
    }

    /// Wraps a standalone map.
    pub fn from_map(obj: MapVariant) -> Self {
        SubObject {
            root: obj.clone(),
            obj,
            base: FieldPath::new(),
            top_level: false,
        }
    }

    fn child(&self, obj: MapVariant, path: &FieldPath) -> SubObject {
        SubObject {
            obj,
            root: self.root.clone(),
            base: self.base.join(path),
            top_level: false,
        }
    }

    /// Returns the underlying map.
    pub fn map_variant(&self) -> &MapVariant {
        &self.obj
    }

    /// Returns the underlying node.
    pub fn node(&self) -> &NodeRef {
        self.obj.node()
    }

    /// Returns true if the map has no fields.
    pub fn is_empty(&self) -> bool {
        self.obj.is_empty()
    }

    pub(crate) fn field_error(&self, path: &FieldPath, expected: &str, cause: VariantError) -> Error {
        if self.top_level {
            Error::KubeObjectFields(KubeObjectFieldsError {
                api_version: string_field(&self.obj, &["apiVersion"]),
                kind: string_field(&self.obj, &["kind"]),
                name: string_field(&self.obj, &["metadata", "name"]),
                path: path.to_string(),
                expected: expected.to_string(),
                cause,
            })
        } else {
            Error::SubObjectFields(SubObjectFieldsError {
                path: self.base.join(path).to_string(),
                expected: expected.to_string(),
                cause,
            })
        }
    }

    fn parse_path(&self, fields: &[&str], expected: &str) -> Result<FieldPath> {
        FieldPath::parse(fields).map_err(|e| self.field_error(&FieldPath::fields(fields), expected, e))
    }

    fn access<R>(
        &self,
        fields: &[&str],
        expected: &str,
        op: impl FnOnce(&MapVariant, &FieldPath) -> std::result::Result<R, VariantError>,
    ) -> Result<R> {
        let path = self.parse_path(fields, expected)?;
        op(&self.obj, &path).map_err(|e| self.field_error(&path, expected, e))
    }

    /// Rejects writes that would change the upstream identifier annotation.
    /// `new_value` is the value written at `path`, None for a removal.
    fn guard(&self, path: &FieldPath, new_value: Option<&Node>) -> std::result::Result<(), VariantError> {
        let full = self.base.join(path);
        let protected = upstream_identifier_path();
        let reserved = || VariantError::ReservedAnnotation {
            key: UPSTREAM_IDENTIFIER.to_string(),
        };
        if protected.is_prefix_of(&full) {
            return Err(reserved());
        }
        if !full.is_prefix_of(&protected) {
            return Ok(());
        }
        let current = self.root.get_nested_string(&protected).ok().flatten();
        let rest = &protected.as_slice()[full.len()..];
        let next = new_value.and_then(|node| scalar_at(node, rest));
        if current != next {
            return Err(reserved());
        }
        Ok(())
    }

    /// Returns the raw node at `fields`. Comments and structure can be
    /// edited directly through the returned handle.
    pub fn get_node(&self, fields: &[&str]) -> Result<Option<NodeRef>> {
        self.access(fields, "node", |m, p| m.get_nested_node(p))
    }

    /// Decodes the value at `fields` into `T`. Returns None if the field is
    /// absent or null.
    pub fn get<T: DeserializeOwned>(&self, fields: &[&str]) -> Result<Option<T>> {
        let expected = short_type_name::<T>();
        self.access(fields, &expected, |m, p| {
            let Some(node) = m.get_nested_node(p)? else {
                return Ok(None);
            };
            let node = node.borrow();
            if node.is_null() {
                return Ok(None);
            }
            typed::decode_at(&node, p).map(Some)
        })
    }

    pub fn get_or_die<T: DeserializeOwned>(&self, fields: &[&str]) -> Option<T> {
        self.get(fields).unwrap_or_else(|e| die(e))
    }

    /// Encodes `value` and writes it at `fields`, creating intermediate maps.
    /// Writing `None` (or any value that encodes to null) removes the field.
    pub fn set<T: Serialize + ?Sized>(&self, value: &T, fields: &[&str]) -> Result<()> {
        let expected = short_type_name::<T>();
        self.access(fields, &expected, |m, p| {
            let node = typed::encode(value)?;
            self.guard(p, Some(&node))?;
            m.set_nested_node(node, p)
        })
    }

    pub fn set_or_die<T: Serialize + ?Sized>(&self, value: &T, fields: &[&str]) {
        if let Err(e) = self.set(value, fields) {
            die(e)
        }
    }

    /// Writes a copy of another map at `fields`.
    pub fn set_map(&self, value: &SubObject, fields: &[&str]) -> Result<()> {
        self.access(fields, "map", |m, p| {
            let node = value.node().borrow().deep_copy();
            self.guard(p, Some(&node))?;
            m.set_nested_node(node, p)
        })
    }

    /// Writes copies of `values` as a sequence at `fields`.
    pub fn set_slice(&self, values: &[SubObject], fields: &[&str]) -> Result<()> {
        self.access(fields, "sequence", |m, p| {
            let mut node = Node::sequence();
            node.content = values
                .iter()
                .map(|v| v.node().borrow().deep_copy().into_ref())
                .collect();
            self.guard(p, Some(&node))?;
            m.set_nested_node(node, p)
        })
    }

    /// Removes the field at `fields`. Returns true if it was present.
    pub fn remove(&self, fields: &[&str]) -> Result<bool> {
        self.access(fields, "field", |m, p| {
            self.guard(p, None)?;
            m.remove_nested_field(p)
        })
    }

    pub fn remove_or_die(&self, fields: &[&str]) -> bool {
        self.remove(fields).unwrap_or_else(|e| die(e))
    }

    pub fn nested_string(&self, fields: &[&str]) -> Result<Option<String>> {
        self.access(fields, "string", |m, p| m.get_nested_string(p))
    }

    pub fn nested_int(&self, fields: &[&str]) -> Result<Option<i64>> {
        self.access(fields, "int", |m, p| m.get_nested_int(p))
    }

    pub fn nested_float(&self, fields: &[&str]) -> Result<Option<f64>> {
        self.access(fields, "float", |m, p| m.get_nested_float(p))
    }

    pub fn nested_bool(&self, fields: &[&str]) -> Result<Option<bool>> {
        self.access(fields, "bool", |m, p| m.get_nested_bool(p))
    }

    pub fn nested_map(&self, fields: &[&str]) -> Result<Option<SubObject>> {
        let path = self.parse_path(fields, "map")?;
        let map = self
            .obj
            .get_nested_map(&path)
            .map_err(|e| self.field_error(&path, "map", e))?;
        Ok(map.map(|m| self.child(m, &path)))
    }

    pub fn nested_slice(&self, fields: &[&str]) -> Result<Option<Vec<SubObject>>> {
        let path = self.parse_path(fields, "sequence")?;
        let objects = self
            .obj
            .get_nested_slice(&path)
            .and_then(|s| s.map(|s| s.objects()).transpose())
            .map_err(|e| self.field_error(&path, "sequence", e))?;
        Ok(objects.map(|objects| {
            objects
                .into_iter()
                .enumerate()
                .map(|(i, m)| self.child(m, &path.with(PathElement::Index(i))))
                .collect()
        }))
    }

    pub fn nested_string_map(&self, fields: &[&str]) -> Result<Option<BTreeMap<String, String>>> {
        self.access(fields, "map[string]string", |m, p| m.get_nested_string_map(p))
    }

    pub fn nested_string_slice(&self, fields: &[&str]) -> Result<Option<Vec<String>>> {
        self.access(fields, "[]string", |m, p| m.get_nested_string_slice(p))
    }

    pub fn set_nested_string_map(&self, value: &BTreeMap<String, String>, fields: &[&str]) -> Result<()> {
        self.set(value, fields)
    }

    pub fn set_nested_string_slice(&self, value: &[String], fields: &[&str]) -> Result<()> {
        self.set(value, fields)
    }

    /// Returns the map at `key`, creating it if absent.
    pub fn upsert_map(&self, key: &str) -> Result<SubObject> {
        let path = FieldPath::fields(&[key]);
        let map = self
            .obj
            .upsert_map(key)
            .map_err(|e| self.field_error(&path, "map", e))?;
        Ok(self.child(map, &path))
    }

    pub fn upsert_map_or_die(&self, key: &str) -> SubObject {
        self.upsert_map(key).unwrap_or_else(|e| die(e))
    }

    /// Returns the map at `key`, or None if absent.
    pub fn get_map(&self, key: &str) -> Result<Option<SubObject>> {
        self.nested_map(&[key])
    }

    pub fn get_map_or_die(&self, key: &str) -> Option<SubObject> {
        self.get_map(key).unwrap_or_else(|e| die(e))
    }

    /// Returns the maps of the sequence at `key`; empty if absent.
    pub fn get_slice(&self, key: &str) -> Result<Vec<SubObject>> {
        Ok(self.nested_slice(&[key])?.unwrap_or_default())
    }

    pub fn get_slice_or_die(&self, key: &str) -> Vec<SubObject> {
        self.get_slice(key).unwrap_or_else(|e| die(e))
    }

    /// Returns the string at `key`; empty if absent.
    pub fn get_string(&self, key: &str) -> Result<String> {
        Ok(self.nested_string(&[key])?.unwrap_or_default())
    }

    pub fn get_string_or_die(&self, key: &str) -> String {
        self.get_string(key).unwrap_or_else(|e| die(e))
    }

    /// Returns the integer at `key`; zero if absent.
    pub fn get_int(&self, key: &str) -> Result<i64> {
        Ok(self.nested_int(&[key])?.unwrap_or_default())
    }

    pub fn get_int_or_die(&self, key: &str) -> i64 {
        self.get_int(key).unwrap_or_else(|e| die(e))
    }

    /// Returns the bool at `key`; false if absent.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        Ok(self.nested_bool(&[key])?.unwrap_or_default())
    }

    pub fn get_bool_or_die(&self, key: &str) -> bool {
        self.get_bool(key).unwrap_or_else(|e| die(e))
    }

    fn comment_nodes(&self, path: &FieldPath) -> std::result::Result<Option<(Option<NodeRef>, NodeRef)>, VariantError> {
        let Some(value) = self.obj.get_nested_node(path)? else {
            return Ok(None);
        };
        let key = match path.last() {
            Some(PathElement::FieldName(name)) => match self.obj.get_nested_node(&path.prefix(path.len() - 1))? {
                Some(parent) => {
                    let entry = parent.borrow().entry(name);
                    entry.map(|(k, _)| k)
                }
                None => None,
            },
            _ => None,
        };
        Ok(Some((key, value)))
    }

    /// Returns the line comment of the field, if the field exists.
    pub fn line_comment(&self, fields: &[&str]) -> Result<Option<String>> {
        self.access(fields, "comment", |_, p| {
            let Some((key, value)) = self.comment_nodes(p)? else {
                return Ok(None);
            };
            let comment = value.borrow().line_comment.clone();
            if !comment.is_empty() {
                return Ok(Some(comment));
            }
            let Some(key) = key else {
                return Ok(Some(String::new()));
            };
            let comment = key.borrow().line_comment.clone();
            Ok(Some(comment))
        })
    }

    /// Returns the head comment of the field, if the field exists.
    pub fn head_comment(&self, fields: &[&str]) -> Result<Option<String>> {
        self.access(fields, "comment", |_, p| {
            let Some((key, value)) = self.comment_nodes(p)? else {
                return Ok(None);
            };
            let target = key.unwrap_or(value);
            let comment = target.borrow().head_comment.clone();
            Ok(Some(comment))
        })
    }

    /// Sets the line comment of an existing field.
    pub fn set_line_comment(&self, comment: &str, fields: &[&str]) -> Result<()> {
        self.access(fields, "comment", |_, p| {
            let Some((key, value)) = self.comment_nodes(p)? else {
                return Err(VariantError::not_found(p.to_string()));
            };
            let on_key = {
                let v = value.borrow();
                !v.is_scalar() && v.style != Style::Flow && !v.content.is_empty()
            };
            match key {
                Some(key) if on_key => key.borrow_mut().line_comment = comment.to_string(),
                _ => value.borrow_mut().line_comment = comment.to_string(),
            }
            Ok(())
        })
    }

    /// Sets the head comment of an existing field.
    pub fn set_head_comment(&self, comment: &str, fields: &[&str]) -> Result<()> {
        self.access(fields, "comment", |_, p| {
            let Some((key, value)) = self.comment_nodes(p)? else {
                return Err(VariantError::not_found(p.to_string()));
            };
            let target = key.unwrap_or(value);
            target.borrow_mut().head_comment = comment.to_string();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::KubeObject;
    use pretty_assertions::assert_eq;

    const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: nginx
spec:
  replicas: 3 # keep me
  template:
    spec:
      containers:
      - name: nginx
        image: nginx:1.14.2
      - name: sidecar
        image: busybox
"#;

    #[test]
    fn test_get_map_and_slice() {
        let obj = KubeObject::parse(DEPLOYMENT).unwrap();
        let spec = obj.get_map("spec").unwrap().unwrap();
        assert_eq!(spec.get_int("replicas").unwrap(), 3);
        let template_spec = spec.get_map("template").unwrap().unwrap().get_map("spec").unwrap().unwrap();
        let containers = template_spec.get_slice("containers").unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[1].get_string("image").unwrap(), "busybox");
        assert!(spec.get_slice("missing").unwrap().is_empty());
    }

    #[test]
    fn test_subobject_errors_carry_full_path() {
        let obj = KubeObject::parse(DEPLOYMENT).unwrap();
        let spec = obj.get_map("spec").unwrap().unwrap();
        let err = spec.get_string("replicas").unwrap_err();
        match err {
            Error::SubObjectFields(e) => {
                assert_eq!(e.path, ".spec.replicas");
                assert_eq!(e.expected, "string");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_edits_through_subobject_are_visible() {
        let obj = KubeObject::parse(DEPLOYMENT).unwrap();
        let spec = obj.get_map("spec").unwrap().unwrap();
        spec.set(&5, &["replicas"]).unwrap();
        assert_eq!(obj.nested_int(&["spec", "replicas"]).unwrap(), Some(5));
        assert_eq!(obj.line_comment(&["spec", "replicas"]).unwrap().as_deref(), Some("# keep me"));
    }

    #[test]
    fn test_upsert_map() {
        let obj = KubeObject::parse("apiVersion: v1\nkind: ConfigMap\n").unwrap();
        let data = obj.upsert_map("data").unwrap();
        data.set("bar", &["foo"]).unwrap();
        assert_eq!(obj.nested_string(&["data", "foo"]).unwrap().as_deref(), Some("bar"));
        assert!(obj.upsert_map("kind").is_err());
    }

    #[test]
    fn test_set_map_and_slice_copy() {
        let obj = KubeObject::parse(DEPLOYMENT).unwrap();
        let containers = obj.nested_slice(&["spec", "template", "spec", "containers"]).unwrap().unwrap();
        obj.set_slice(&containers[..1], &["spec", "template", "spec", "containers"]).unwrap();
        assert_eq!(
            obj.nested_slice(&["spec", "template", "spec", "containers"]).unwrap().map(|c| c.len()),
            Some(1)
        );
    }

    #[test]
    fn test_typed_get_does_not_widen_ints() {
        let obj = KubeObject::parse("spec:\n  ratio: 3\n  scale: 1.5\n").unwrap();
        assert!(obj.get::<f64>(&["spec", "ratio"]).is_err());
        assert!(obj.nested_float(&["spec", "ratio"]).is_err());
        assert_eq!(obj.get::<i64>(&["spec", "ratio"]).unwrap(), Some(3));
        assert_eq!(obj.get::<f64>(&["spec", "scale"]).unwrap(), Some(1.5));
    }

    #[test]
    fn test_comments() {
        let obj = KubeObject::parse(DEPLOYMENT).unwrap();
        assert_eq!(obj.head_comment(&["spec", "replicas"]).unwrap().as_deref(), Some(""));
        obj.set_line_comment("# scaled", &["spec", "replicas"]).unwrap();
        obj.set_head_comment("# how many", &["spec", "replicas"]).unwrap();
        obj.set_line_comment("# pod template", &["spec", "template"]).unwrap();
        obj.set_head_comment("# the sidecar", &["spec", "template", "spec", "containers", "name=sidecar"])
            .unwrap();

        let again = KubeObject::parse(&obj.to_yaml_string()).unwrap();
        assert_eq!(again.line_comment(&["spec", "replicas"]).unwrap().as_deref(), Some("# scaled"));
        assert_eq!(again.head_comment(&["spec", "replicas"]).unwrap().as_deref(), Some("# how many"));
        assert_eq!(again.line_comment(&["spec", "template"]).unwrap().as_deref(), Some("# pod template"));
        assert_eq!(
            again
                .head_comment(&["spec", "template", "spec", "containers", "name=sidecar"])
                .unwrap()
                .as_deref(),
            Some("# the sidecar")
        );
        assert_eq!(again.nested_int(&["spec", "replicas"]).unwrap(), Some(3));

        assert_eq!(obj.line_comment(&["data", "zzz"]).unwrap(), None);
        let err = obj.set_line_comment("# x", &["data", "zzz"]).unwrap_err();
        assert!(matches!(err, Error::KubeObjectFields(_)));
        assert!(err.to_string().contains(".data.zzz: field doesn't exist"));
        assert!(obj.set_head_comment("# x", &["data", "zzz"]).is_err());
    }

    #[test]
    fn test_slice_elements_report_their_position() {
        let obj = KubeObject::parse(DEPLOYMENT).unwrap();
        let containers = obj.nested_slice(&["spec", "template", "spec", "containers"]).unwrap().unwrap();
        match containers[1].get_int("image").unwrap_err() {
            Error::SubObjectFields(e) => assert_eq!(e.path, ".spec.template.spec.containers[1].image"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_or_die_panics_with_structured_error() {
        let obj = KubeObject::parse(DEPLOYMENT).unwrap();
        let spec = obj.get_map("spec").unwrap().unwrap();
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| spec.get_string_or_die("replicas")))
            .unwrap_err();
        assert!(payload.downcast_ref::<SubObjectFieldsError>().is_some());
    }
}
