//! Map variant and the nested Get/Set/Remove engine.
//!
//! Every operation works in place on the shared node tree: a MapVariant is
//! a view, and two variants over the same node observe each other's writes.

use std::collections::BTreeMap;

use serde_yaml::Value;

use crate::yaml::{self, Kind, Node, NodeRef, Style, Tag};

use super::{FieldPath, PathElement, SliceVariant, VariantError};

/// MapVariant is a view over a mapping node.
#[derive(Debug, Clone)]
pub struct MapVariant {
    node: NodeRef,
}

impl Default for MapVariant {
    fn default() -> Self {
        MapVariant::new()
    }
}

fn kind_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Mapping => "map",
        Kind::Sequence => "sequence",
        Kind::Scalar => "scalar",
    }
}

/// Makes `node` a collection of `kind`, converting a null in place.
fn prepare(node: &mut Node, kind: Kind, path: &FieldPath, depth: usize) -> Result<(), VariantError> {
    if node.kind == kind {
        if node.style == Style::Flow && node.content.is_empty() {
            node.style = Style::Plain;
        }
        return Ok(());
    }
    if node.is_null() {
        node.kind = kind;
        node.style = Style::Plain;
        node.tag = None;
        node.value.clear();
        node.content.clear();
        return Ok(());
    }
    Err(VariantError::type_mismatch(
        path.prefix(depth).to_string(),
        kind_name(kind),
        node.type_name(),
    ))
}

pub(crate) fn find_selected(seq: &Node, key: &str, value: &str) -> Option<NodeRef> {
    seq.content
        .iter()
        .find(|item| {
            item.borrow()
                .field(key)
                .is_some_and(|v| {
                    let v = v.borrow();
                    v.is_scalar() && v.value == value
                })
        })
        .cloned()
}

fn step(current: &NodeRef, element: &PathElement, path: &FieldPath, depth: usize) -> Result<Option<NodeRef>, VariantError> {
    let node = current.borrow();
    if node.is_null() {
        return Ok(None);
    }
    match element {
        PathElement::FieldName(name) => {
            if !node.is_mapping() {
                return Err(VariantError::type_mismatch(path.prefix(depth).to_string(), "map", node.type_name()));
            }
            Ok(node.field(name))
        }
        PathElement::Selector { key, value } => {
            if !node.is_sequence() {
                return Err(VariantError::type_mismatch(
                    path.prefix(depth).to_string(),
                    "sequence",
                    node.type_name(),
                ));
            }
            Ok(find_selected(&node, key, value))
        }
        PathElement::Index(i) => {
            if !node.is_sequence() {
                return Err(VariantError::type_mismatch(
                    path.prefix(depth).to_string(),
                    "sequence",
                    node.type_name(),
                ));
            }
            Ok(node.content.get(*i).cloned())
        }
    }
}

fn child_or_insert(current: &NodeRef, element: &PathElement, path: &FieldPath, depth: usize) -> Result<NodeRef, VariantError> {
    let mut node = current.borrow_mut();
    match element {
        PathElement::FieldName(name) => {
            prepare(&mut node, Kind::Mapping, path, depth)?;
            if let Some(child) = node.field(name) {
                return Ok(child);
            }
            let child = Node::plain("").into_ref();
            node.push_entry(name, child.clone());
            Ok(child)
        }
        PathElement::Selector { key, value } => {
            prepare(&mut node, Kind::Sequence, path, depth)?;
            if let Some(child) = find_selected(&node, key, value) {
                return Ok(child);
            }
            let mut element = Node::mapping();
            element.push_entry(key, Node::string(value.as_str()).into_ref());
            let child = element.into_ref();
            node.content.push(child.clone());
            Ok(child)
        }
        PathElement::Index(i) => {
            prepare(&mut node, Kind::Sequence, path, depth)?;
            node.content
                .get(*i)
                .cloned()
                .ok_or_else(|| VariantError::not_found(path.prefix(depth + 1).to_string()))
        }
    }
}

/// Writes `value` into `target` in place. Comments already on `target`, and
/// on the keys of a mapping that survive the write, are kept.
pub(crate) fn assign(target: &NodeRef, value: Node) {
    let mut t = target.borrow_mut();
    if !(t.is_mapping() && value.is_mapping() && !value.content.is_empty()) {
        t.replace_keeping_comments(value);
        return;
    }
    let entries = value.entries();
    let mut content = Vec::with_capacity(entries.len() * 2);
    for (k, v) in entries {
        let key = k.borrow().value.clone();
        match t.entry(&key) {
            Some((old_key, old_value)) => {
                let new_value = v.borrow().clone();
                assign(&old_value, new_value);
                content.push(old_key);
                content.push(old_value);
            }
            None => {
                content.push(k);
                content.push(v);
            }
        }
    }
    t.content = content;
    t.style = value.style;
    t.tag = value.tag;
    if !value.head_comment.is_empty() {
        t.head_comment = value.head_comment;
    }
    if !value.line_comment.is_empty() {
        t.line_comment = value.line_comment;
    }
    if !value.foot_comment.is_empty() {
        t.foot_comment = value.foot_comment;
    }
}

impl MapVariant {
    /// Creates a new empty map.
    pub fn new() -> Self {
        MapVariant {
            node: Node::mapping().into_ref(),
        }
    }

    /// Wraps a mapping node. A null node is turned into an empty mapping in
    /// place.
    pub fn from_node(node: NodeRef) -> Result<Self, VariantError> {
        prepare(&mut node.borrow_mut(), Kind::Mapping, &FieldPath::new(), 0)?;
        Ok(MapVariant { node })
    }

    /// Returns the underlying node.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Returns true if both variants view the same node.
    pub fn same_node(&self, other: &MapVariant) -> bool {
        std::rc::Rc::ptr_eq(&self.node, &other.node)
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.node.borrow().content.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.node.borrow().content.len() / 2
    }

    /// Returns the keys in document order.
    pub fn keys(&self) -> Vec<String> {
        self.node.borrow().keys()
    }

    /// Returns the value node of a direct field.
    pub fn field(&self, key: &str) -> Option<NodeRef> {
        self.node.borrow().field(key)
    }

    /// Returns the key and value nodes of a direct field.
    pub fn entry(&self, key: &str) -> Option<(NodeRef, NodeRef)> {
        self.node.borrow().entry(key)
    }

    /// Sets a direct field. A null value removes the field.
    pub fn set_field(&self, key: &str, value: Node) {
        if value.is_null() {
            self.remove_field(key);
            return;
        }
        let existing = self.field(key);
        match existing {
            Some(existing) => assign(&existing, value),
            None => self.node.borrow_mut().push_entry(key, value.into_ref()),
        }
    }

    /// Removes a direct field. Returns true if it was present.
    pub fn remove_field(&self, key: &str) -> bool {
        self.node.borrow_mut().remove_entry(key).is_some()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.node.borrow_mut().content.clear();
    }

    /// Returns the map at `key`, creating it if it is absent or null.
    pub fn upsert_map(&self, key: &str) -> Result<MapVariant, VariantError> {
        let path = FieldPath::fields(&[key]);
        let node = child_or_insert(&self.node, &PathElement::field_name(key), &path, 0)?;
        prepare(&mut node.borrow_mut(), Kind::Mapping, &path, 1)?;
        Ok(MapVariant { node })
    }

    /// Returns the node at `path`. Absent segments yield None; a segment
    /// that runs into a node of the wrong kind is an error.
    pub fn get_nested_node(&self, path: &FieldPath) -> Result<Option<NodeRef>, VariantError> {
        let mut current = self.node.clone();
        for (depth, element) in path.iter().enumerate() {
            match step(&current, element, path, depth)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn get_non_null(&self, path: &FieldPath) -> Result<Option<NodeRef>, VariantError> {
        Ok(self.get_nested_node(path)?.filter(|n| !n.borrow().is_null()))
    }

    /// Returns the plain value at `path`. Null values read as absent.
    pub fn get_nested_value(&self, path: &FieldPath) -> Result<Option<Value>, VariantError> {
        let Some(node) = self.get_non_null(path)? else {
            return Ok(None);
        };
        let value = yaml::node_to_value(&node.borrow());
        Ok(Some(value))
    }

    pub fn get_nested_map(&self, path: &FieldPath) -> Result<Option<MapVariant>, VariantError> {
        let Some(node) = self.get_non_null(path)? else {
            return Ok(None);
        };
        let actual = node.borrow().type_name();
        if actual != "map" {
            return Err(VariantError::type_mismatch(path.to_string(), "map", actual));
        }
        Ok(Some(MapVariant { node }))
    }

    pub fn get_nested_slice(&self, path: &FieldPath) -> Result<Option<SliceVariant>, VariantError> {
        let Some(node) = self.get_non_null(path)? else {
            return Ok(None);
        };
        let actual = node.borrow().type_name();
        if actual != "sequence" {
            return Err(VariantError::type_mismatch(path.to_string(), "sequence", actual));
        }
        SliceVariant::from_node(node).map(Some)
    }

    fn get_scalar(&self, path: &FieldPath, expected: Tag) -> Result<Option<Node>, VariantError> {
        let Some(node) = self.get_non_null(path)? else {
            return Ok(None);
        };
        let node = node.borrow();
        if !node.is_scalar() || node.scalar_tag() != expected {
            return Err(VariantError::type_mismatch(path.to_string(), expected.name(), node.type_name()));
        }
        Ok(Some(node.clone()))
    }

    pub fn get_nested_string(&self, path: &FieldPath) -> Result<Option<String>, VariantError> {
        Ok(self.get_scalar(path, Tag::Str)?.map(|n| n.value))
    }

    pub fn get_nested_int(&self, path: &FieldPath) -> Result<Option<i64>, VariantError> {
        let Some(node) = self.get_scalar(path, Tag::Int)? else {
            return Ok(None);
        };
        match yaml::node_to_value(&node).as_i64() {
            Some(i) => Ok(Some(i)),
            None => Err(VariantError::decode(path.to_string(), format!("{:?} is not a 64-bit integer", node.value))),
        }
    }

    pub fn get_nested_float(&self, path: &FieldPath) -> Result<Option<f64>, VariantError> {
        let Some(node) = self.get_scalar(path, Tag::Float)? else {
            return Ok(None);
        };
        match yaml::node_to_value(&node).as_f64() {
            Some(f) => Ok(Some(f)),
            None => Err(VariantError::decode(path.to_string(), format!("{:?} is not a float", node.value))),
        }
    }

    pub fn get_nested_bool(&self, path: &FieldPath) -> Result<Option<bool>, VariantError> {
        let Some(node) = self.get_scalar(path, Tag::Bool)? else {
            return Ok(None);
        };
        match yaml::node_to_value(&node).as_bool() {
            Some(b) => Ok(Some(b)),
            None => Err(VariantError::decode(path.to_string(), format!("{:?} is not a bool", node.value))),
        }
    }

    /// Returns a map of string values, such as labels or annotations.
    pub fn get_nested_string_map(&self, path: &FieldPath) -> Result<Option<BTreeMap<String, String>>, VariantError> {
        let Some(map) = self.get_nested_map(path)? else {
            return Ok(None);
        };
        let mut out = BTreeMap::new();
        for (k, v) in map.node.borrow().entries() {
            let key = k.borrow().value.clone();
            let v = v.borrow();
            if !v.is_scalar() || v.scalar_tag() != Tag::Str {
                let field = path.with(PathElement::field_name(key.as_str()));
                return Err(VariantError::type_mismatch(field.to_string(), "string", v.type_name()));
            }
            out.insert(key, v.value.clone());
        }
        Ok(Some(out))
    }

    /// Returns a sequence of string values.
    pub fn get_nested_string_slice(&self, path: &FieldPath) -> Result<Option<Vec<String>>, VariantError> {
        let Some(slice) = self.get_nested_slice(path)? else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(slice.len());
        for item in slice.node().borrow().content.iter() {
            let item = item.borrow();
            if !item.is_scalar() || item.scalar_tag() != Tag::Str {
                return Err(VariantError::type_mismatch(path.to_string(), "string", item.type_name()));
            }
            out.push(item.value.clone());
        }
        Ok(Some(out))
    }

    /// Sets the node at `path`, creating intermediate maps (and selected
    /// sequence elements) as needed. Setting a null removes the field.
    pub fn set_nested_node(&self, value: Node, path: &FieldPath) -> Result<(), VariantError> {
        let Some((last, parents)) = path.as_slice().split_last() else {
            return Err(VariantError::EmptyPath);
        };
        if value.is_null() {
            return self.remove_nested_field(path).map(|_| ());
        }
        let mut current = self.node.clone();
        for (depth, element) in parents.iter().enumerate() {
            current = child_or_insert(&current, element, path, depth)?;
        }
        let depth = parents.len();
        let mut parent = current.borrow_mut();
        match last {
            PathElement::FieldName(name) => {
                prepare(&mut parent, Kind::Mapping, path, depth)?;
                match parent.field(name) {
                    Some(existing) => assign(&existing, value),
                    None => parent.push_entry(name, value.into_ref()),
                }
            }
            PathElement::Selector { key, value: selected } => {
                prepare(&mut parent, Kind::Sequence, path, depth)?;
                match find_selected(&parent, key, selected) {
                    Some(existing) => assign(&existing, value),
                    None => parent.content.push(value.into_ref()),
                }
            }
            PathElement::Index(i) => {
                prepare(&mut parent, Kind::Sequence, path, depth)?;
                match parent.content.get(*i).cloned() {
                    Some(existing) => assign(&existing, value),
                    None => return Err(VariantError::not_found(path.to_string())),
                }
            }
        }
        Ok(())
    }

    pub fn set_nested_value(&self, value: &Value, path: &FieldPath) -> Result<(), VariantError> {
        self.set_nested_node(yaml::value_to_node(value), path)
    }

    pub fn set_nested_string(&self, value: &str, path: &FieldPath) -> Result<(), VariantError> {
        self.set_nested_node(Node::string(value), path)
    }

    pub fn set_nested_int(&self, value: i64, path: &FieldPath) -> Result<(), VariantError> {
        self.set_nested_node(Node::int(value), path)
    }

    pub fn set_nested_float(&self, value: f64, path: &FieldPath) -> Result<(), VariantError> {
        self.set_nested_node(Node::float(value), path)
    }

    pub fn set_nested_bool(&self, value: bool, path: &FieldPath) -> Result<(), VariantError> {
        self.set_nested_node(Node::bool(value), path)
    }

    /// Sets a copy of `value` at `path`.
    pub fn set_nested_map(&self, value: &MapVariant, path: &FieldPath) -> Result<(), VariantError> {
        let copy = value.node.borrow().deep_copy();
        self.set_nested_node(copy, path)
    }

    /// Sets a copy of `value` at `path`.
    pub fn set_nested_slice(&self, value: &SliceVariant, path: &FieldPath) -> Result<(), VariantError> {
        let copy = value.node().borrow().deep_copy();
        self.set_nested_node(copy, path)
    }

    pub fn set_nested_string_map(&self, value: &BTreeMap<String, String>, path: &FieldPath) -> Result<(), VariantError> {
        let mut node = Node::mapping();
        for (k, v) in value {
            node.push_entry(k, Node::string(v.as_str()).into_ref());
        }
        self.set_nested_node(node, path)
    }

    pub fn set_nested_string_slice<S: AsRef<str>>(&self, value: &[S], path: &FieldPath) -> Result<(), VariantError> {
        let mut node = Node::sequence();
        node.content = value
            .iter()
            .map(|s| Node::string(s.as_ref()).into_ref())
            .collect();
        self.set_nested_node(node, path)
    }

    /// Removes the field at `path`. Returns true if it was present.
    pub fn remove_nested_field(&self, path: &FieldPath) -> Result<bool, VariantError> {
        let Some((last, parents)) = path.as_slice().split_last() else {
            return Err(VariantError::EmptyPath);
        };
        let depth = parents.len();
        let Some(parent) = self.get_nested_node(&path.prefix(depth))? else {
            return Ok(false);
        };
        let mut parent = parent.borrow_mut();
        if parent.is_null() {
            return Ok(false);
        }
        match last {
            PathElement::FieldName(name) => {
                if !parent.is_mapping() {
                    return Err(VariantError::type_mismatch(path.prefix(depth).to_string(), "map", parent.type_name()));
                }
                Ok(parent.remove_entry(name).is_some())
            }
            PathElement::Selector { key, value } => {
                if !parent.is_sequence() {
                    return Err(VariantError::type_mismatch(
                        path.prefix(depth).to_string(),
                        "sequence",
                        parent.type_name(),
                    ));
                }
                let Some(found) = find_selected(&parent, key, value) else {
                    return Ok(false);
                };
                parent.content.retain(|item| !std::rc::Rc::ptr_eq(item, &found));
                Ok(true)
            }
            PathElement::Index(i) => {
                if !parent.is_sequence() {
                    return Err(VariantError::type_mismatch(
                        path.prefix(depth).to_string(),
                        "sequence",
                        parent.type_name(),
                    ));
                }
                if *i >= parent.content.len() {
                    return Ok(false);
                }
                parent.content.remove(*i);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::{emit_node, parse, SequenceIndent};
    use pretty_assertions::assert_eq;

    fn map(input: &str) -> MapVariant {
        let stream = parse(input).unwrap();
        MapVariant::from_node(stream.documents[0].clone()).unwrap()
    }

    fn path(segments: &[&str]) -> FieldPath {
        FieldPath::parse(segments).unwrap()
    }

    fn text(m: &MapVariant) -> String {
        emit_node(&m.node().borrow(), SequenceIndent::Compact)
    }

    #[test]
    fn test_get_nested() {
        let m = map("spec:\n  replicas: 3\n  paused: true\n  name: web\n  ratio: 0.5\n");
        assert_eq!(m.get_nested_int(&path(&["spec", "replicas"])).unwrap(), Some(3));
        assert_eq!(m.get_nested_bool(&path(&["spec", "paused"])).unwrap(), Some(true));
        assert_eq!(m.get_nested_string(&path(&["spec", "name"])).unwrap(), Some("web".to_string()));
        assert_eq!(m.get_nested_float(&path(&["spec", "ratio"])).unwrap(), Some(0.5));
        assert_eq!(m.get_nested_int(&path(&["spec", "missing"])).unwrap(), None);
        assert_eq!(m.get_nested_int(&path(&["missing", "replicas"])).unwrap(), None);
    }

    #[test]
    fn test_get_nested_type_mismatch() {
        let m = map("spec:\n  replicas: 3\n  name: web\n");
        let err = m.get_nested_string(&path(&["spec", "replicas"])).unwrap_err();
        assert_eq!(err, VariantError::type_mismatch(".spec.replicas", "string", "int"));
        assert!(m.get_nested_int(&path(&["spec", "name", "x"])).is_err());
        assert!(m.get_nested_slice(&path(&["spec"])).is_err());
    }

    #[test]
    fn test_set_nested_creates_maps() {
        let m = MapVariant::new();
        m.set_nested_string("web", &path(&["metadata", "labels", "app"])).unwrap();
        m.set_nested_int(2, &path(&["spec", "replicas"])).unwrap();
        assert_eq!(text(&m), "metadata:\n  labels:\n    app: web\nspec:\n  replicas: 2\n");
    }

    #[test]
    fn test_set_nested_keeps_comments() {
        let m = map("spec:\n  # how many\n  replicas: 3 # scale\n");
        m.set_nested_int(5, &path(&["spec", "replicas"])).unwrap();
        assert_eq!(text(&m), "spec:\n  # how many\n  replicas: 5 # scale\n");
    }

    #[test]
    fn test_set_nested_replaces_kind() {
        let m = map("a:\n- x\n");
        m.set_nested_string("scalar", &path(&["a"])).unwrap();
        assert_eq!(text(&m), "a: scalar\n");
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let m = map("a: x\n");
        assert!(m.set_nested_string("y", &path(&["a", "b"])).is_err());
        assert_eq!(text(&m), "a: x\n");
    }

    #[test]
    fn test_set_null_removes() {
        let m = map("a: 1\nb: 2\n");
        m.set_nested_node(Node::null(), &path(&["a"])).unwrap();
        assert_eq!(text(&m), "b: 2\n");
    }

    #[test]
    fn test_selectors() {
        let m = map("containers:\n- name: a\n  image: a:1\n- name: b\n  image: b:1\n");
        assert_eq!(
            m.get_nested_string(&path(&["containers", "name=b", "image"])).unwrap(),
            Some("b:1".to_string())
        );
        m.set_nested_string("b:2", &path(&["containers", "name=b", "image"])).unwrap();
        m.set_nested_string("c:1", &path(&["containers", "name=c", "image"])).unwrap();
        assert_eq!(
            text(&m),
            "containers:\n- name: a\n  image: a:1\n- name: b\n  image: b:2\n- name: c\n  image: c:1\n"
        );
        assert!(m.remove_nested_field(&path(&["containers", "name=a"])).unwrap());
        assert_eq!(m.get_nested_slice(&path(&["containers"])).unwrap().map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_index_elements() {
        let m = map("containers:
- name: a
  image: a:1
- name: b
  image: b:1
");
        let second = path(&["containers"]).with(PathElement::Index(1)).with(PathElement::field_name("image"));
        assert_eq!(m.get_nested_string(&second).unwrap(), Some("b:1".to_string()));
        m.set_nested_string("b:2", &second).unwrap();
        assert_eq!(m.get_nested_string(&second).unwrap(), Some("b:2".to_string()));

        let missing = path(&["containers"]).with(PathElement::Index(5)).with(PathElement::field_name("image"));
        assert_eq!(m.get_nested_string(&missing).unwrap(), None);
        assert!(m.set_nested_string("x", &missing).is_err());
        assert!(m.remove_nested_field(&path(&["containers"]).with(PathElement::Index(0))).unwrap());
        assert!(!m.remove_nested_field(&path(&["containers"]).with(PathElement::Index(3))).unwrap());
        assert_eq!(text(&m), "containers:
- name: b
  image: b:2
");
    }

    #[test]
    fn test_remove_nested_field() {
        let m = map("a:\n  b: 1\n  c: 2\n");
        assert!(m.remove_nested_field(&path(&["a", "b"])).unwrap());
        assert!(!m.remove_nested_field(&path(&["a", "b"])).unwrap());
        assert!(!m.remove_nested_field(&path(&["x", "y"])).unwrap());
        assert_eq!(text(&m), "a:\n  c: 2\n");
    }

    #[test]
    fn test_views_alias() {
        let m = map("spec:\n  replicas: 1\n");
        let spec = m.get_nested_map(&path(&["spec"])).unwrap().unwrap();
        spec.set_nested_int(7, &path(&["replicas"])).unwrap();
        assert_eq!(m.get_nested_int(&path(&["spec", "replicas"])).unwrap(), Some(7));
    }

    #[test]
    fn test_string_map() {
        let m = map("metadata:\n  labels:\n    b: two\n    a: one\n");
        let labels = m.get_nested_string_map(&path(&["metadata", "labels"])).unwrap().unwrap();
        assert_eq!(labels.get("a").map(String::as_str), Some("one"));

        let mut updated = labels.clone();
        updated.insert("c".to_string(), "3".to_string());
        m.set_nested_string_map(&updated, &path(&["metadata", "labels"])).unwrap();
        let again = m.get_nested_string_map(&path(&["metadata", "labels"])).unwrap().unwrap();
        assert_eq!(again.get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_upsert_map() {
        let m = map("metadata: {}\n");
        let labels = m.upsert_map("metadata").unwrap().upsert_map("labels").unwrap();
        labels.set_field("app", Node::string("web"));
        assert_eq!(text(&m), "metadata:\n  labels:\n    app: web\n");
        assert!(map("a: 1\n").upsert_map("a").is_err());
    }
}
