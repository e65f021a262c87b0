//! Core node types of the YAML parse tree.

use std::cell::RefCell;
use std::rc::Rc;

use super::scalar;

/// NodeRef is a shared, mutable handle to a node in a parse tree.
///
/// Handles are views: cloning a NodeRef never copies the node, so every
/// holder observes mutations made through any other holder.
pub type NodeRef = Rc<RefCell<Node>>;

/// Kind is the structural kind of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Kind {
    #[default]
    Scalar,
    Mapping,
    Sequence,
}

/// Style records how a node is written in YAML text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Style {
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
    /// Flow collection (`{a: 1}` or `[a, b]`).
    Flow,
}

/// Tag is the resolved type of a scalar node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

impl Tag {
    /// Returns the YAML short name of the tag.
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Null => "null",
            Tag::Bool => "bool",
            Tag::Int => "int",
            Tag::Float => "float",
            Tag::Str => "string",
        }
    }
}

/// Original text of a folded block scalar, kept so that an untouched
/// scalar is written back with its own line breaks.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldedSource {
    /// Value the lines fold into.
    pub value: String,
    /// Header as written, such as `>-`.
    pub header: String,
    /// Content lines without the block indentation.
    pub lines: Vec<String>,
}

/// Node is a single node of a YAML parse tree.
///
/// Mapping nodes keep their entries as a flat `[key, value, key, value, ...]`
/// content list so that key nodes can carry their own comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub kind: Kind,
    pub style: Style,
    /// Explicit tag as written in the source (e.g. `!!str`), if any.
    pub tag: Option<String>,
    pub value: String,
    pub content: Vec<NodeRef>,
    pub head_comment: String,
    pub line_comment: String,
    pub foot_comment: String,
    /// Source of a folded scalar as parsed.
    pub folded: Option<FoldedSource>,
}

impl Node {
    /// Creates an empty block mapping.
    pub fn mapping() -> Self {
        Node {
            kind: Kind::Mapping,
            ..Default::default()
        }
    }

    /// Creates an empty block sequence.
    pub fn sequence() -> Self {
        Node {
            kind: Kind::Sequence,
            ..Default::default()
        }
    }

    /// Creates a string scalar, choosing a style that keeps it a string when
    /// written back out.
    pub fn string(s: impl Into<String>) -> Self {
        let value = s.into();
        let style = scalar::string_style(&value);
        Node {
            kind: Kind::Scalar,
            style,
            value,
            ..Default::default()
        }
    }

    /// Creates a plain scalar whose text is used verbatim.
    pub fn plain(s: impl Into<String>) -> Self {
        Node {
            kind: Kind::Scalar,
            value: s.into(),
            ..Default::default()
        }
    }

    pub fn int(i: i64) -> Self {
        Node::plain(i.to_string())
    }

    pub fn float(f: f64) -> Self {
        Node::plain(scalar::format_float(f))
    }

    pub fn bool(b: bool) -> Self {
        Node::plain(if b { "true" } else { "false" })
    }

    pub fn null() -> Self {
        Node::plain("null")
    }

    /// Wraps the node into a shared handle.
    pub fn into_ref(self) -> NodeRef {
        Rc::new(RefCell::new(self))
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == Kind::Scalar
    }

    pub fn is_mapping(&self) -> bool {
        self.kind == Kind::Mapping
    }

    pub fn is_sequence(&self) -> bool {
        self.kind == Kind::Sequence
    }

    /// Returns true for null scalars, including the empty value of `key:`.
    pub fn is_null(&self) -> bool {
        self.is_scalar() && self.scalar_tag() == Tag::Null
    }

    /// Returns true for mappings and sequences without content.
    pub fn is_empty_collection(&self) -> bool {
        !self.is_scalar() && self.content.is_empty()
    }

    /// Resolves the type of a scalar node from its tag, style and text.
    pub fn scalar_tag(&self) -> Tag {
        if let Some(tag) = self.tag.as_deref() {
            match tag {
                "!!str" => return Tag::Str,
                "!!int" => return Tag::Int,
                "!!float" => return Tag::Float,
                "!!bool" => return Tag::Bool,
                "!!null" => return Tag::Null,
                _ => {}
            }
        }
        match self.style {
            Style::Plain => scalar::resolve_tag(&self.value),
            _ => Tag::Str,
        }
    }

    /// Returns a short human readable name of the node's type.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            Kind::Mapping => "map",
            Kind::Sequence => "sequence",
            Kind::Scalar => self.scalar_tag().name(),
        }
    }

    /// Recursively copies the node so the copy shares nothing with `self`.
    pub fn deep_copy(&self) -> Node {
        Node {
            kind: self.kind,
            style: self.style,
            tag: self.tag.clone(),
            value: self.value.clone(),
            content: self
                .content
                .iter()
                .map(|child| child.borrow().deep_copy().into_ref())
                .collect(),
            head_comment: self.head_comment.clone(),
            line_comment: self.line_comment.clone(),
            foot_comment: self.foot_comment.clone(),
            folded: self.folded.clone(),
        }
    }

    /// Returns the folded source if it still describes the current value.
    pub fn folded_source(&self) -> Option<&FoldedSource> {
        self.folded
            .as_ref()
            .filter(|source| self.style == Style::Folded && source.value == self.value)
    }

    /// Returns the key and value nodes of a mapping entry.
    pub fn entry(&self, key: &str) -> Option<(NodeRef, NodeRef)> {
        if !self.is_mapping() {
            return None;
        }
        self.content.chunks(2).find_map(|pair| match pair {
            [k, v] if k.borrow().value == key => Some((k.clone(), v.clone())),
            _ => None,
        })
    }

    /// Returns the value node of a mapping entry.
    pub fn field(&self, key: &str) -> Option<NodeRef> {
        self.entry(key).map(|(_, v)| v)
    }

    /// Returns all entries of a mapping in document order.
    pub fn entries(&self) -> Vec<(NodeRef, NodeRef)> {
        if !self.is_mapping() {
            return Vec::new();
        }
        self.content
            .chunks(2)
            .filter_map(|pair| match pair {
                [k, v] => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    /// Returns the keys of a mapping in document order.
    pub fn keys(&self) -> Vec<String> {
        if !self.is_mapping() {
            return Vec::new();
        }
        self.content
            .iter()
            .step_by(2)
            .map(|k| k.borrow().value.clone())
            .collect()
    }

    /// Appends a new entry to a mapping without checking for an existing key.
    pub fn push_entry(&mut self, key: &str, value: NodeRef) {
        self.content.push(Node::string(key).into_ref());
        self.content.push(value);
    }

    /// Removes a mapping entry, returning its key and value nodes.
    pub fn remove_entry(&mut self, key: &str) -> Option<(NodeRef, NodeRef)> {
        let index = self
            .content
            .chunks(2)
            .position(|pair| pair[0].borrow().value == key)?;
        let mut removed = self.content.drain(index * 2..(index * 2 + 2).min(self.content.len()));
        let k = removed.next()?;
        let v = removed.next()?;
        Some((k, v))
    }

    /// Replaces the structure of this node with `other`, keeping this node's
    /// comments wherever `other` has none.
    pub fn replace_keeping_comments(&mut self, mut other: Node) {
        if other.head_comment.is_empty() {
            other.head_comment = std::mem::take(&mut self.head_comment);
        }
        if other.line_comment.is_empty() {
            other.line_comment = std::mem::take(&mut self.line_comment);
        }
        if other.foot_comment.is_empty() {
            other.foot_comment = std::mem::take(&mut self.foot_comment);
        }
        *self = other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kinds() {
        assert!(Node::mapping().is_mapping());
        assert!(Node::sequence().is_sequence());
        assert!(Node::string("a").is_scalar());
        assert!(Node::null().is_null());
        assert!(Node::plain("").is_null());
    }

    #[test]
    fn test_scalar_tags() {
        assert_eq!(Node::int(3).scalar_tag(), Tag::Int);
        assert_eq!(Node::float(1.5).scalar_tag(), Tag::Float);
        assert_eq!(Node::bool(true).scalar_tag(), Tag::Bool);
        assert_eq!(Node::string("5").scalar_tag(), Tag::Str);
        assert_eq!(Node::string("true").scalar_tag(), Tag::Str);
        assert_eq!(Node::string("hello").scalar_tag(), Tag::Str);
    }

    #[test]
    fn test_mapping_entries() {
        let mut map = Node::mapping();
        map.push_entry("a", Node::int(1).into_ref());
        map.push_entry("b", Node::int(2).into_ref());
        assert_eq!(map.keys(), vec!["a", "b"]);
        assert_eq!(map.field("b").as_ref().map(|v| v.borrow().value.clone()), Some("2".to_string()));

        let removed = map.remove_entry("a");
        assert!(removed.is_some());
        assert_eq!(map.keys(), vec!["b"]);
        assert!(map.remove_entry("missing").is_none());
    }

    #[test]
    fn test_replace_keeping_comments() {
        let mut node = Node::int(3);
        node.line_comment = "# keep".to_string();
        node.replace_keeping_comments(Node::int(5));
        assert_eq!(node.value, "5");
        assert_eq!(node.line_comment, "# keep");
    }

    #[test]
    fn test_deep_copy_is_detached() {
        let mut map = Node::mapping();
        map.push_entry("a", Node::int(1).into_ref());
        let copy = map.deep_copy();
        if let Some(v) = map.field("a") {
            v.borrow_mut().value = "9".to_string();
        }
        assert_eq!(copy.field("a").as_ref().map(|v| v.borrow().value.clone()), Some("1".to_string()));
    }
}
