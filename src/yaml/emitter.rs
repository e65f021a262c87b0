//! Writes node trees back to YAML text.
//!
//! Block collections are indented by two spaces. Sequences nested under a
//! mapping key follow the [`SequenceIndent`] of the stream they came from.
//! A folded scalar is written with its original lines while its value is
//! unchanged; otherwise it is written as a literal scalar.

use super::node::{Kind, Node, NodeRef, Style, Tag};
use super::parser::SequenceIndent;
use super::scalar;

const INDENT: usize = 2;

/// Emits documents separated by `---`.
pub fn emit(documents: &[NodeRef], sequence_indent: SequenceIndent) -> String {
    let mut emitter = Emitter::new(sequence_indent);
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            emitter.out.push_str("---\n");
        }
        emitter.document(&doc.borrow());
    }
    emitter.out
}

/// Emits a single node as a standalone document.
pub fn emit_node(node: &Node, sequence_indent: SequenceIndent) -> String {
    let mut emitter = Emitter::new(sequence_indent);
    emitter.document(node);
    emitter.out
}

struct Emitter {
    out: String,
    sequence_indent: SequenceIndent,
    skip_next_head: bool,
}

fn is_block_collection(node: &Node) -> bool {
    !node.is_scalar() && node.style != Style::Flow && !node.content.is_empty()
}

fn is_block_scalar(node: &Node) -> bool {
    node.is_scalar() && matches!(node.style, Style::Literal | Style::Folded) && node.tag.is_none()
}

fn is_empty_null(node: &Node) -> bool {
    node.is_scalar() && node.style == Style::Plain && node.value.is_empty() && node.tag.is_none()
}

fn format_comment(text: &str) -> String {
    let text = text.trim_end();
    if text.starts_with('#') {
        text.to_string()
    } else {
        format!("# {}", text)
    }
}

fn block_header(node: &Node) -> String {
    if let Some(source) = node.folded_source() {
        return source.header.clone();
    }
    let mut header = String::from("|");
    if node.value.starts_with(' ') || node.value.starts_with('\n') {
        header.push_str(&INDENT.to_string());
    }
    if !node.value.ends_with('\n') {
        header.push('-');
    } else if node.value.ends_with("\n\n") {
        header.push('+');
    }
    header
}

/// Renders a scalar as it appears inline, in block or flow context.
fn scalar_text(node: &Node, flow: bool) -> String {
    match node.style {
        Style::DoubleQuoted => scalar::double_quote(&node.value),
        Style::SingleQuoted if node.value.contains('\n') => scalar::double_quote(&node.value),
        Style::SingleQuoted => scalar::single_quote(&node.value),
        Style::Literal | Style::Folded => scalar::double_quote(&node.value),
        Style::Plain | Style::Flow => {
            if node.value.is_empty() {
                if node.tag.is_some() || flow {
                    return "null".to_string();
                }
                return String::new();
            }
            if flow && node.scalar_tag() == Tag::Str && scalar::needs_quotes(&node.value, true) {
                return scalar::double_quote(&node.value);
            }
            node.value.clone()
        }
    }
}

fn inline(node: &Node, flow: bool) -> String {
    let mut s = String::new();
    if let Some(tag) = &node.tag {
        s.push_str(tag);
        s.push(' ');
    }
    match node.kind {
        Kind::Scalar => s.push_str(&scalar_text(node, flow)),
        Kind::Mapping => {
            let entries: Vec<String> = node
                .entries()
                .iter()
                .map(|(k, v)| format!("{}: {}", scalar_text(&k.borrow(), true), inline(&v.borrow(), true)))
                .collect();
            s.push('{');
            s.push_str(&entries.join(", "));
            s.push('}');
        }
        Kind::Sequence => {
            let items: Vec<String> = node.content.iter().map(|i| inline(&i.borrow(), true)).collect();
            s.push('[');
            s.push_str(&items.join(", "));
            s.push(']');
        }
    }
    s
}

impl Emitter {
    fn new(sequence_indent: SequenceIndent) -> Self {
        Emitter {
            out: String::new(),
            sequence_indent,
            skip_next_head: false,
        }
    }

    fn indent(&mut self, indent: usize) {
        self.out.push_str(&" ".repeat(indent));
    }

    fn comment(&mut self, text: &str, indent: usize) {
        if text.is_empty() {
            return;
        }
        for line in text.split('\n') {
            if line.trim().is_empty() {
                self.out.push('\n');
                continue;
            }
            self.indent(indent);
            self.out.push_str(&format_comment(line.trim_start()));
            self.out.push('\n');
        }
    }

    fn line_comment(&mut self, text: &str) {
        if !text.is_empty() {
            self.out.push(' ');
            self.out.push_str(&format_comment(&text.replace('\n', " ")));
        }
    }

    fn head_comment(&mut self, text: &str, indent: usize) {
        if self.skip_next_head {
            self.skip_next_head = false;
        } else {
            self.comment(text, indent);
        }
    }

    fn document(&mut self, node: &Node) {
        if is_block_collection(node) && node.tag.is_none() {
            self.comment(&node.head_comment, 0);
            self.block(node, 0);
        } else if is_block_scalar(node) {
            self.comment(&node.head_comment, 0);
            self.block_scalar(node, 0);
        } else {
            self.comment(&node.head_comment, 0);
            self.out.push_str(&inline(node, false));
            self.line_comment(&node.line_comment);
            self.out.push('\n');
        }
        self.comment(&node.foot_comment, 0);
    }

    fn block(&mut self, node: &Node, indent: usize) {
        match node.kind {
            Kind::Mapping => {
                for (k, v) in node.entries() {
                    self.mapping_entry(&k.borrow(), &v.borrow(), indent);
                }
            }
            Kind::Sequence => {
                for item in &node.content {
                    self.sequence_item(&item.borrow(), indent);
                }
            }
            Kind::Scalar => {
                self.indent(indent);
                self.out.push_str(&inline(node, false));
                self.out.push('\n');
            }
        }
    }

    fn mapping_entry(&mut self, key: &Node, value: &Node, indent: usize) {
        self.head_comment(&key.head_comment, indent);
        self.indent(indent);
        self.out.push_str(&scalar_text(key, false));
        self.out.push(':');
        self.value(value, indent, &key.line_comment, true);
        self.comment(&key.foot_comment, indent);
    }

    fn sequence_item(&mut self, item: &Node, indent: usize) {
        self.head_comment(&item.head_comment, indent);
        if is_block_collection(item) && item.line_comment.is_empty() && item.tag.is_none() {
            let first_head = item
                .content
                .first()
                .map(|first| first.borrow().head_comment.clone())
                .unwrap_or_default();
            self.comment(&first_head, indent);

            let mut nested = Emitter::new(self.sequence_indent);
            nested.skip_next_head = true;
            nested.block(item, indent + INDENT);
            let prefix = " ".repeat(indent + INDENT);
            match nested.out.strip_prefix(&prefix) {
                Some(rest) => {
                    self.indent(indent);
                    self.out.push_str("- ");
                    self.out.push_str(rest);
                }
                None => {
                    self.indent(indent);
                    self.out.push_str("-\n");
                    self.out.push_str(&nested.out);
                }
            }
        } else {
            self.indent(indent);
            self.out.push('-');
            self.value(item, indent, "", false);
        }
        self.comment(&item.foot_comment, indent);
    }

    /// Writes the value that follows `key:` or `-` on the current line.
    fn value(&mut self, value: &Node, indent: usize, key_comment: &str, in_mapping: bool) {
        if is_block_collection(value) {
            if let Some(tag) = &value.tag {
                self.out.push(' ');
                self.out.push_str(tag);
            }
            self.line_comment(key_comment);
            self.line_comment(&value.line_comment);
            self.out.push('\n');
            let child = if value.is_sequence() && in_mapping && self.sequence_indent == SequenceIndent::Compact {
                indent
            } else {
                indent + INDENT
            };
            self.comment(&value.head_comment, child);
            self.block(value, child);
            self.comment(&value.foot_comment, child);
        } else if is_block_scalar(value) {
            self.out.push(' ');
            self.out.push_str(&block_header(value));
            self.line_comment(&value.line_comment);
            self.line_comment(key_comment);
            self.out.push('\n');
            self.block_scalar_body(value, indent + INDENT);
        } else if is_empty_null(value) {
            self.line_comment(&value.line_comment);
            self.line_comment(key_comment);
            self.out.push('\n');
        } else {
            self.out.push(' ');
            self.out.push_str(&inline(value, false));
            self.line_comment(&value.line_comment);
            self.line_comment(key_comment);
            self.out.push('\n');
        }
    }

    fn block_scalar(&mut self, node: &Node, indent: usize) {
        self.out.push_str(&block_header(node));
        self.line_comment(&node.line_comment);
        self.out.push('\n');
        self.block_scalar_body(node, indent + INDENT);
    }

    fn block_scalar_body(&mut self, node: &Node, indent: usize) {
        if let Some(source) = node.folded_source() {
            for line in &source.lines {
                if !line.is_empty() {
                    self.indent(indent);
                    self.out.push_str(line);
                }
                self.out.push('\n');
            }
            return;
        }
        let body = node.value.strip_suffix('\n').unwrap_or(&node.value);
        if body.is_empty() && !node.value.ends_with("\n\n") {
            return;
        }
        for line in body.split('\n') {
            if !line.is_empty() {
                self.indent(indent);
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parser::parse;
    use pretty_assertions::assert_eq;

    fn round_trip(input: &str) -> String {
        let stream = parse(input).unwrap();
        emit(&stream.documents, stream.sequence_indent)
    }

    #[test]
    fn test_round_trip_preserves_layout() {
        let input = r#"# leading comment
apiVersion: apps/v1
kind: Deployment
metadata:
  name: nginx # the name
  labels:
    app: nginx
spec:
  replicas: 3
  template:
    spec:
      containers:
      - name: nginx
        image: nginx:1.14.2
        ports:
        - containerPort: 80
"#;
        assert_eq!(round_trip(input), input);
    }

    #[test]
    fn test_round_trip_wide_sequences() {
        let input = "items:\n  - a\n  - b\nlist:\n  - name: x\n    value: y\n";
        assert_eq!(round_trip(input), input);
    }

    #[test]
    fn test_round_trip_scalars_and_comments() {
        let input = r#"a: 'quoted'
b: "5"
c: |
  line1
  line2
d: |-
  no newline
e: {}
f: []
g:
# foot of g
"#;
        assert_eq!(round_trip(input), input);
    }

    #[test]
    fn test_round_trip_folded_scalars() {
        let input = "a: >-\n  folded\n  text\nb: >\n  one\n  two\n\n  three\nc: 1\n";
        assert_eq!(round_trip(input), input);
    }

    #[test]
    fn test_edited_folded_scalar_becomes_literal() {
        let stream = parse("a: >-\n  folded\n  text\n").unwrap();
        let doc = stream.documents[0].borrow();
        if let Some(a) = doc.field("a") {
            a.borrow_mut().value = "other text".to_string();
        }
        assert_eq!(emit_node(&doc, SequenceIndent::Compact), "a: |-\n  other text\n");
    }

    #[test]
    fn test_emit_multiple_documents() {
        let input = "a: 1\n---\nb: 2\n";
        assert_eq!(round_trip(input), input);
    }

    #[test]
    fn test_emit_built_tree() {
        let mut map = Node::mapping();
        map.push_entry("name", Node::string("example").into_ref());
        map.push_entry("count", Node::int(2).into_ref());
        map.push_entry("version", Node::string("1.0").into_ref());
        let mut seq = Node::sequence();
        seq.content.push(Node::string("x").into_ref());
        map.push_entry("items", seq.into_ref());
        let out = emit_node(&map, SequenceIndent::Compact);
        assert_eq!(out, "name: example\ncount: 2\nversion: \"1.0\"\nitems:\n- x\n");
    }
}
