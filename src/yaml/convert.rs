//! Conversion between node trees and `serde_yaml::Value`.

use serde_yaml::{Mapping, Value};

use super::node::{Kind, Node, Style, Tag};
use super::scalar;

/// Converts a node tree into a plain value. Comments and styles are dropped.
pub fn node_to_value(node: &Node) -> Value {
    match node.kind {
        Kind::Scalar => scalar_value(node),
        Kind::Sequence => Value::Sequence(node.content.iter().map(|c| node_to_value(&c.borrow())).collect()),
        Kind::Mapping => {
            let mut map = Mapping::new();
            for (k, v) in node.entries() {
                map.insert(node_to_value(&k.borrow()), node_to_value(&v.borrow()));
            }
            Value::Mapping(map)
        }
    }
}

fn scalar_value(node: &Node) -> Value {
    match node.scalar_tag() {
        Tag::Str => Value::String(node.value.clone()),
        Tag::Null => Value::Null,
        _ if node.style == Style::Plain && node.tag.is_none() => scalar::resolve_plain(&node.value),
        _ => serde_yaml::from_str(&node.value).unwrap_or_else(|_| Value::String(node.value.clone())),
    }
}

/// Converts a plain value into a node tree in block style.
pub fn value_to_node(value: &Value) -> Node {
    match value {
        Value::Null => Node::null(),
        Value::Bool(b) => Node::bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Node::int(i)
            } else if let Some(u) = n.as_u64() {
                Node::plain(u.to_string())
            } else {
                Node::float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => Node::string(s.as_str()),
        Value::Sequence(items) => {
            let mut node = Node::sequence();
            node.content = items.iter().map(|v| value_to_node(v).into_ref()).collect();
            node
        }
        Value::Mapping(map) => {
            let mut node = Node::mapping();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => Node::string(s.as_str()),
                    other => value_to_node(other),
                };
                node.content.push(key.into_ref());
                node.content.push(value_to_node(v).into_ref());
            }
            node
        }
        Value::Tagged(tagged) => {
            let mut node = value_to_node(&tagged.value);
            node.tag = Some(tagged.tag.to_string());
            node
        }
    }
}
