//! Sequence variant.

use crate::yaml::{Kind, Node, NodeRef, Style};

use super::map::find_selected;
use super::{MapVariant, Variant, VariantError};

/// SliceVariant is a view over a sequence node.
#[derive(Debug, Clone)]
pub struct SliceVariant {
    node: NodeRef,
}

impl Default for SliceVariant {
    fn default() -> Self {
        SliceVariant::new()
    }
}

impl SliceVariant {
    /// Creates a new empty sequence.
    pub fn new() -> Self {
        SliceVariant {
            node: Node::sequence().into_ref(),
        }
    }

    /// Wraps a sequence node. A null node is turned into an empty sequence in
    /// place.
    pub fn from_node(node: NodeRef) -> Result<Self, VariantError> {
        {
            let mut n = node.borrow_mut();
            if n.is_null() {
                n.kind = Kind::Sequence;
                n.style = Style::Plain;
                n.value.clear();
                n.tag = None;
            } else if !n.is_sequence() {
                return Err(VariantError::type_mismatch(".", "sequence", n.type_name()));
            }
        }
        Ok(SliceVariant { node })
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn len(&self) -> usize {
        self.node.borrow().content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.borrow().content.is_empty()
    }

    /// Returns the elements as variants.
    pub fn elements(&self) -> Vec<Variant> {
        self.node
            .borrow()
            .content
            .iter()
            .map(|n| Variant::from_node(n.clone()))
            .collect()
    }

    /// Returns the elements as maps. Every element must be a mapping.
    pub fn objects(&self) -> Result<Vec<MapVariant>, VariantError> {
        let content = self.node.borrow().content.clone();
        content
            .into_iter()
            .enumerate()
            .map(|(i, n)| {
                let kind = n.borrow().type_name();
                if kind != "map" {
                    return Err(VariantError::type_mismatch(format!("[{}]", i), "map", kind));
                }
                MapVariant::from_node(n)
            })
            .collect()
    }

    /// Appends an element.
    pub fn push(&self, value: Node) {
        if self.node.borrow().style == Style::Flow && self.is_empty() {
            self.node.borrow_mut().style = Style::Plain;
        }
        self.node.borrow_mut().content.push(value.into_ref());
    }

    /// Appends an existing node; the sequence and the caller share it.
    pub fn push_node(&self, node: NodeRef) {
        self.node.borrow_mut().content.push(node);
    }

    pub fn clear(&self) {
        self.node.borrow_mut().content.clear();
    }

    /// Returns the first map element whose `key` field equals `value`.
    pub fn element_by_selector(&self, key: &str, value: &str) -> Option<MapVariant> {
        let found = find_selected(&self.node.borrow(), key, value)?;
        MapVariant::from_node(found).ok()
    }
}
