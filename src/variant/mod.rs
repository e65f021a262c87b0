//! Variant module - Typed views over the YAML node tree.
//!
//! A variant never owns its node: it is a handle into the tree of the
//! enclosing document, so edits made through any variant are visible
//! through every other view of the same node.

mod document;
mod error;
mod map;
mod path;
mod slice;

pub use document::*;
pub use error::*;
pub use map::MapVariant;
pub use path::*;
pub use slice::*;


use crate::yaml::{Kind, NodeRef, Tag};

/// ScalarVariant is a view over a scalar node.
#[derive(Debug, Clone)]
pub struct ScalarVariant {
    node: NodeRef,
}

impl ScalarVariant {
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Returns the scalar text.
    pub fn value(&self) -> String {
        self.node.borrow().value.clone()
    }

    /// Returns the resolved type of the scalar.
    pub fn tag(&self) -> Tag {
        self.node.borrow().scalar_tag()
    }
}

/// Variant is the closed set of node views.
#[derive(Debug, Clone)]
pub enum Variant {
    Scalar(ScalarVariant),
    Map(MapVariant),
    Slice(SliceVariant),
}

impl Variant {
    /// Wraps a node into the variant matching its kind.
    pub fn from_node(node: NodeRef) -> Self {
        let kind = node.borrow().kind;
        match kind {
            Kind::Mapping => match MapVariant::from_node(node.clone()) {
                Ok(m) => Variant::Map(m),
                Err(_) => Variant::Scalar(ScalarVariant { node }),
            },
            Kind::Sequence => match SliceVariant::from_node(node.clone()) {
                Ok(s) => Variant::Slice(s),
                Err(_) => Variant::Scalar(ScalarVariant { node }),
            },
            Kind::Scalar => Variant::Scalar(ScalarVariant { node }),
        }
    }

    /// Returns the underlying node.
    pub fn node(&self) -> &NodeRef {
        match self {
            Variant::Scalar(s) => s.node(),
            Variant::Map(m) => m.node(),
            Variant::Slice(s) => s.node(),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Variant::Scalar(_) => Kind::Scalar,
            Variant::Map(_) => Kind::Mapping,
            Variant::Slice(_) => Kind::Sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::Node;

    #[test]
    fn test_variant_from_node() {
        assert_eq!(Variant::from_node(Node::mapping().into_ref()).kind(), Kind::Mapping);
        assert_eq!(Variant::from_node(Node::sequence().into_ref()).kind(), Kind::Sequence);
        match Variant::from_node(Node::int(3).into_ref()) {
            Variant::Scalar(s) => {
                assert_eq!(s.value(), "3");
                assert_eq!(s.tag(), Tag::Int);
            }
            other => panic!("unexpected variant {:?}", other.kind()),
        }
    }
}
