//! Parsed YAML documents.

use crate::yaml::{self, NodeRef, ParseError, SequenceIndent};

use super::{MapVariant, VariantError};

/// Document owns the nodes of a parsed YAML stream and remembers how its
/// sequences were indented so it can be written back the same way.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<NodeRef>,
    sequence_indent: SequenceIndent,
}

impl Document {
    /// Creates a document from top-level nodes.
    pub fn new(nodes: Vec<NodeRef>, sequence_indent: SequenceIndent) -> Self {
        Document { nodes, sequence_indent }
    }

    /// Parses a (possibly multi-document) YAML stream.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let stream = yaml::parse(input)?;
        Ok(Document {
            nodes: stream.documents,
            sequence_indent: stream.sequence_indent,
        })
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn sequence_indent(&self) -> SequenceIndent {
        self.sequence_indent
    }

    /// Returns every top-level node as a map.
    pub fn objects(&self) -> Result<Vec<MapVariant>, VariantError> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let kind = node.borrow().type_name();
                if kind != "map" {
                    return Err(VariantError::type_mismatch(format!("document {}", i), "map", kind));
                }
                MapVariant::from_node(node.clone())
            })
            .collect()
    }

    /// Serializes the document.
    pub fn to_yaml(&self) -> String {
        yaml::emit(&self.nodes, self.sequence_indent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objects() {
        let doc = Document::parse("a: 1\n---\nb: 2\n").unwrap();
        assert_eq!(doc.objects().unwrap().len(), 2);
        assert_eq!(doc.to_yaml(), "a: 1\n---\nb: 2\n");
    }

    #[test]
    fn test_objects_rejects_scalars() {
        let doc = Document::parse("a: 1\n---\njust text\n").unwrap();
        assert!(doc.objects().is_err());
    }
}
