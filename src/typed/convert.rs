//! Conversion between node trees and serde types.
//!
//! Decoding goes node -> `serde_yaml::Value` -> `T`, so the target type
//! decides the shape: a struct drops keys it does not declare, while a
//! [`MapVariant`] or raw node keeps everything. Scalars must match the
//! target's kind exactly: `"5"` does not decode into an integer and `5`
//! does not decode into a float.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::variant::{FieldPath, MapVariant, VariantError};
use crate::yaml::{self, Node};

use super::strict::Strict;

/// Decodes a node into `T`.
pub fn decode<T: DeserializeOwned>(node: &Node) -> Result<T, VariantError> {
    decode_at(node, &FieldPath::new())
}

/// Decodes a node found at `path` into `T`; the path is reported on error.
pub fn decode_at<T: DeserializeOwned>(node: &Node, path: &FieldPath) -> Result<T, VariantError> {
    T::deserialize(Strict(yaml::node_to_value(node))).map_err(|e| VariantError::decode(path.to_string(), e))
}

/// Encodes a value into a block-style node tree. Struct fields keep their
/// declaration order.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Node, VariantError> {
    let value = serde_yaml::to_value(value).map_err(VariantError::encode)?;
    Ok(yaml::value_to_node(&value))
}

/// Encodes a value that serializes to a mapping.
pub fn typed_object_to_map_variant<T: Serialize + ?Sized>(value: &T) -> Result<MapVariant, VariantError> {
    let node = encode(value)?;
    if !node.is_mapping() {
        return Err(VariantError::type_mismatch(".", "map", node.type_name()));
    }
    MapVariant::from_node(node.into_ref())
}

/// Decodes a whole map into `T`.
pub fn map_variant_to_typed_object<T: DeserializeOwned>(map: &MapVariant) -> Result<T, VariantError> {
    decode(&map.node().borrow())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::{emit_node, SequenceIndent};
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Container {
        name: String,
        image: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_pull_policy: Option<String>,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Spec {
        replicas: i64,
        containers: Vec<Container>,
    }

    #[test]
    fn test_encode_keeps_field_order() {
        let spec = Spec {
            replicas: 2,
            containers: vec![Container {
                name: "web".to_string(),
                image: "nginx".to_string(),
                image_pull_policy: None,
            }],
        };
        let map = typed_object_to_map_variant(&spec).unwrap();
        assert_eq!(
            emit_node(&map.node().borrow(), SequenceIndent::Compact),
            "replicas: 2\ncontainers:\n- name: web\n  image: nginx\n"
        );
        let back: Spec = map_variant_to_typed_object(&map).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_decode_drops_unknown_fields() {
        let stream = yaml::parse("name: web\nimage: nginx\nextra: true\n").unwrap();
        let container: Container = decode(&stream.documents[0].borrow()).unwrap();
        assert_eq!(container.name, "web");

        let loose: BTreeMap<String, serde_yaml::Value> = decode(&stream.documents[0].borrow()).unwrap();
        assert!(loose.contains_key("extra"));
    }

    #[test]
    fn test_decode_exact_kinds() {
        let quoted = yaml::parse("replicas: \"5\"\ncontainers: []\n").unwrap();
        assert!(decode::<Spec>(&quoted.documents[0].borrow()).is_err());
        let plain = yaml::parse("replicas: 5\ncontainers: []\n").unwrap();
        assert_eq!(decode::<Spec>(&plain.documents[0].borrow()).unwrap().replicas, 5);
    }

    #[test]
    fn test_decode_floats_need_float_scalars() {
        #[derive(Debug, Deserialize)]
        struct Scaling {
            ratio: f64,
            #[serde(default)]
            limit: Option<f32>,
        }
        let int = yaml::parse("ratio: 3
").unwrap();
        assert!(decode::<Scaling>(&int.documents[0].borrow()).is_err());
        let nested = yaml::parse("ratio: 0.5
limit: 2
").unwrap();
        assert!(decode::<Scaling>(&nested.documents[0].borrow()).is_err());
        let float = yaml::parse("ratio: 3.0
limit: 2.5
").unwrap();
        let scaling = decode::<Scaling>(&float.documents[0].borrow()).unwrap();
        assert_eq!(scaling.ratio, 3.0);
        assert_eq!(scaling.limit, Some(2.5));

        let scalar = yaml::parse("- 3
- 4.5
").unwrap();
        let seq = scalar.documents[0].borrow();
        assert!(decode::<f64>(&seq.content[0].borrow()).is_err());
        assert_eq!(decode::<f64>(&seq.content[1].borrow()).unwrap(), 4.5);
        assert_eq!(decode::<i64>(&seq.content[0].borrow()).unwrap(), 3);
    }

    #[test]
    fn test_scalar_is_not_an_object() {
        assert!(typed_object_to_map_variant("text").is_err());
    }
}
