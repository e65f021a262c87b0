//! Path, index and id annotations that record where an item came from.
//!
//! Each annotation exists in a legacy and an `internal.` form. Both forms
//! are kept equal: a function may change either one, but changing both to
//! different values is an error.

use tracing::debug;

use crate::error::{Error, Result};
use crate::object::KubeObject;

pub const PATH_ANNOTATION: &str = "config.kubernetes.io/path";
pub const INTERNAL_PATH_ANNOTATION: &str = "internal.config.kubernetes.io/path";
pub const INDEX_ANNOTATION: &str = "config.kubernetes.io/index";
pub const INTERNAL_INDEX_ANNOTATION: &str = "internal.config.kubernetes.io/index";
pub const ID_ANNOTATION: &str = "config.k8s.io/id";
pub const INTERNAL_ID_ANNOTATION: &str = "internal.config.kubernetes.io/id";

const PAIRS: [(&str, &str); 3] = [
    (PATH_ANNOTATION, INTERNAL_PATH_ANNOTATION),
    (INDEX_ANNOTATION, INTERNAL_INDEX_ANNOTATION),
    (ID_ANNOTATION, INTERNAL_ID_ANNOTATION),
];

/// Values of each annotation pair as read from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Vec<(String, String)>);

fn read(obj: &KubeObject) -> Vec<(String, String)> {
    PAIRS
        .iter()
        .map(|(legacy, internal)| (obj.annotation(legacy), obj.annotation(internal)))
        .collect()
}

/// Fills the empty side of each pair from the other side and records the
/// resulting values.
pub(crate) fn normalize(obj: &mut KubeObject) -> Result<()> {
    for ((legacy, internal), (legacy_value, internal_value)) in PAIRS.iter().zip(read(obj)) {
        if legacy_value.is_empty() && !internal_value.is_empty() {
            obj.set_annotation(legacy, &internal_value)?;
        } else if internal_value.is_empty() && !legacy_value.is_empty() {
            obj.set_annotation(internal, &legacy_value)?;
        }
    }
    obj.provenance = Some(Snapshot(read(obj)));
    Ok(())
}

/// Propagates a change made to one side of a pair onto the other side.
pub(crate) fn reconcile(obj: &KubeObject) -> Result<()> {
    let current = read(obj);
    let original = match &obj.provenance {
        Some(Snapshot(values)) => values.clone(),
        None => vec![(String::new(), String::new()); PAIRS.len()],
    };
    for (((legacy, internal), (legacy_value, internal_value)), (legacy_orig, internal_orig)) in
        PAIRS.iter().zip(current).zip(original)
    {
        if legacy_value == internal_value {
            continue;
        }
        let legacy_changed = legacy_value != legacy_orig;
        let internal_changed = internal_value != internal_orig;
        debug!(object = %obj.id(), legacy, internal, legacy_changed, internal_changed, "reconciling annotation pair");
        match (legacy_changed, internal_changed) {
            (true, true) if !legacy_value.is_empty() && !internal_value.is_empty() => {
                return Err(Error::InvalidAnnotations(format!(
                    "resource {} has conflicting annotations {legacy}={legacy_value:?} and {internal}={internal_value:?}",
                    obj.id()
                )));
            }
            (_, true) if internal_value.is_empty() => obj.set_annotation(internal, &legacy_value)?,
            (true, _) if legacy_value.is_empty() => obj.set_annotation(legacy, &internal_value)?,
            (true, _) => obj.set_annotation(internal, &legacy_value)?,
            (false, true) => obj.set_annotation(legacy, &internal_value)?,
            (false, false) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(annotations: &str) -> KubeObject {
        KubeObject::parse(&format!(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n  annotations:\n{annotations}"
        ))
        .unwrap()
    }

    #[test]
    fn test_normalize_copies_missing_side() {
        let mut obj = object("    config.kubernetes.io/path: a.yaml\n");
        normalize(&mut obj).unwrap();
        assert_eq!(obj.annotation(INTERNAL_PATH_ANNOTATION), "a.yaml");
    }

    #[test]
    fn test_reconcile_follows_single_change() {
        let mut obj = object("    config.kubernetes.io/path: a.yaml\n");
        normalize(&mut obj).unwrap();
        obj.set_annotation(PATH_ANNOTATION, "b.yaml").unwrap();
        reconcile(&obj).unwrap();
        assert_eq!(obj.annotation(INTERNAL_PATH_ANNOTATION), "b.yaml");

        obj.set_annotation(INTERNAL_INDEX_ANNOTATION, "3").unwrap();
        reconcile(&obj).unwrap();
        assert_eq!(obj.annotation(INDEX_ANNOTATION), "3");
    }

    #[test]
    fn test_reconcile_rejects_conflict() {
        let mut obj = object("    config.kubernetes.io/path: a.yaml\n");
        normalize(&mut obj).unwrap();
        obj.set_annotation(PATH_ANNOTATION, "b.yaml").unwrap();
        obj.set_annotation(INTERNAL_PATH_ANNOTATION, "c.yaml").unwrap();
        assert!(matches!(reconcile(&obj), Err(Error::InvalidAnnotations(_))));
    }

    #[test]
    fn test_new_object_without_snapshot() {
        let obj = object("    internal.config.kubernetes.io/path: new.yaml\n");
        reconcile(&obj).unwrap();
        assert_eq!(obj.annotation(PATH_ANNOTATION), "new.yaml");
    }
}
