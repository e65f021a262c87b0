//! The ResourceList envelope exchanged between pipeline stages.

use tracing::debug;

use crate::error::{Error, Result};
use crate::identity;
use crate::object::{KubeObject, KubeObjects};
use crate::typed;
use crate::variant::{Document, FieldPath, MapVariant};
use crate::yaml::{self, Node, NodeRef, SequenceIndent, Style};

use super::provenance;
use super::result::{Result as FnResult, Results, Severity};

pub const RESOURCE_LIST_API_VERSION: &str = "config.kubernetes.io/v1";
pub const RESOURCE_LIST_KIND: &str = "ResourceList";

/// ResourceList is the input and output of a KRM function: the items to
/// transform, the function configuration and the results reported so far.
#[derive(Debug, Clone)]
pub struct ResourceList {
    pub items: KubeObjects,
    /// Function configuration. Empty, never missing, when the input has
    /// none.
    pub function_config: KubeObject,
    pub results: Results,
    /// Root mapping as parsed. Its keys, their comments and any extra
    /// top-level fields are written back out.
    root: MapVariant,
    sequence_indent: SequenceIndent,
}

impl Default for ResourceList {
    fn default() -> Self {
        ResourceList::new()
    }
}

impl ResourceList {
    pub fn new() -> Self {
        ResourceList {
            items: KubeObjects::new(),
            function_config: KubeObject::new_empty(),
            results: Results::new(),
            root: MapVariant::new(),
            sequence_indent: SequenceIndent::default(),
        }
    }

    /// Parses a ResourceList from YAML.
    pub fn parse(input: &str) -> Result<Self> {
        let doc = Document::parse(input)?;
        let mut roots = doc.objects().map_err(Error::parse)?;
        if roots.len() != 1 {
            return Err(Error::parse(format!("expected exactly one ResourceList, got {} documents", roots.len())));
        }
        let root = roots.remove(0);
        let field = |name: &str| root.get_nested_string(&FieldPath::fields(&[name])).map_err(Error::parse);
        let kind = field("kind")?.unwrap_or_default();
        if kind != RESOURCE_LIST_KIND {
            return Err(Error::parse(format!(
                "input was of unexpected kind {:?}; expected {}",
                kind, RESOURCE_LIST_KIND
            )));
        }

        let mut items = KubeObjects::new();
        if let Some(slice) = root.get_nested_slice(&FieldPath::fields(&["items"])).map_err(Error::parse)? {
            for map in slice.objects().map_err(Error::parse)? {
                let mut item = KubeObject::from_map(map);
                provenance::normalize(&mut item)?;
                items.push(item);
            }
        }

        let function_config = root
            .get_nested_map(&FieldPath::fields(&["functionConfig"]))
            .map_err(Error::parse)?
            .map(KubeObject::from_map)
            .unwrap_or_default();

        let results = match root.get_nested_node(&FieldPath::fields(&["results"])).map_err(Error::parse)? {
            Some(node) => {
                let node = node.borrow();
                if node.is_null() {
                    Results::new()
                } else {
                    typed::decode(&node).map_err(Error::parse)?
                }
            }
            None => Results::new(),
        };

        debug!(items = items.len(), results = results.len(), "parsed ResourceList");
        Ok(ResourceList {
            items,
            function_config,
            results,
            root,
            sequence_indent: doc.sequence_indent(),
        })
    }

    /// Serializes the ResourceList. Path, index and id annotations are
    /// reconciled first; a conflicting edit of both forms of one is an
    /// error.
    pub fn to_yaml(&self) -> Result<String> {
        for item in &self.items {
            provenance::reconcile(item)?;
        }
        let source = self.root.node().borrow();
        let mut root = Node::mapping();
        root.head_comment = source.head_comment.clone();
        root.foot_comment = source.foot_comment.clone();

        let mut written = Vec::new();
        for (key, value) in source.entries() {
            let name = key.borrow().value.clone();
            if let Some(value) = self.top_level_field(&name, Some(&value))? {
                root.content.push(key);
                root.content.push(value);
            }
            written.push(name);
        }
        for name in ["apiVersion", "kind", "items", "functionConfig", "results"] {
            if written.iter().any(|w| w == name) {
                continue;
            }
            if let Some(value) = self.top_level_field(name, None)? {
                root.push_entry(name, value);
            }
        }
        Ok(yaml::emit_node(&root, self.sequence_indent))
    }

    /// Returns the value written for a top-level field, or None to omit
    /// it. `parsed` is the value the input had, whose comments and style
    /// are kept.
    fn top_level_field(&self, name: &str, parsed: Option<&NodeRef>) -> Result<Option<NodeRef>> {
        let template = |node: Node| match parsed {
            Some(parsed) => {
                let mut kept = parsed.borrow().clone();
                kept.replace_keeping_comments(node);
                kept
            }
            None => node,
        };
        let value = match name {
            "apiVersion" | "kind" if parsed.is_some() => parsed.cloned(),
            "apiVersion" => Some(Node::string(RESOURCE_LIST_API_VERSION).into_ref()),
            "kind" => Some(Node::string(RESOURCE_LIST_KIND).into_ref()),
            "items" => {
                let mut items = Node::sequence();
                if let Some(parsed) = parsed {
                    let parsed = parsed.borrow();
                    if parsed.is_sequence() && (parsed.style != Style::Flow || self.items.is_empty()) {
                        items.style = parsed.style;
                    }
                }
                items.content = self.items.iter().map(|item| item.node().clone()).collect();
                Some(template(items).into_ref())
            }
            "functionConfig" if self.function_config.is_empty() => None,
            "functionConfig" => Some(self.function_config.node().clone()),
            "results" if self.results.is_empty() => None,
            "results" => {
                let results = yaml::value_to_node(&serde_yaml::to_value(&self.results)?);
                Some(template(results).into_ref())
            }
            _ => parsed.cloned(),
        };
        Ok(value)
    }

    /// Sorts the items by apiVersion, kind, namespace and name.
    pub fn sort(&mut self) {
        self.items.sort();
    }

    /// Adds `obj` to the items. An item with the same identity is replaced
    /// when `replace_if_exists` is set and kept otherwise.
    pub fn upsert_object(&mut self, obj: KubeObject, replace_if_exists: bool) {
        let id = obj.id();
        match self.items.iter().position(|item| item.id() == id) {
            Some(i) if replace_if_exists => self.items[i] = obj,
            Some(_) => {}
            None => self.items.push(obj),
        }
    }

    /// Returns the function config, or [`Error::MissingFunctionConfig`] for
    /// a function that cannot run without one.
    pub fn require_function_config(&self) -> Result<&KubeObject> {
        if self.function_config.is_empty() {
            return Err(Error::MissingFunctionConfig);
        }
        Ok(&self.function_config)
    }

    /// Records an error as an error result.
    pub fn log_result(&mut self, err: &Error) {
        self.results.push(FnResult::general(err.to_string(), Severity::Error));
    }

    /// Fails if two items share the same identity.
    pub fn check_resource_duplication(&self) -> Result<()> {
        identity::check_resource_duplication(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INPUT: &str = r#"apiVersion: config.kubernetes.io/v1
kind: ResourceList
# the items
items: # inputs
- apiVersion: v1
  kind: Namespace
  metadata:
    name: example
    annotations:
      config.kubernetes.io/path: ns.yaml
      internal.config.kubernetes.io/path: ns.yaml
- apiVersion: v1
  kind: Namespace
  metadata:
    name: example
    annotations:
      config.kubernetes.io/path: ns2.yaml
      internal.config.kubernetes.io/path: ns2.yaml
results: # earlier stages
- message: foo
  severity: error
- message: bar
  severity: warning
"#;

    #[test]
    fn test_parse_results() {
        let rl = ResourceList::parse(INPUT).unwrap();
        assert_eq!(rl.items.len(), 2);
        assert_eq!(rl.results.len(), 2);
        assert_eq!(rl.results.0[0].message, "foo");
        assert_eq!(rl.results.0[0].severity, Some(Severity::Error));
        assert_eq!(rl.results.0[1].severity, Some(Severity::Warning));
    }

    #[test]
    fn test_check_resource_duplication() {
        let rl = ResourceList::parse(INPUT).unwrap();
        let err = rl.check_resource_duplication().unwrap_err();
        assert_eq!(
            err.to_string(),
            "duplicate Resource(apiVersion=v1, kind=Namespace, Namespace=, Name=example)"
        );
    }

    #[test]
    fn test_round_trip() {
        let rl = ResourceList::parse(INPUT).unwrap();
        assert_eq!(rl.to_yaml().unwrap(), INPUT);
    }

    #[test]
    fn test_top_level_comments_and_fields_are_kept() {
        let input = "# generated\napiVersion: config.kubernetes.io/v1\nkind: ResourceList\n# the items\nitems: # inputs\n- apiVersion: v1\n  kind: ConfigMap\n  metadata:\n    name: cm\nfunctionConfig: # settings\n  apiVersion: v1\n  kind: ConfigMap\n  data:\n    a: b\nextra: kept # unknown field\n";
        let mut rl = ResourceList::parse(input).unwrap();
        assert_eq!(rl.to_yaml().unwrap(), input);

        rl.items.clear();
        rl.results.warning("nothing left");
        assert_eq!(
            rl.to_yaml().unwrap(),
            "# generated\napiVersion: config.kubernetes.io/v1\nkind: ResourceList\n# the items\nitems: [] # inputs\nfunctionConfig: # settings\n  apiVersion: v1\n  kind: ConfigMap\n  data:\n    a: b\nextra: kept # unknown field\nresults:\n- message: nothing left\n  severity: warning\n"
        );
    }

    #[test]
    fn test_missing_function_config_is_empty() {
        let mut rl = ResourceList::parse("apiVersion: config.kubernetes.io/v1\nkind: ResourceList\nitems: []\n").unwrap();
        let fc = &rl.function_config;
        assert!(fc.is_empty());
        assert_eq!(fc.kind(), "");
        assert_eq!(fc.api_version(), "");
        assert_eq!(fc.name(), "");
        assert_eq!(fc.annotation("x"), "");
        fc.set_kind("X").unwrap();
        assert_eq!(fc.kind(), "X");
        rl.results.info("done");
        assert_eq!(
            rl.to_yaml().unwrap(),
            "apiVersion: config.kubernetes.io/v1\nkind: ResourceList\nitems: []\nfunctionConfig:\n  kind: X\nresults:\n- message: done\n  severity: info\n"
        );
    }

    #[test]
    fn test_require_function_config() {
        let rl = ResourceList::parse("apiVersion: config.kubernetes.io/v1\nkind: ResourceList\nitems: []\n").unwrap();
        assert!(matches!(rl.require_function_config(), Err(Error::MissingFunctionConfig)));
        let rl = ResourceList::parse(
            "apiVersion: config.kubernetes.io/v1\nkind: ResourceList\nitems: []\nfunctionConfig:\n  kind: X\n",
        )
        .unwrap();
        assert_eq!(rl.require_function_config().unwrap().kind(), "X");
    }

    #[test]
    fn test_rejects_other_kinds() {
        assert!(ResourceList::parse("apiVersion: v1\nkind: List\nitems: []\n").is_err());
        assert!(ResourceList::parse("kind: ResourceList\n---\nkind: ResourceList\n").is_err());
        assert!(ResourceList::parse("kind: [").is_err());
    }

    #[test]
    fn test_upsert_object() {
        let mut rl = ResourceList::new();
        let cm = KubeObject::parse("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n").unwrap();
        rl.upsert_object(cm.clone(), false);
        let replacement = KubeObject::parse("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  a: b\n").unwrap();
        rl.upsert_object(replacement.clone(), false);
        assert_eq!(rl.items.len(), 1);
        assert!(rl.items[0].get_node(&["data"]).unwrap().is_none());
        rl.upsert_object(replacement, true);
        assert_eq!(rl.items.len(), 1);
        assert_eq!(rl.items[0].nested_string(&["data", "a"]).unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_wide_sequences_are_kept() {
        let input = "apiVersion: config.kubernetes.io/v1\nkind: ResourceList\nitems:\n  - apiVersion: v1\n    kind: ConfigMap\n    metadata:\n      name: cm\n";
        let rl = ResourceList::parse(input).unwrap();
        assert_eq!(rl.to_yaml().unwrap(), input);
    }
}
