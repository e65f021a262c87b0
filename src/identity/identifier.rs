use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const SEPARATOR: char = '|';

/// ResourceIdentifier identifies a resource by group, kind, namespace and
/// name. Its string form is `group|kind|namespace|name`, for example
/// `|ConfigMap|default|cm` for a core group ConfigMap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentifier {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid resource identifier {0:?}: expected group|kind|namespace|name")]
pub struct ParseIdentifierError(pub String);

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.group,
            self.kind,
            self.namespace,
            self.name,
            sep = SEPARATOR
        )
    }
}

impl FromStr for ResourceIdentifier {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(SEPARATOR).collect::<Vec<_>>().as_slice() {
            [group, kind, namespace, name] => Ok(ResourceIdentifier {
                group: group.to_string(),
                version: String::new(),
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            _ => Err(ParseIdentifierError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_form() {
        let id: ResourceIdentifier = "|ConfigMap|example|example".parse().unwrap();
        assert_eq!(id.kind, "ConfigMap");
        assert_eq!(id.group, "");
        assert_eq!(id.to_string(), "|ConfigMap|example|example");
        assert!("ConfigMap|example".parse::<ResourceIdentifier>().is_err());
        assert!("a|b|c|d|e".parse::<ResourceIdentifier>().is_err());
    }
}
