//! Structured results reported by functions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::KubeObject;

/// Severity of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Reference to the resource a result is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl ResourceRef {
    pub fn from_object(obj: &KubeObject) -> Self {
        ResourceRef {
            api_version: obj.api_version(),
            kind: obj.kind(),
            name: obj.name(),
            namespace: obj.namespace(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.api_version, &self.kind, &self.namespace, &self.name]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect();
        f.write_str(&parts.join("/"))
    }
}

/// Field a result is about, with optional current and proposed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_value: Option<serde_yaml::Value>,
}

/// File a result is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct File {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub index: i64,
}

fn is_zero(i: &i64) -> bool {
    *i == 0
}

/// Result is one diagnostic reported by a function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Result {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ref: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<File>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl Result {
    /// A result not tied to any resource.
    pub fn general(message: impl Into<String>, severity: Severity) -> Self {
        Result {
            message: message.into(),
            severity: Some(severity),
            ..Default::default()
        }
    }

    /// A result about a whole resource.
    pub fn config_object(message: impl Into<String>, severity: Severity, obj: &KubeObject) -> Self {
        let path = obj.path_annotation();
        Result {
            resource_ref: Some(ResourceRef::from_object(obj)),
            file: (!path.is_empty()).then(|| File {
                path,
                index: obj.index_annotation().max(0),
            }),
            ..Result::general(message, severity)
        }
    }

    /// A result about one field of a resource.
    pub fn config_field(message: impl Into<String>, severity: Severity, obj: &KubeObject, field: Field) -> Self {
        Result {
            field: Some(field),
            ..Result::config_object(message, severity, obj)
        }
    }

    /// Severity used for display and ordering. A missing severity counts as
    /// info.
    pub fn effective_severity(&self) -> Severity {
        self.severity.unwrap_or(Severity::Info)
    }

    fn sort_key(&self) -> (std::cmp::Reverse<Severity>, Option<&ResourceRef>, Option<&str>, Option<&File>, &str) {
        (
            std::cmp::Reverse(self.effective_severity()),
            self.resource_ref.as_ref(),
            self.field.as_ref().map(|f| f.path.as_str()),
            self.file.as_ref(),
            self.message.as_str(),
        )
    }
}

impl fmt::Display for Result {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.effective_severity())?;
        if let Some(resource_ref) = &self.resource_ref {
            let id = resource_ref.to_string();
            if !id.is_empty() {
                write!(f, " {}", id)?;
            }
        }
        if let Some(field) = &self.field {
            write!(f, " {}", field.path)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Results is an ordered list of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Results(pub Vec<Result>);

impl Results {
    pub fn new() -> Self {
        Results(Vec::new())
    }

    pub fn push(&mut self, result: Result) {
        self.0.push(result);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Result::general(message, Severity::Info));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Result::general(message, Severity::Warning));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Result::general(message, Severity::Error));
    }

    /// Records an error value as an error result.
    pub fn error_e(&mut self, err: &dyn std::error::Error) {
        self.error(err.to_string());
    }

    pub fn warning_e(&mut self, err: &dyn std::error::Error) {
        self.warning(err.to_string());
    }

    pub fn extend(&mut self, other: Results) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Result> {
        self.0.iter()
    }

    /// Returns true if any result has error severity.
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|r| r.severity == Some(Severity::Error))
    }

    /// Returns 1 if any result has error severity, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_errors())
    }

    /// Orders errors first, then warnings, then infos. Results of equal
    /// severity are ordered by resource, field, file and message; ties keep
    /// their relative order.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }
}

impl fmt::Display for Results {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, result) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n---\n")?;
            }
            write!(f, "{}", result)?;
        }
        Ok(())
    }
}

impl std::error::Error for Results {}

impl<'a> IntoIterator for &'a Results {
    type Item = &'a Result;
    type IntoIter = std::slice::Iter<'a, Result>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn deployment() -> KubeObject {
        KubeObject::parse(
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: nginx\n  namespace: web\n  annotations:\n    config.kubernetes.io/path: deploy.yaml\n",
        )
        .unwrap()
    }

    #[test]
    fn test_display() {
        let obj = deployment();
        let field = Field {
            path: "spec.replicas".to_string(),
            ..Default::default()
        };
        let mut results = Results::new();
        results.push(Result::config_field("too many", Severity::Warning, &obj, field));
        results.push(Result {
            message: "no severity".to_string(),
            ..Default::default()
        });
        assert_eq!(
            results.to_string(),
            "[warning] apps/v1/Deployment/web/nginx spec.replicas: too many\n---\n[info]: no severity"
        );
    }

    #[test]
    fn test_sort_by_severity_then_identity() {
        let obj = deployment();
        let mut results = Results::new();
        results.info("b");
        results.push(Result::config_object("z", Severity::Error, &obj));
        results.warning("w");
        results.error("a");
        results.info("a");
        results.sort();
        let order: Vec<String> = results.iter().map(|r| format!("{}:{}", r.effective_severity(), r.message)).collect();
        assert_eq!(order, vec!["error:a", "error:z", "warning:w", "info:a", "info:b"]);
    }

    #[test]
    fn test_exit_code() {
        let mut results = Results::new();
        results.warning("w");
        assert_eq!(results.exit_code(), 0);
        results.error("e");
        assert_eq!(results.exit_code(), 1);
    }

    #[test]
    fn test_config_object_file() {
        let result = Result::config_object("m", Severity::Info, &deployment());
        assert_eq!(
            result.file,
            Some(File {
                path: "deploy.yaml".to_string(),
                index: 0
            })
        );
    }
}
