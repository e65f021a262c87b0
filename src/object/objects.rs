//! Ordered collections of objects.

use std::ops::{Deref, DerefMut};

use crate::error::{Error, Result};

use super::KubeObject;

/// KubeObjects is an ordered list of object handles.
///
/// Filtering returns new lists of handles over the same documents, so edits
/// made through a filtered list are visible in the original one.
#[derive(Debug, Clone, Default)]
pub struct KubeObjects(Vec<KubeObject>);

impl KubeObjects {
    pub fn new() -> Self {
        KubeObjects(Vec::new())
    }

    /// Returns the objects matching `predicate`.
    pub fn where_<P>(&self, predicate: P) -> KubeObjects
    where
        P: Fn(&KubeObject) -> bool,
    {
        self.0.iter().filter(|o| predicate(*o)).cloned().collect()
    }

    /// Returns the objects not matching `predicate`.
    pub fn where_not<P>(&self, predicate: P) -> KubeObjects
    where
        P: Fn(&KubeObject) -> bool,
    {
        self.where_(|o| !predicate(o))
    }

    /// Sorts by apiVersion, kind, namespace and name. The sort is stable.
    pub fn sort(&mut self) {
        self.0.sort_by_cached_key(|o| (o.api_version(), o.kind(), o.namespace(), o.name()));
    }

    pub fn push(&mut self, object: KubeObject) {
        self.0.push(object);
    }

    pub fn first(&self) -> Option<&KubeObject> {
        self.0.first()
    }

    /// Returns the only object of the list, failing if there are none or
    /// more than one.
    pub fn ensure_single_item(&self) -> Result<&KubeObject> {
        match self.0.as_slice() {
            [only] => Ok(only),
            others => Err(Error::parse(format!("expected exactly one object, got {}", others.len()))),
        }
    }

    pub fn into_inner(self) -> Vec<KubeObject> {
        self.0
    }
}

impl Deref for KubeObjects {
    type Target = Vec<KubeObject>;

    fn deref(&self) -> &Vec<KubeObject> {
        &self.0
    }
}

impl DerefMut for KubeObjects {
    fn deref_mut(&mut self) -> &mut Vec<KubeObject> {
        &mut self.0
    }
}

impl FromIterator<KubeObject> for KubeObjects {
    fn from_iter<T: IntoIterator<Item = KubeObject>>(iter: T) -> Self {
        KubeObjects(iter.into_iter().collect())
    }
}

impl From<Vec<KubeObject>> for KubeObjects {
    fn from(objects: Vec<KubeObject>) -> Self {
        KubeObjects(objects)
    }
}

impl IntoIterator for KubeObjects {
    type Item = KubeObject;
    type IntoIter = std::vec::IntoIter<KubeObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a KubeObjects {
    type Item = &'a KubeObject;
    type IntoIter = std::slice::Iter<'a, KubeObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::selector::{has_labels, is_gvk, is_name};

    fn objects() -> KubeObjects {
        [
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: b\n",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: b\n  labels:\n    app: web\n",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: a\n",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n  namespace: x\n",
        ]
        .iter()
        .map(|s| KubeObject::parse(s).unwrap())
        .collect()
    }

    #[test]
    fn test_sort() {
        let mut objects = objects();
        objects.sort();
        let order: Vec<String> = objects.iter().map(|o| format!("{}/{}", o.kind(), o.name())).collect();
        assert_eq!(order, vec!["Deployment/a", "Deployment/b", "ConfigMap/a", "Service/b"]);
    }

    #[test]
    fn test_where_shares_documents() {
        let objects = objects();
        let deployments = objects.where_(is_gvk("apps", "v1", "Deployment"));
        assert_eq!(deployments.len(), 2);
        deployments[0].set_name("renamed").unwrap();
        assert_eq!(objects[1].name(), "renamed");

        let others = objects.where_not(is_gvk("apps", "", "Deployment"));
        assert_eq!(others.len(), 2);
    }

    #[test]
    fn test_compose_predicates() {
        let objects = objects();
        let web = objects
            .where_(is_gvk("", "", "Deployment"))
            .where_(has_labels([("app", "web")]));
        assert_eq!(web.len(), 1);
        assert!(web.ensure_single_item().is_ok());
        assert!(objects.where_(is_name("a")).ensure_single_item().is_err());
    }
}
