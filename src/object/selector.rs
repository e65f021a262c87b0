//! Predicates for [`KubeObjects::where_`](super::KubeObjects::where_).

use super::KubeObject;

/// Matches group, version and kind; blank arguments match anything.
pub fn is_gvk<'a>(group: &'a str, version: &'a str, kind: &'a str) -> impl Fn(&KubeObject) -> bool + 'a {
    move |o| o.is_gvk(group, version, kind)
}

pub fn is_name(name: &str) -> impl Fn(&KubeObject) -> bool + '_ {
    move |o| o.name() == name
}

pub fn is_namespace(namespace: &str) -> impl Fn(&KubeObject) -> bool + '_ {
    move |o| o.namespace() == namespace
}

/// Matches objects carrying every given label.
pub fn has_labels<'a, I>(labels: I) -> impl Fn(&KubeObject) -> bool + 'a
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let labels: Vec<(&str, &str)> = labels.into_iter().collect();
    move |o| {
        let actual = o.labels();
        labels.iter().all(|(k, v)| actual.get(*k).map(String::as_str) == Some(*v))
    }
}

/// Matches objects carrying every given annotation.
pub fn has_annotations<'a, I>(annotations: I) -> impl Fn(&KubeObject) -> bool + 'a
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let annotations: Vec<(&str, &str)> = annotations.into_iter().collect();
    move |o| {
        let actual = o.annotations();
        annotations.iter().all(|(k, v)| actual.get(*k).map(String::as_str) == Some(*v))
    }
}

pub fn is_local_config(o: &KubeObject) -> bool {
    o.is_local_config()
}

pub fn is_meta_resource(o: &KubeObject) -> bool {
    o.is_meta_resource()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_and_local_config() {
        let obj = KubeObject::parse(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n  namespace: ns\n  annotations:\n    config.kubernetes.io/local-config: \"true\"\n",
        )
        .unwrap();
        assert!(has_annotations([("config.kubernetes.io/local-config", "true")])(&obj));
        assert!(!has_annotations([("config.kubernetes.io/local-config", "false")])(&obj));
        assert!(is_local_config(&obj));
        assert!(is_namespace("ns")(&obj));
        assert!(!is_meta_resource(&obj));

        let kptfile = KubeObject::parse("apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: pkg\n").unwrap();
        assert!(is_meta_resource(&kptfile));
        assert!(!is_local_config(&kptfile));
    }
}
