//! End-to-end pipeline tests.

use pretty_assertions::assert_eq;

use super::*;
use crate::error::Error;
use crate::object::selector::is_gvk;

const INPUT: &str = r#"apiVersion: config.kubernetes.io/v1
kind: ResourceList
items:
# the web tier
- apiVersion: apps/v1
  kind: Deployment
  metadata:
    name: nginx # frontend
    labels:
      app: nginx
  spec:
    replicas: 3 # scaled by the function
    template:
      spec:
        containers:
        - name: nginx
          image: nginx:1.14.2
- apiVersion: v1
  kind: Service
  metadata:
    name: nginx
functionConfig:
  apiVersion: v1
  kind: ConfigMap
  metadata:
    name: config
  data:
    replicas: "5"
results:
- message: earlier stage
  severity: info
"#;

fn set_replicas(rl: &mut ResourceList) -> crate::error::Result<bool> {
    let replicas: i64 = rl
        .function_config
        .nested_string(&["data", "replicas"])?
        .unwrap_or_default()
        .parse()
        .map_err(|e| Error::InvalidFunctionConfig(format!("replicas: {e}")))?;
    for deployment in rl.items.where_(is_gvk("apps", "", "Deployment")).iter() {
        deployment.set(&replicas, &["spec", "replicas"])?;
        rl.results.push(Result::config_object(
            format!("set replicas to {replicas}"),
            Severity::Info,
            deployment,
        ));
    }
    Ok(true)
}

#[test]
fn test_set_replicas_end_to_end() {
    let (out, outcome) = run(&mut set_replicas, INPUT.as_bytes());
    outcome.unwrap();
    let expected = INPUT.replace("replicas: 3 #", "replicas: 5 #").replace(
        "- message: earlier stage\n  severity: info\n",
        "- message: earlier stage\n  severity: info\n- message: set replicas to 5\n  severity: info\n  resourceRef:\n    apiVersion: apps/v1\n    kind: Deployment\n    name: nginx\n",
    );
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn test_unmodified_round_trip() {
    let (out, outcome) = run(&mut |_: &mut ResourceList| -> crate::error::Result<bool> { Ok(true) }, INPUT.as_bytes());
    outcome.unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), INPUT);
}

#[test]
fn test_parse_failure_writes_nothing() {
    let (out, outcome) = run(&mut |_: &mut ResourceList| -> crate::error::Result<bool> { Ok(true) }, b"apiVersion: v1\nkind: Pod\n");
    assert!(out.is_empty());
    assert!(matches!(outcome, Err(Error::Parse(_))));
}

#[test]
fn test_or_die_panic_becomes_result() {
    let mut fails = |rl: &mut ResourceList| -> crate::error::Result<bool> {
        let image: i64 = rl.items[0]
            .get_or_die(&["spec", "template", "spec", "containers", "name=nginx", "image"])
            .unwrap_or_default();
        rl.results.info(format!("image {image}"));
        Ok(true)
    };
    let (out, outcome) = run(&mut fails, INPUT.as_bytes());
    let err = outcome.unwrap_err();
    assert!(matches!(err, Error::KubeObjectFields(_)));
    let rl = ResourceList::parse(std::str::from_utf8(&out).unwrap()).unwrap();
    let last = rl.results.iter().last().unwrap();
    assert_eq!(last.severity, Some(Severity::Error));
    assert!(last.message.contains("fieldpath .spec.template.spec.containers[name=nginx].image"));
    assert_eq!(rl.results.len(), 2);
}

#[test]
fn test_sub_object_panic_becomes_result() {
    let mut fails = |rl: &mut ResourceList| -> crate::error::Result<bool> {
        let spec = rl.items[0].get_map_or_die("spec").unwrap();
        spec.get_bool_or_die("replicas");
        Ok(true)
    };
    let (out, outcome) = run(&mut fails, INPUT.as_bytes());
    assert!(matches!(outcome, Err(Error::SubObjectFields(_))));
    assert!(!out.is_empty());
}

#[test]
#[should_panic(expected = "genuine bug")]
fn test_other_panics_propagate() {
    let mut fails = |_: &mut ResourceList| -> crate::error::Result<bool> { panic!("genuine bug") };
    let _ = run(&mut fails, INPUT.as_bytes());
}

#[test]
fn test_function_failure() {
    let mut fails = |rl: &mut ResourceList| -> crate::error::Result<bool> {
        rl.results.error("bad input");
        Ok(false)
    };
    let (out, outcome) = run(&mut fails, INPUT.as_bytes());
    assert!(matches!(outcome, Err(Error::FunctionFailure)));
    assert_eq!(outcome.unwrap_err().to_string(), "error: function failure");
    let rl = ResourceList::parse(std::str::from_utf8(&out).unwrap()).unwrap();
    assert_eq!(rl.results.exit_code(), 1);
}

#[test]
fn test_returned_error_is_logged() {
    let mut fails = |rl: &mut ResourceList| -> crate::error::Result<bool> {
        rl.items[1].set_annotation(crate::identity::UPSTREAM_IDENTIFIER, "x")?;
        Ok(true)
    };
    let (out, outcome) = run(&mut fails, INPUT.as_bytes());
    assert!(outcome.unwrap_err().is_upstream_identifier_violation());
    let rl = ResourceList::parse(std::str::from_utf8(&out).unwrap()).unwrap();
    assert_eq!(rl.results.len(), 2);
}

#[test]
fn test_execute_writes_output() {
    let mut out = Vec::new();
    execute(&mut |_: &mut ResourceList| -> crate::error::Result<bool> { Ok(true) }, INPUT.as_bytes(), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), INPUT);
}
