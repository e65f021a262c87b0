//! Runner: a function whose configuration is decoded into a typed value.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::{debug, info_span};

use crate::error::{Error, Result};
use crate::object::{parse_api_version, short_type_name, KubeObject, KubeObjects};
use crate::typed;
use crate::yaml::Node;

use super::{ResourceList, ResourceListProcessor, Results};

/// Group of typed function configurations.
pub const FN_CONFIG_GROUP: &str = "fn.kpt.dev";

/// Runner is a transformer or validator configured through the
/// functionConfig.
///
/// The configuration is decoded into `Self` from either a `ConfigMap`
/// (its `data` map) or an object of kind [`Runner::KIND`] in the
/// `fn.kpt.dev` group. Items can be edited but not added or removed.
pub trait Runner: DeserializeOwned + Default {
    /// Kind of the typed functionConfig.
    const KIND: &'static str;

    /// Runs the function and returns whether it passed.
    fn run(&mut self, ctx: &Context, function_config: &KubeObject, items: &KubeObjects, results: &mut Results) -> bool;
}

/// Context of a single function invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub function: String,
    started: Instant,
}

impl Context {
    pub fn new(function: &str) -> Self {
        Context {
            function: function.to_string(),
            started: Instant::now(),
        }
    }

    /// Time since the function started.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}

/// Adapts a [`Runner`] into a [`ResourceListProcessor`].
#[derive(Debug, Default)]
pub struct RunnerProcessor<R> {
    runner: Option<R>,
}

impl<R: Runner> RunnerProcessor<R> {
    pub fn new() -> Self {
        RunnerProcessor { runner: None }
    }

    /// Returns the runner built from the last processed functionConfig.
    pub fn runner(&self) -> Option<&R> {
        self.runner.as_ref()
    }

    fn config(&self, fc: &KubeObject, results: &mut Results) -> Option<R> {
        let is_config_map = fc.is_gvk("", "", "ConfigMap") && parse_api_version(&fc.api_version()).0.is_empty();
        if fc.is_empty() {
            results.info("`FunctionConfig` is not given");
            return Some(R::default());
        }
        if is_config_map {
            let data = match fc.nested_string_map(&["data"]) {
                Ok(data) => data.unwrap_or_default(),
                Err(err) => {
                    results.error_e(&err);
                    return None;
                }
            };
            if data.is_empty() {
                results.info("`FunctionConfig` is not given");
                return Some(R::default());
            }
            return match decode_data::<R>(&data) {
                Ok(runner) => Some(runner),
                Err(err) => {
                    results.error_e(&err);
                    None
                }
            };
        }
        if fc.is_group_kind(FN_CONFIG_GROUP, R::KIND) {
            return match fc.as_typed::<R>() {
                Ok(runner) => Some(runner),
                Err(err) => {
                    results.error_e(&err);
                    None
                }
            };
        }
        let api_version = fc.api_version();
        let (group, _) = parse_api_version(&api_version);
        results.error(format!(
            "unknown FunctionConfig `{}.{}`, expect `{}.{}` or `ConfigMap.v1`",
            fc.kind(),
            group,
            R::KIND,
            FN_CONFIG_GROUP
        ));
        None
    }
}

fn decode_data<R: DeserializeOwned>(data: &BTreeMap<String, String>) -> Result<R> {
    let mut node = Node::mapping();
    for (k, v) in data {
        node.push_entry(k, Node::string(v).into_ref());
    }
    typed::decode(&node).map_err(Error::parse)
}

impl<R: Runner> ResourceListProcessor for RunnerProcessor<R> {
    fn process(&mut self, rl: &mut ResourceList) -> Result<bool> {
        let function = short_type_name::<R>();
        let span = info_span!("runner", function = %function);
        let _guard = span.enter();

        let mut results = Results::new();
        let Some(mut runner) = self.config(&rl.function_config, &mut results) else {
            rl.results.extend(results);
            return Ok(false);
        };
        let ctx = Context::new(&function);
        let pass = runner.run(&ctx, &rl.function_config, &rl.items, &mut results);
        debug!(pass, elapsed = ?ctx.elapsed(), "runner finished");
        rl.results.extend(results);
        self.runner = Some(runner);
        Ok(pass)
    }
}
