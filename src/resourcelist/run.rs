//! Pipeline driver: parse, process, serialize.

use std::any::Any;
use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::object::{KubeObjectFieldsError, SubObjectFieldsError};

use super::ResourceList;

/// ResourceListProcessor transforms or validates a ResourceList in place.
///
/// `Ok(true)` means the function passed and `Ok(false)` that it failed and
/// described why in `rl.results`. `Err` aborts the function; the error is
/// recorded as a result and the ResourceList is still written out.
pub trait ResourceListProcessor {
    fn process(&mut self, rl: &mut ResourceList) -> Result<bool>;
}

impl<F> ResourceListProcessor for F
where
    F: FnMut(&mut ResourceList) -> Result<bool>,
{
    fn process(&mut self, rl: &mut ResourceList) -> Result<bool> {
        self(rl)
    }
}

/// Turns a panic raised by an `*_or_die` accessor back into its error.
/// Any other panic is resumed.
fn recover(payload: Box<dyn Any + Send>) -> Error {
    let payload = match payload.downcast::<KubeObjectFieldsError>() {
        Ok(err) => return Error::KubeObjectFields(*err),
        Err(payload) => payload,
    };
    match payload.downcast::<SubObjectFieldsError>() {
        Ok(err) => Error::SubObjectFields(*err),
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Runs `processor` on a serialized ResourceList and returns the serialized
/// output together with the outcome.
///
/// Output is empty only when the input cannot be parsed or the result
/// cannot be serialized; otherwise it is produced even if the function
/// failed, so downstream tools can read the results.
pub fn run<P>(processor: &mut P, input: &[u8]) -> (Vec<u8>, Result<()>)
where
    P: ResourceListProcessor + ?Sized,
{
    let input = match std::str::from_utf8(input) {
        Ok(input) => input,
        Err(err) => return (Vec::new(), Err(Error::parse(err))),
    };
    let mut rl = match ResourceList::parse(input) {
        Ok(rl) => rl,
        Err(err) => return (Vec::new(), Err(err)),
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| processor.process(&mut rl)))
        .unwrap_or_else(|payload| {
            let err = recover(payload);
            warn!(%err, "recovered from field error");
            Err(err)
        });
    let outcome = match outcome {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::FunctionFailure),
        Err(err) => {
            if !err.is_field_error() {
                warn!(%err, "function returned an error");
            }
            rl.log_result(&err);
            Err(err)
        }
    };
    debug!(results = rl.results.len(), ok = outcome.is_ok(), "function finished");

    match rl.to_yaml() {
        Ok(out) => (out.into_bytes(), outcome),
        Err(err) => (Vec::new(), Err(err)),
    }
}

/// Reads a ResourceList from `reader`, runs `processor` and writes the
/// result to `writer`.
pub fn execute<P, R, W>(processor: &mut P, mut reader: R, mut writer: W) -> Result<()>
where
    P: ResourceListProcessor + ?Sized,
    R: Read,
    W: Write,
{
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;
    let (out, outcome) = run(processor, &input);
    writer.write_all(&out)?;
    writer.flush()?;
    outcome
}

/// Runs `processor` as a KRM function: stdin to stdout.
pub fn as_main<P>(processor: &mut P) -> Result<()>
where
    P: ResourceListProcessor + ?Sized,
{
    execute(processor, io::stdin().lock(), io::stdout().lock())
}
