//! The ResourceList wire format and the function pipeline around it.

pub mod provenance;
mod resource_list;
mod result;
mod run;
mod runner;

#[cfg(test)]
mod run_test;

pub use resource_list::*;
pub use result::{Field, File, ResourceRef, Result, Results, Severity};
pub use run::*;
pub use runner::*;
