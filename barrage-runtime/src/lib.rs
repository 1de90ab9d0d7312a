//! Command line front end for barrage: pre-flight check, default scenario suites and reporting.
pub mod report;
pub mod runtime;
pub mod suite;

mod error;

pub use crate::error::RuntimeError;
pub use crate::report::{Session, TextReport};
pub use crate::runtime::BarrageRuntime;
pub use crate::suite::{Scenario, Suite};
