#![cfg_attr(docsrs, feature(doc_cfg))]

mod assessment;
mod config;
mod constants;
mod data;
mod stats;

pub use assessment::*;
pub use config::*;
pub use constants::*;
pub use data::*;
pub use stats::*;
