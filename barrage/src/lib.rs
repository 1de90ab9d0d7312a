#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
pub mod gate;
pub mod issuer;
pub mod scenario;
pub(crate) mod transaction;

pub use barrage_core as core;
pub use error::Error;
pub use gate::{Gate, GatePermit};
pub use issuer::{IssuerConfig, RequestIssuer, RequestTemplate};
pub use reqwest::{header, Method};
pub use scenario::{ConfigurableLoadTest, LoadTest};

pub mod prelude {
    pub use crate::issuer::{IssuerConfig, RequestIssuer, RequestTemplate};
    pub use crate::scenario::{ConfigurableLoadTest, LoadTest};
    pub use barrage_core::{Assessment, Outcome, PerformanceResult, Rating, SessionSummary};
    pub use std::num::NonZeroU32;
}
