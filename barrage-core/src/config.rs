use crate::{DEFAULT_CONCURRENCY, DEFAULT_REQUESTS_PER_USER};
#[cfg(feature = "rt")]
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
#[cfg(feature = "rt")]
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::num::NonZeroU32;
use std::time::Duration;

/// How a run decides when it is finished.
///
/// A run is either bounded by a request count or by wall-clock time, never both.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "rt", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "rt", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "rt", serde(rename_all = "snake_case"))]
pub enum LoadMode {
    /// Every user issues `requests_per_user` requests, then the run ends.
    Batch { requests_per_user: usize },

    /// Requests are issued continuously until `duration` has elapsed.
    Sustained {
        #[cfg_attr(feature = "rt", serde_as(as = "DurationSecondsWithFrac<f64>"))]
        duration: Duration,
    },
}

#[doc(hidden)]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "rt", derive(Serialize, Deserialize))]
pub struct RunConfig {
    pub name: String,
    /// Gate capacity for batch runs, pool size for sustained runs.
    pub concurrency: usize,
    pub mode: LoadMode,
    pub tps_limit: Option<NonZeroU32>,
}

impl RunConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            mode: LoadMode::Batch {
                requests_per_user: DEFAULT_REQUESTS_PER_USER,
            },
            tps_limit: None,
        }
    }

    /// Number of requests a batch run will issue. `None` for sustained runs.
    pub fn total_requests(&self) -> Option<usize> {
        match self.mode {
            LoadMode::Batch { requests_per_user } => {
                Some(self.concurrency.saturating_mul(requests_per_user))
            }
            LoadMode::Sustained { .. } => None,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self.mode {
            LoadMode::Sustained { duration } => Some(duration),
            LoadMode::Batch { .. } => None,
        }
    }
}
