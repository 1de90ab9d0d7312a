//! Default scenario suites
//!
//! The suites exercise the health check, PDA analysis, analytics and listing endpoints of the
//! target service.
use barrage::core::{LoadMode, DEFAULT_POOL_SIZE};
use barrage::prelude::*;
use serde_json::{json, Value};
use std::time::Duration;

/// Placeholder address used for every single-address analysis request
pub const SYSTEM_ADDRESS: &str = "11111111111111111111111111111111";

/// One named load test of a suite.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: Option<&'static str>,
    pub template: RequestTemplate,
    pub concurrency: usize,
    pub mode: LoadMode,
}

impl Scenario {
    fn batch(
        name: &'static str,
        template: RequestTemplate,
        concurrency: usize,
        requests_per_user: usize,
    ) -> Self {
        Self {
            name: Some(name),
            template,
            concurrency,
            mode: LoadMode::Batch { requests_per_user },
        }
    }

    /// Build the load test for this scenario against `issuer`.
    pub fn load(&self, issuer: &RequestIssuer, tps: Option<NonZeroU32>) -> LoadTest {
        let test = issuer
            .load(self.template.clone())
            .concurrency(self.concurrency);

        let test = match self.mode {
            LoadMode::Batch { requests_per_user } => test.requests_per_user(requests_per_user),
            LoadMode::Sustained { duration } => test.duration(duration),
        };
        let test = match self.name {
            Some(name) => test.name(name),
            None => test,
        };
        match tps {
            Some(tps) => test.tps(tps),
            None => test,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// Health check and PDA analysis only, at reduced load
    Quick,

    /// Every endpoint, scaled from the configured users and requests
    Full { users: usize, requests: usize },

    /// Continuous health checks for `duration`
    Sustained { duration: Duration },
}

impl Suite {
    pub fn scenarios(&self) -> Vec<Scenario> {
        match *self {
            Suite::Quick => vec![
                Scenario::batch("Health Endpoint Load Test", health(), 20, 5),
                Scenario::batch("PDA Analysis Load Test", pda_analysis(), 10, 3),
            ],
            Suite::Full { users, requests } => vec![
                Scenario::batch("Health Endpoint Load Test", health(), users, requests),
                Scenario::batch(
                    "PDA Analysis Load Test",
                    pda_analysis(),
                    users.min(20),
                    requests.min(5),
                ),
                Scenario::batch(
                    "Batch Analysis Load Test",
                    batch_analysis(5),
                    users.min(10),
                    requests.min(3),
                ),
                Scenario::batch(
                    "Database Queries Load Test",
                    RequestTemplate::get("/api/v1/analytics/database"),
                    users.min(30),
                    requests,
                ),
                Scenario::batch(
                    "List Endpoints Load Test",
                    RequestTemplate::get("/api/v1/programs?limit=20"),
                    users.min(25),
                    requests,
                ),
                Scenario::batch("Memory Usage Load Test", batch_analysis(100), 5, 3),
            ],
            Suite::Sustained { duration } => vec![Scenario {
                name: None,
                template: health(),
                concurrency: DEFAULT_POOL_SIZE,
                mode: LoadMode::Sustained { duration },
            }],
        }
    }
}

fn health() -> RequestTemplate {
    RequestTemplate::get("/health")
}

fn pda_analysis() -> RequestTemplate {
    RequestTemplate::post("/api/v1/analyze/pda").json(json!({
        "address": SYSTEM_ADDRESS,
        "program_id": SYSTEM_ADDRESS,
    }))
}

fn batch_analysis(count: usize) -> RequestTemplate {
    let pdas: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "address": format!("{i:044}"),
                "program_id": SYSTEM_ADDRESS,
            })
        })
        .collect();

    RequestTemplate::post("/api/v1/analyze/pda/batch").json(json!({ "pdas": pdas }))
}
