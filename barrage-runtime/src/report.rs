//! Session reporting
//!
//! A finished [`Session`] renders either as a plain text report through [`TextReport`] or as a
//! single JSON document through [`Session::to_json`].
use crate::error::RuntimeError;
use barrage::core::{Assessment, PerformanceResult, Rating, SessionSummary};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

const RULE_WIDTH: usize = 60;

/// Every result of one invocation together with the totals across them.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub results: Vec<PerformanceResult>,
    pub summary: SessionSummary,
}

impl Session {
    pub fn new(results: Vec<PerformanceResult>) -> Self {
        let summary = SessionSummary::new(&results);
        Self { results, summary }
    }

    pub fn passed(&self) -> bool {
        self.summary.passed()
    }

    pub fn to_json(&self) -> Result<String, RuntimeError> {
        #[derive(Serialize)]
        struct Entry<'a> {
            #[serde(flatten)]
            result: &'a PerformanceResult,
            success_rate: f64,
            assessment: Assessment,
        }

        #[derive(Serialize)]
        struct Document<'a> {
            results: Vec<Entry<'a>>,
            summary: &'a SessionSummary,
            passed: bool,
        }

        let document = Document {
            results: self
                .results
                .iter()
                .map(|result| Entry {
                    result,
                    success_rate: result.success_rate(),
                    assessment: Assessment::of(result),
                })
                .collect(),
            summary: &self.summary,
            passed: self.passed(),
        };

        Ok(serde_json::to_string_pretty(&document)?)
    }
}

/// Plain text rendering of a [`Session`]: one block per result, then the overall summary.
pub struct TextReport<'a>(pub &'a Session);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = &self.0.summary;

        for result in &self.0.results {
            write_result(f, result)?;
            writeln!(f)?;
        }

        banner(f, "OVERALL PERFORMANCE SUMMARY")?;
        writeln!(f, "Total Tests:          {}", summary.total_tests)?;
        writeln!(f, "Total Requests:       {}", summary.total_requests)?;
        writeln!(f, "Total Successful:     {}", summary.total_successful)?;
        writeln!(f, "Overall Success Rate: {:.1}%", summary.success_rate)?;
        if summary.total_tests > 0 {
            writeln!(f, "Average RPS:          {:.2}", summary.avg_requests_per_second)?;
            writeln!(f, "Average Response:     {:.2}ms", millis(summary.avg_latency))?;
        }
        if self.0.passed() {
            writeln!(f, "Overall performance is GOOD")?;
        } else {
            writeln!(f, "Overall performance needs IMPROVEMENT")?;
        }
        Ok(())
    }
}

fn banner(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(f, "{rule}")?;
    writeln!(f, "{title}")?;
    writeln!(f, "{rule}")
}

fn write_result(f: &mut fmt::Formatter<'_>, result: &PerformanceResult) -> fmt::Result {
    banner(f, &format!("Test: {}", result.test_name))?;
    writeln!(f, "Total Requests:      {}", result.total_requests)?;
    writeln!(f, "Duration:            {:.2}s", result.wall_duration.as_secs_f64())?;
    writeln!(f, "Successful:          {}", result.successful_requests)?;
    writeln!(f, "Failed:              {}", result.failed_requests)?;
    writeln!(f, "Success Rate:        {:.1}%", result.success_rate())?;
    writeln!(f, "Requests/Second:     {:.2}", result.requests_per_second)?;

    writeln!(f, "\nResponse Times:")?;
    writeln!(f, "  Average:           {:.2}ms", millis(result.avg_latency))?;
    writeln!(f, "  Minimum:           {:.2}ms", millis(result.min_latency))?;
    writeln!(f, "  Maximum:           {:.2}ms", millis(result.max_latency))?;
    writeln!(f, "  95th Percentile:   {:.2}ms", millis(result.p95_latency))?;
    writeln!(f, "  99th Percentile:   {:.2}ms", millis(result.p99_latency))?;

    if !result.errors.is_empty() {
        writeln!(f, "\nErrors (first {}):", result.errors.len())?;
        for (i, error) in result.errors.iter().enumerate() {
            writeln!(f, "  {}. {error}", i + 1)?;
        }
    }

    let assessment = Assessment::of(result);
    writeln!(f, "\nPerformance Assessment:")?;
    writeln!(
        f,
        "  {} success rate ({:.1}%)",
        label(assessment.success_rate),
        result.success_rate()
    )?;
    writeln!(
        f,
        "  {} average response time ({:.0}ms)",
        label(assessment.avg_latency),
        millis(result.avg_latency)
    )?;
    writeln!(
        f,
        "  {} throughput ({:.1} req/s)",
        label(assessment.throughput),
        result.requests_per_second
    )?;
    let p99 = match assessment.p99_latency {
        Rating::Poor => "High",
        _ => "Good",
    };
    writeln!(
        f,
        "  {p99} 99th percentile ({:.0}ms)",
        millis(result.p99_latency)
    )
}

fn label(rating: Rating) -> &'static str {
    match rating {
        Rating::Excellent => "Excellent",
        Rating::Good => "Good",
        Rating::Poor => "Poor",
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.
}
