mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use barrage::prelude::*;
    use barrage::header::{HeaderName, HeaderValue};
    use std::time::Duration;

    fn issuer() -> RequestIssuer {
        RequestIssuer::new(&init().base_url).unwrap()
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn batch_against_health() {
        let result = issuer()
            .load(RequestTemplate::get("/health"))
            .concurrency(10)
            .requests_per_user(5)
            .await;

        assert_eq!(result.test_name, "GET /health");
        assert_eq!(result.total_requests, 50);
        assert_eq!(result.successful_requests, 50);
        assert_eq!(result.failed_requests, 0);
        assert_eq!(result.success_rate(), 100.);
        assert!(result.errors.is_empty());
        assert!(result.min_latency <= result.avg_latency);
        assert!(result.avg_latency <= result.max_latency);
        assert!(result.requests_per_second > 0.);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn three_quarters_succeed() {
        let result = issuer()
            .load(RequestTemplate::get("/budget/15/scenario/three_quarters_succeed"))
            .name("budget")
            .concurrency(4)
            .requests_per_user(5)
            .await;

        assert_eq!(result.test_name, "budget");
        assert_eq!(result.total_requests, 20);
        assert_eq!(result.successful_requests, 15);
        assert_eq!(result.failed_requests, 5);
        assert_eq!(result.success_rate(), 75.0);
        assert_eq!(result.errors.len(), 5);
        assert!(result
            .errors
            .iter()
            .all(|e| e == "HTTP 500 Internal Server Error"));
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn every_request_rejected() {
        let result = issuer()
            .load(RequestTemplate::get("/status/503"))
            .concurrency(5)
            .requests_per_user(4)
            .await;

        assert_eq!(result.total_requests, 20);
        assert_eq!(result.successful_requests, 0);
        assert_eq!(result.errors.len(), 10);
        assert_eq!(result.errors[0], "HTTP 503 Service Unavailable");
        assert!(result.max_latency > Duration::ZERO);
        assert_eq!(Assessment::of(&result).success_rate, Rating::Poor);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn redirects_and_client_errors_split_at_400() {
        let issuer = issuer();

        let not_modified = issuer
            .load(RequestTemplate::get("/status/304"))
            .concurrency(2)
            .requests_per_user(2)
            .await;
        assert_eq!(not_modified.successful_requests, 4);

        let not_found = issuer
            .load(RequestTemplate::get("/status/404"))
            .concurrency(2)
            .requests_per_user(2)
            .await;
        assert_eq!(not_found.failed_requests, 4);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn sustained_delay() {
        let duration = Duration::from_secs(1);
        let result = issuer()
            .load(RequestTemplate::get("/delay/ms/20"))
            .concurrency(8)
            .duration(duration)
            .await;

        assert_eq!(result.test_name, "Sustained Load (1s)");
        assert!(result.wall_duration >= duration);
        assert!(result.total_requests > 8);
        assert_eq!(result.successful_requests, result.total_requests);
        assert!(result.min_latency >= Duration::from_millis(20));
        // Eight in flight for a second with 20ms requests; well under the ideal 400.
        assert!(result.total_requests <= 400 + 8);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn tps_limit_spaces_requests() {
        let result = issuer()
            .load(RequestTemplate::get("/health"))
            .concurrency(20)
            .requests_per_user(2)
            .tps(NonZeroU32::new(100).unwrap())
            .await;

        assert_eq!(result.total_requests, 40);
        assert!(result.wall_duration >= Duration::from_millis(350));
        assert!(result.requests_per_second <= 110.);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn jittered_latencies_are_ordered() {
        let result = issuer()
            .load(RequestTemplate::get("/jitter/ms/10"))
            .concurrency(10)
            .requests_per_user(10)
            .await;

        assert_eq!(result.total_requests, 100);
        assert!(result.min_latency <= result.p95_latency);
        assert!(result.p95_latency <= result.p99_latency);
        assert!(result.p99_latency <= result.max_latency);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn outcomes_are_exported_as_metrics() {
        let env = init();
        let _ = issuer()
            .load(RequestTemplate::get("/health"))
            .name("metrics_probe")
            .concurrency(2)
            .requests_per_user(3)
            .await;

        let rendered = env.metrics.render();
        assert!(rendered.contains("barrage_request_success_total"));
        assert!(rendered.contains(r#"run="metrics_probe""#));
        assert!(rendered.contains("barrage_request_latency_seconds"));
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn post_with_json_body() {
        let template = RequestTemplate::post("/api/v1/analyze/pda").json(serde_json::json!({
            "address": "11111111111111111111111111111111",
            "program_id": "11111111111111111111111111111111",
        }));
        let result = issuer().load(template).concurrency(3).requests_per_user(3).await;

        assert_eq!(result.test_name, "POST /api/v1/analyze/pda");
        assert_eq!(result.successful_requests, 9);

        // Without a body the JSON extractor rejects the request.
        let result = issuer()
            .load(RequestTemplate::post("/api/v1/analyze/pda"))
            .concurrency(1)
            .requests_per_user(2)
            .await;
        assert_eq!(result.failed_requests, 2);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn timeout_is_a_failed_outcome() {
        let config = IssuerConfig {
            timeout: Duration::from_millis(100),
            ..IssuerConfig::default()
        };
        let issuer = RequestIssuer::with_config(&init().base_url, config).unwrap();

        let outcome = issuer.issue(&RequestTemplate::get("/delay/ms/500")).await;
        assert!(!outcome.success);
        assert!(outcome.latency >= Duration::from_millis(100));
        assert!(outcome.latency < Duration::from_millis(500));
        assert!(outcome.error.is_some_and(|e| !e.is_empty()));

        let outcome = issuer.issue(&RequestTemplate::get("/delay/ms/20")).await;
        assert!(outcome.success);
        assert!(outcome.latency >= Duration::from_millis(20));
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn custom_headers_are_sent() {
        let path = "/header/x-api-key/barrage";
        let with_header = RequestTemplate::get(path).header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static("barrage"),
        );

        let result = issuer()
            .load(with_header)
            .concurrency(2)
            .requests_per_user(3)
            .await;
        assert_eq!(result.successful_requests, 6);

        let outcome = issuer().issue(&RequestTemplate::get(path)).await;
        assert_eq!(outcome.error.as_deref(), Some("HTTP 400 Bad Request"));
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn latency_covers_body_drain() {
        // Headers arrive at once; the body takes 5 x 40ms.
        let outcome = issuer()
            .issue(&RequestTemplate::get("/trickle/chunks/5/ms/40"))
            .await;

        assert!(outcome.success);
        assert!(outcome.latency >= Duration::from_millis(200));
    }
}

#[cfg(feature = "integration")]
mod integration {
    use super::*;
    use barrage::prelude::*;
    use std::time::Duration;

    #[tokio::test]
    #[ntest::timeout(120_000)]
    async fn sustained_against_limited_server() {
        let issuer = RequestIssuer::new(&init().base_url).unwrap();
        let result = issuer
            .load(RequestTemplate::get("/limited/200/delay/ms/1/server/sustained"))
            .concurrency(50)
            .duration(Duration::from_secs(30))
            .await;

        assert_eq!(result.successful_requests, result.total_requests);
        assert!(dbg!(result.requests_per_second) <= 220.);
        assert!(result.requests_per_second >= 150.);
    }
}
