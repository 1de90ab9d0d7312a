mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use barrage_runtime::{BarrageRuntime, RuntimeError, TextReport};
    use std::time::Duration;

    #[tokio::test]
    #[ntest::timeout(60_000)]
    async fn quick_suite_passes() {
        let session = BarrageRuntime::new()
            .url(&init().base_url)
            .quick(true)
            .session()
            .await
            .unwrap();

        let names: Vec<_> = session.results.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, ["Health Endpoint Load Test", "PDA Analysis Load Test"]);
        assert_eq!(session.summary.total_requests, 100 + 30);
        assert_eq!(session.summary.total_successful, 130);
        assert!(session.passed());

        let text = TextReport(&session).to_string();
        assert!(text.contains("Overall performance is GOOD"));
    }

    #[tokio::test]
    #[ntest::timeout(60_000)]
    async fn full_suite_hits_every_endpoint() {
        let session = BarrageRuntime::new()
            .url(&init().base_url)
            .users(4)
            .requests(2)
            .session()
            .await
            .unwrap();

        assert_eq!(session.results.len(), 6);
        for result in &session.results {
            assert_eq!(
                result.successful_requests, result.total_requests,
                "{} had failures: {:?}",
                result.test_name, result.errors
            );
        }
        // 5 scenarios of 4x2 plus memory usage at 5x3
        assert_eq!(session.summary.total_requests, 5 * 8 + 15);

        let json: serde_json::Value = serde_json::from_str(&session.to_json().unwrap()).unwrap();
        assert_eq!(json["passed"], true);
        assert_eq!(json["results"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    #[ntest::timeout(60_000)]
    async fn sustained_session() {
        let session = BarrageRuntime::new()
            .url(&init().base_url)
            .sustained(Duration::from_millis(500))
            .session()
            .await
            .unwrap();

        assert_eq!(session.results.len(), 1);
        assert_eq!(session.results[0].test_name, "Sustained Load (500ms)");
        assert!(session.results[0].wall_duration >= Duration::from_millis(500));
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn preflight_rejects_non_200_health() {
        // Nothing is routed below `/status/404`, so the health probe gets a 404.
        let url = format!("{}/status/404", init().base_url);
        let err = BarrageRuntime::new().url(&url).session().await.unwrap_err();

        assert!(matches!(err, RuntimeError::Connectivity(_)));
        assert!(err.to_string().contains("HTTP 404"));
    }
}
