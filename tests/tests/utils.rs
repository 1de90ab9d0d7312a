use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

pub struct TestEnv {
    pub base_url: String,
    pub metrics: PrometheusHandle,
}

/// Start the mock service and the metrics recorder once per test binary.
#[allow(unused)]
pub fn init() -> &'static TestEnv {
    static ENV: OnceLock<TestEnv> = OnceLock::new();

    ENV.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("barrage=debug,barrage_runtime=debug,mock_service=info")
            .try_init();

        let metrics = PrometheusBuilder::new()
            .install_recorder()
            .expect("metrics recorder already installed");

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let addr = mock_service::spawn_thread(addr).expect("mock service failed to bind");

        TestEnv {
            base_url: format!("http://{addr}"),
            metrics,
        }
    })
}
