use axum::{
    body::Body,
    debug_handler,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lazy_static::lazy_static;
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use rand_distr::{Distribution, Normal};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/delay/ms/:delay_ms", get(delay))
        .route("/jitter/ms/:mean_ms", get(jitter))
        .route("/status/:code", get(status))
        .route("/header/:name/:value", get(header))
        .route("/trickle/chunks/:count/ms/:interval_ms", get(trickle))
        .route("/budget/:successes/scenario/:scenario_name", get(budget))
        .route(
            "/limited/:max_tps/delay/ms/:delay_ms/server/:server_id",
            get(limited),
        )
        .route("/api/v1/analyze/pda", post(analyze_pda))
        .route("/api/v1/analyze/pda/batch", post(batch_analyze_pda))
        .route("/api/v1/analytics/database", get(database_metrics))
        .route("/api/v1/programs", get(list_programs))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router()).await?;
    Ok(())
}

/// Bind `addr` (port `0` for an ephemeral port) and serve in the background.
pub async fn spawn(addr: SocketAddr) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router()).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });
    Ok(local)
}

/// Serve from a dedicated thread with its own runtime, so the service outlives the caller's
/// runtime. Returns the bound address.
pub fn spawn_thread(addr: SocketAddr) -> anyhow::Result<SocketAddr> {
    let listener = std::net::TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    let local = listener.local_addr()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    std::thread::spawn(move || {
        runtime.block_on(async move {
            let served = match tokio::net::TcpListener::from_std(listener) {
                Ok(listener) => axum::serve(listener, router()).await,
                Err(err) => Err(err),
            };
            if let Err(err) = served {
                tracing::error!("Mock service stopped: {err}");
            }
        })
    });

    Ok(local)
}

fn tick() {
    counter!("mock-server.tps").increment(1);
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
}

fn envelope(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

#[debug_handler]
pub async fn health() -> Json<Value> {
    tick();
    envelope(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[debug_handler]
pub async fn delay(Path(delay_ms): Path<u64>) {
    tick();
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

#[debug_handler]
pub async fn jitter(Path(mean_ms): Path<f64>) -> Result<(), StatusCode> {
    tick();
    let normal = Normal::new(mean_ms, mean_ms / 4.).map_err(|_| StatusCode::BAD_REQUEST)?;
    let ms = normal.sample(&mut rand::thread_rng()).max(0.);
    tokio::time::sleep(Duration::from_secs_f64(ms / 1_000.)).await;
    Ok(())
}

#[debug_handler]
pub async fn status(Path(code): Path<u16>) -> StatusCode {
    tick();
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/// `200` when the request carries header `name` set to `value`, `400` otherwise.
#[debug_handler]
pub async fn header(
    Path((name, value)): Path<(String, String)>,
    headers: HeaderMap,
) -> StatusCode {
    tick();
    match headers.get(name.as_str()) {
        Some(sent) if sent.as_bytes() == value.as_bytes() => StatusCode::OK,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Answers at once, then streams `count` lines with `interval_ms` between them.
#[debug_handler]
pub async fn trickle(Path((count, interval_ms)): Path<(u64, u64)>) -> Body {
    tick();
    let interval = Duration::from_millis(interval_ms);
    let lines = stream::unfold(0, move |sent| async move {
        if sent == count {
            return None;
        }
        tokio::time::sleep(interval).await;
        Some((Ok::<_, Infallible>(format!("line {sent}\n")), sent + 1))
    });
    Body::from_stream(lines)
}

lazy_static! {
    static ref BUDGET_MAP: Arc<RwLock<HashMap<String, Arc<AtomicU64>>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

/// The first `successes` calls for a scenario answer `200`, every later one `500`.
#[debug_handler]
pub async fn budget(
    Path((successes, scenario_name)): Path<(u64, String)>,
) -> Result<(), StatusCode> {
    tick();

    let existing = BUDGET_MAP
        .read()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .get(&scenario_name)
        .cloned();
    let calls = match existing {
        Some(calls) => calls,
        None => BUDGET_MAP
            .write()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .entry(scenario_name)
            .or_default()
            .clone(),
    };

    if calls.fetch_add(1, Ordering::SeqCst) < successes {
        Ok(())
    } else {
        debug!("Budget exhausted");
        Err(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

lazy_static! {
    static ref LIMITED_MAP: Arc<RwLock<HashMap<String, Arc<DefaultDirectRateLimiter>>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

#[debug_handler]
pub async fn limited(
    Path((max_tps, delay_ms, server_id)): Path<(NonZeroU32, u64, String)>,
) -> Result<(), StatusCode> {
    tick();
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    let read = LIMITED_MAP
        .read()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .get(&server_id)
        .cloned();
    let limiter = match read {
        Some(limiter) => limiter,
        None => LIMITED_MAP
            .write()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .entry(server_id)
            .or_insert_with(|| Arc::new(rate_limiter(max_tps)))
            .clone(),
    };

    limiter.until_ready().await;

    Ok(())
}

/** PDA analysis API **/

#[derive(Debug, Deserialize)]
pub struct AnalyzePdaRequest {
    pub address: String,
    pub program_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchAnalyzePdaRequest {
    pub pdas: Vec<AnalyzePdaRequest>,
}

fn analysis(request: &AnalyzePdaRequest) -> Value {
    json!({
        "address": request.address,
        "program_id": request.program_id,
        "seeds": [],
        "bump": 255,
    })
}

#[debug_handler]
pub async fn analyze_pda(Json(request): Json<AnalyzePdaRequest>) -> Json<Value> {
    tick();
    envelope(analysis(&request))
}

#[debug_handler]
pub async fn batch_analyze_pda(Json(request): Json<BatchAnalyzePdaRequest>) -> Json<Value> {
    tick();
    let results: Vec<Value> = request.pdas.iter().map(analysis).collect();
    envelope(json!(results))
}

#[debug_handler]
pub async fn database_metrics() -> Json<Value> {
    tick();
    envelope(json!({
        "total_programs": 3,
        "total_pdas": 128,
    }))
}

#[derive(Debug, Deserialize)]
pub struct Page {
    pub limit: Option<usize>,
}

#[debug_handler]
pub async fn list_programs(Query(page): Query<Page>) -> Json<Value> {
    tick();
    let programs: Vec<Value> = (0..page.limit.unwrap_or(10).min(100))
        .map(|i| json!({ "program_id": format!("{i:044}"), "name": format!("program-{i}") }))
        .collect();
    envelope(json!(programs))
}

/** Utils **/

pub fn rate_limiter(tps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps))
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = TPS_MEASURE.swap(0, Ordering::Relaxed);
        println!("{transactions} TPS");
    }
}
