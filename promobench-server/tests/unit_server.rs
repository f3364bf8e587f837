use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use chrono::{Local, NaiveDate};
use promobench_common::{ComparisonReport, ErrorResponse, GenerateSummary, PromotionProduct};
use promobench_server::error::ServerError;
use promobench_server::store::PromotionStore;
use promobench_server::{
    handle_active_promotions, handle_compare, handle_generate, AppState, Clock, CompareParams,
    GenerateParams, Server, ServerConfig, SystemClock,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// --- Test helpers ---

struct MockClock {
    today: NaiveDate,
    nanos: AtomicU64,
}

impl MockClock {
    fn new(today: NaiveDate) -> Arc<Self> {
        Arc::new(Self { today, nanos: AtomicU64::new(0) })
    }
}

impl Clock for MockClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    // Every reading moves forward so each measured trial takes at least 1 µs.
    fn monotonic_nanos(&self) -> u64 {
        self.nanos.fetch_add(1_000, Ordering::Relaxed)
    }
}

fn state_on(today: NaiveDate) -> AppState {
    AppState::new(PromotionStore::open_in_memory().unwrap(), MockClock::new(today) as Arc<dyn Clock>)
}

fn fixed_state() -> AppState {
    state_on(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
}

/// Legacy filtering uses SQLite's own clock, so benchmarks over real data need the real date.
fn today_state() -> AppState {
    AppState::new(PromotionStore::open_in_memory().unwrap(), Arc::new(SystemClock::new()) as Arc<dyn Clock>)
}

async fn response_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn generate(state: &AppState, products: i64, promotions: i64) -> Response {
    let params = GenerateParams { product_count: Some(products), promotion_count: Some(promotions) };
    handle_generate(State(state.clone()), Ok(Query(params))).await
}

async fn compare(state: &AppState, iterations: Option<i64>) -> Response {
    handle_compare(State(state.clone()), Ok(Query(CompareParams { iterations }))).await
}

async fn assert_error(response: Response, status: StatusCode, message: &str) {
    assert_eq!(response.status(), status);
    let body: ErrorResponse = response_json(response).await;
    assert_eq!(body.error, message);
}

// --- Server struct ---

#[test]
fn test_server_creation_with_config() {
    let config = ServerConfig { address: "0.0.0.0:9000".parse().unwrap(), database: None };
    let server = Server::new(config);
    assert_eq!(server.address().to_string(), "0.0.0.0:9000");
}

#[test]
fn test_router_creation() {
    let router = Server::create_router(fixed_state());
    assert!(std::mem::size_of_val(&router) > 0);
}

#[test]
fn test_error_status_mapping() {
    assert_eq!(ServerError::InvalidIterations { got: 0, max: 10 }.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ServerError::InvalidQuery("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(ServerError::LockTimeout.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ServerError::Database("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ServerError::DegenerateBaseline.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- GET /api/v1/promotions ---

#[tokio::test]
async fn test_active_promotions_empty_store() {
    let response = handle_active_promotions(State(fixed_state())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rows: Vec<PromotionProduct> = response_json(response).await;
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_active_promotions_use_clock_date() {
    let state = fixed_state();
    assert_eq!(generate(&state, 10, 30).await.status(), StatusCode::OK);

    let response = handle_active_promotions(State(state.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rows: Vec<PromotionProduct> = response_json(response).await;

    // i = 3, 6, ..., 30 are current; only i = 9 lands on the retired P000010.
    assert_eq!(rows.len(), 9);
    assert!(rows.iter().all(|r| r.start_dt == "20261001" && r.end_dt == "20261031"));
    assert!(rows.iter().all(|r| r.prod_cd != "P000010"));
}

#[tokio::test]
async fn test_active_promotions_body_uses_camel_case_keys() {
    let state = fixed_state();
    assert_eq!(generate(&state, 10, 30).await.status(), StatusCode::OK);

    let response = handle_active_promotions(State(state)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response_json(response).await;

    let first = &body.as_array().unwrap()[0];
    for key in ["prodCd", "prodNm", "promoPrice", "startDt", "endDt"] {
        assert!(first.get(key).is_some(), "missing {key} in {first}");
    }
    assert!(first.get("prod_cd").is_none());
    assert_eq!(first["startDt"], "20261001");
}

#[tokio::test]
async fn test_active_promotions_outside_window_is_empty() {
    let generated_on = fixed_state();
    assert_eq!(generate(&generated_on, 10, 30).await.status(), StatusCode::OK);

    // Same store, clock moved two months ahead: nothing is active any more.
    let later = AppState {
        store: generated_on.store.clone(),
        clock: MockClock::new(NaiveDate::from_ymd_opt(2026, 12, 15).unwrap()),
    };
    let rows: Vec<PromotionProduct> =
        response_json(handle_active_promotions(State(later)).await).await;
    assert!(rows.is_empty());
}

// --- POST /api/data/generate ---

#[tokio::test]
async fn test_generate_returns_summary_and_replaces_rows() {
    let state = fixed_state();
    let response = generate(&state, 20, 60).await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary: GenerateSummary = response_json(response).await;
    assert_eq!(summary.message, "Test data generated");
    assert_eq!(summary.products, 20);
    assert_eq!(summary.promotions, 60);
    assert_eq!(state.store.lock().await.counts().unwrap(), (20, 60));

    assert_eq!(generate(&state, 5, 7).await.status(), StatusCode::OK);
    assert_eq!(state.store.lock().await.counts().unwrap(), (5, 7));
}

#[tokio::test]
async fn test_generate_rejects_zero_products() {
    let state = fixed_state();
    assert_error(
        generate(&state, 0, 10).await,
        StatusCode::BAD_REQUEST,
        "productCount must be between 1 and 1000000, got 0",
    )
    .await;
    assert_eq!(state.store.lock().await.counts().unwrap(), (0, 0));
}

#[tokio::test]
async fn test_generate_rejects_negative_promotions() {
    assert_error(
        generate(&fixed_state(), 10, -3).await,
        StatusCode::BAD_REQUEST,
        "promotionCount must be between 1 and 1000000, got -3",
    )
    .await;
}

// --- GET /api/benchmark/compare ---

#[tokio::test]
async fn test_compare_report_shape() {
    let state = today_state();
    assert_eq!(generate(&state, 50, 300).await.status(), StatusCode::OK);

    let response = compare(&state, Some(5)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report: ComparisonReport = response_json(response).await;

    assert_eq!(report.iterations, 5);
    for stats in [&report.legacy, &report.optimized] {
        assert!(stats.min <= stats.p50 && stats.p50 <= stats.p95 && stats.p95 <= stats.max);
        assert!(stats.min <= stats.avg && stats.avg <= stats.max);
        assert_eq!(stats.unit, "microseconds (μs)");
    }
    assert!(report.improvement_percent.ends_with('%'));
}

#[tokio::test]
async fn test_compare_defaults_to_100_iterations() {
    let state = fixed_state();
    let response = compare(&state, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report: ComparisonReport = response_json(response).await;
    assert_eq!(report.iterations, 100);
}

#[tokio::test]
async fn test_compare_with_mock_clock_measures_one_microsecond_per_trial() {
    // MockClock advances 1 µs per reading, so every trial is exactly 1 µs.
    let response = compare(&fixed_state(), Some(10)).await;
    let report: ComparisonReport = response_json(response).await;
    assert_eq!(report.legacy.avg, 1.0);
    assert_eq!(report.optimized.max, 1.0);
    assert_eq!(report.improvement_percent, "0.00%");
}

#[tokio::test]
async fn test_compare_rejects_zero_iterations() {
    assert_error(
        compare(&fixed_state(), Some(0)).await,
        StatusCode::BAD_REQUEST,
        "iterations must be between 1 and 10000, got 0",
    )
    .await;
}

#[tokio::test]
async fn test_compare_rejects_too_many_iterations() {
    let response = compare(&fixed_state(), Some(10_001)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compare_surfaces_database_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("promo.db");
    let state = AppState::new(
        PromotionStore::open(&path).unwrap(),
        MockClock::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()) as Arc<dyn Clock>,
    );
    rusqlite::Connection::open(&path).unwrap().execute_batch("DROP TABLE TB_PROMOTION;").unwrap();

    let response = compare(&state, Some(3)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = response_json(response).await;
    assert!(body.error.starts_with("Database error:"), "got {}", body.error);
}

#[tokio::test]
async fn test_today_state_uses_system_date() {
    let state = today_state();
    assert_eq!(state.clock.today(), Local::now().date_naive());
}
