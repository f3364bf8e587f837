use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use promobench_common::{
    GenerateSummary, DEFAULT_ITERATIONS, DEFAULT_PRODUCT_COUNT, DEFAULT_PROMOTION_COUNT,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::info;

pub mod bench;
pub mod config;
pub mod error;
pub mod generator;
pub mod store;

use config::{DATE_FORMAT, DB_LOCK_TIMEOUT};
use error::ServerError;
use generator::GeneratePlan;
use store::PromotionStore;

/// Abstraction over dates and elapsed time for testability.
pub trait Clock: Send + Sync {
    /// The current local calendar date.
    fn today(&self) -> NaiveDate;
    /// Nanoseconds from a fixed, monotonic origin.
    fn monotonic_nanos(&self) -> u64;
}

/// Production clock backed by `chrono::Local` and `Instant`.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn monotonic_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Render a date as `YYYYMMDD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub type Db = Arc<Mutex<PromotionStore>>;

#[derive(Clone)]
pub struct AppState {
    pub store: Db,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(store: PromotionStore, clock: Arc<dyn Clock>) -> Self {
        Self { store: Arc::new(Mutex::new(store)), clock }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// SQLite file; `None` keeps the data in memory for the life of the process.
    pub database: Option<PathBuf>,
}

/// PromoBench Server
pub struct Server {
    config: ServerConfig,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Get the server's configured address
    pub fn address(&self) -> SocketAddr {
        self.config.address
    }

    /// Create the application router with the given state
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/api/v1/promotions", get(handle_active_promotions))
            .route("/api/data/generate", post(handle_generate))
            .route("/api/benchmark/compare", get(handle_compare))
            .with_state(state)
    }

    /// Run the server, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(self, ready_tx: tokio::sync::oneshot::Sender<SocketAddr>) -> Result<(), Box<dyn std::error::Error>> {
        let store = match &self.config.database {
            Some(path) => PromotionStore::open(path)?,
            None => PromotionStore::open_in_memory()?,
        };
        info!(database = ?self.config.database, "store opened");
        let state = AppState::new(store, Arc::new(SystemClock::new()));
        let app = Self::create_router(state);
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;
        ready_tx.send(local_addr).ok();
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Run `work` on a blocking thread while holding the store exclusively.
/// Waits at most `DB_LOCK_TIMEOUT` for the lock.
async fn with_store<T, F>(state: &AppState, work: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&mut PromotionStore, &dyn Clock) -> Result<T, ServerError> + Send + 'static,
{
    let mut guard = timeout(DB_LOCK_TIMEOUT, state.store.clone().lock_owned())
        .await
        .map_err(|_| ServerError::LockTimeout)?;
    let clock = Arc::clone(&state.clock);
    tokio::task::spawn_blocking(move || work(&mut *guard, clock.as_ref()))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

#[derive(Debug, Default, Deserialize)]
pub struct CompareParams {
    pub iterations: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateParams {
    pub product_count: Option<i64>,
    pub promotion_count: Option<i64>,
}

/// Handler for GET /api/v1/promotions: promotions active today on in-use products.
pub async fn handle_active_promotions(State(state): State<AppState>) -> Response {
    let result = with_store(&state, |store, clock| {
        store.find_active_promotions(&format_date(clock.today()))
    })
    .await;

    match result {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Handler for POST /api/data/generate: replaces all rows with synthetic data.
/// Accepts `productCount` (default 10000) and `promotionCount` (default 50000).
pub async fn handle_generate(
    State(state): State<AppState>,
    params: Result<Query<GenerateParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return ServerError::InvalidQuery(rejection.body_text()).into_response(),
    };
    let counts = generator::validate_count("productCount", params.product_count, DEFAULT_PRODUCT_COUNT)
        .and_then(|products| {
            generator::validate_count("promotionCount", params.promotion_count, DEFAULT_PROMOTION_COUNT)
                .map(|promotions| (products, promotions))
        });
    let (product_count, promotion_count) = match counts {
        Ok(c) => c,
        Err(e) => return e.into_response(),
    };

    let result = with_store(&state, move |store, clock| {
        let plan = GeneratePlan { product_count, promotion_count, reference_date: clock.today() };
        let dataset = generator::build_dataset(&plan)?;
        store.replace_all(&dataset.products, &dataset.promotions)?;
        Ok(GenerateSummary {
            message: "Test data generated".to_string(),
            products: product_count,
            promotions: promotion_count,
        })
    })
    .await;

    match result {
        Ok(summary) => {
            info!(products = summary.products, promotions = summary.promotions, "test data generated");
            Json(summary).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Handler for GET /api/benchmark/compare: times the legacy and optimized queries.
/// Accepts `iterations` (default 100).
pub async fn handle_compare(
    State(state): State<AppState>,
    params: Result<Query<CompareParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return ServerError::InvalidQuery(rejection.body_text()).into_response(),
    };
    let iterations = match bench::validate_iterations(params.iterations, DEFAULT_ITERATIONS) {
        Ok(n) => n,
        Err(e) => return e.into_response(),
    };

    let result = with_store(&state, move |store, clock| {
        let store = &*store;
        bench::run_comparison(
            iterations,
            clock,
            || store.fetch_legacy(),
            |date| store.fetch_optimized(date),
        )
    })
    .await;

    match result {
        Ok(report) => Json(report).into_response(),
        Err(e) => e.into_response(),
    }
}
