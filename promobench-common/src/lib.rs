use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Iteration count used by the benchmark endpoint when the caller omits one.
pub const DEFAULT_ITERATIONS: u32 = 100;
/// Upper bound on a single benchmark request.
pub const MAX_ITERATIONS: u32 = 10_000;
/// Untimed calls made to each fetch before measurement starts.
pub const WARMUP_ITERATIONS: u32 = 10;

pub const DEFAULT_PRODUCT_COUNT: u32 = 10_000;
pub const DEFAULT_PROMOTION_COUNT: u32 = 50_000;
/// Upper bound on either row count accepted by the data generator.
pub const MAX_GENERATE_ROWS: u32 = 1_000_000;

/// Label attached to every stats block.
pub const STATS_UNIT: &str = "microseconds (μs)";

/// Error types for PromoBench client operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromoBenchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Iterations must be between 1 and {0}")]
    InvalidIterations(u32),
}

/// JSON error envelope returned by the server for all error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One active promotion joined with its product. Serialized with camelCase keys
/// (`prodCd`, `promoPrice`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionProduct {
    pub prod_cd: String,
    pub prod_nm: String,
    pub promo_price: i64,
    /// `YYYYMMDD`
    pub start_dt: String,
    /// `YYYYMMDD`
    pub end_dt: String,
}

/// Latency summary of one sample set, in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub unit: String,
}

/// Body of `GET /api/benchmark/compare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub iterations: u32,
    pub legacy: Stats,
    pub optimized: Stats,
    /// Two decimals with a `%` suffix; negative when the optimized query is slower.
    pub improvement_percent: String,
}

/// Body of `POST /api/data/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateSummary {
    pub message: String,
    pub products: u32,
    pub promotions: u32,
}

/// Result type for PromoBench client operations
pub type Result<T> = std::result::Result<T, PromoBenchError>;
