use promobench_common::{
    ComparisonReport, ErrorResponse, GenerateSummary, PromoBenchError, PromotionProduct, Result,
    MAX_ITERATIONS,
};
use serde::de::DeserializeOwned;

/// PromoBench client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme, host and port, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
}

/// PromoBench Client
pub struct Client {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build the URL for an API path such as `/api/v1/promotions`.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Promotions active today on in-use products.
    pub async fn active_promotions(&self) -> Result<Vec<PromotionProduct>> {
        let request = self.http_client.get(self.build_url("/api/v1/promotions"));
        self.send_json(request).await
    }

    /// Replace the server's data with `product_count` products and `promotion_count` promotions.
    pub async fn generate(&self, product_count: u32, promotion_count: u32) -> Result<GenerateSummary> {
        let request = self
            .http_client
            .post(self.build_url("/api/data/generate"))
            .query(&[("productCount", product_count), ("promotionCount", promotion_count)]);
        self.send_json(request).await
    }

    /// Run the query benchmark. `None` lets the server pick its default iteration count.
    pub async fn compare(&self, iterations: Option<u32>) -> Result<ComparisonReport> {
        if let Some(n) = iterations {
            if n == 0 || n > MAX_ITERATIONS {
                return Err(PromoBenchError::InvalidIterations(MAX_ITERATIONS));
            }
        }

        let mut request = self.http_client.get(self.build_url("/api/benchmark/compare"));
        if let Some(n) = iterations {
            request = request.query(&[("iterations", n)]);
        }
        self.send_json(request).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| PromoBenchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PromoBenchError::NetworkError(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| PromoBenchError::InvalidResponse(e.to_string()))
    }
}

async fn parse_error_response(status: reqwest::StatusCode, response: reqwest::Response) -> PromoBenchError {
    let error_msg = response
        .json::<ErrorResponse>()
        .await
        .map(|r| r.error)
        .unwrap_or_else(|_| format!("Server returned status: {}", status));

    PromoBenchError::HttpError(status.as_u16(), error_msg)
}
