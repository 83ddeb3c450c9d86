//! Overpass API client with bounded retries.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use envo_model::GeoPoint;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{error, info, warn};

use crate::error::{OsmError, Result};
use crate::query::{QueriedFeature, build_overpass_query, parse_response};
use crate::taxonomy::FeatureTaxonomy;

/// Public Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// User agent string for Overpass requests.
const USER_AGENT_VALUE: &str = concat!("biosample-envo/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the Overpass API.
#[derive(Debug, Clone, PartialEq)]
pub struct OverpassConfig {
    pub endpoint: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Total attempts per query, including the first.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OVERPASS_URL.to_string(),
            timeout: Duration::from_secs(200),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl OverpassConfig {
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Source of environmental features around a point.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    async fn query_features(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<QueriedFeature>>;
}

/// Overpass-backed [`FeatureSource`].
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    config: OverpassConfig,
    taxonomy: FeatureTaxonomy,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig, taxonomy: FeatureTaxonomy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| OsmError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            taxonomy,
        })
    }

    pub fn taxonomy(&self) -> &FeatureTaxonomy {
        &self.taxonomy
    }

    pub fn config(&self) -> &OverpassConfig {
        &self.config
    }

    async fn post_query(&self, query: &str) -> Result<Vec<QueriedFeature>> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&[("data", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OsmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        Ok(parse_response(&body, &self.taxonomy))
    }
}

#[async_trait]
impl FeatureSource for OverpassClient {
    async fn query_features(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<QueriedFeature>> {
        let query = build_overpass_query(&self.taxonomy, center, radius_m);
        let attempts = self.config.max_retries.max(1);

        let mut attempt = 1;
        loop {
            info!(
                lat = center.lat,
                lon = center.lon,
                attempt,
                attempts,
                "Querying OSM features"
            );
            let start = Instant::now();
            match self.post_query(&query).await {
                Ok(features) => {
                    info!(
                        features = features.len(),
                        duration_ms = start.elapsed().as_millis(),
                        "Found relevant features"
                    );
                    return Ok(features);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(attempt, attempts, error = %e, "Overpass request failed, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempt, error = %e, "Overpass query failed");
                    return Err(e);
                }
            }
        }
    }
}
