//! Process-wide settings for the normalizer and the reasoning client.

use std::time::Duration;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o";

/// Limits applied while mapping one biosample.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    /// Most features mapped per biosample.
    pub max_features: usize,
    /// Features farther than this from the sample are not mapped.
    pub max_distance_m: f64,
    /// Mappings below this confidence are discarded.
    pub confidence_threshold: f64,
    /// Timeout for each ontology or reasoning call.
    pub call_timeout: Duration,
    /// Candidate terms fetched per keyword search.
    pub search_results: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_features: 20,
            max_distance_m: 500.0,
            confidence_threshold: 0.7,
            call_timeout: Duration::from_secs(60),
            search_results: envo_ontology::DEFAULT_SEARCH_RESULTS,
        }
    }
}

impl NormalizerConfig {
    #[must_use]
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    #[must_use]
    pub fn with_max_distance(mut self, max_distance_m: f64) -> Self {
        self.max_distance_m = max_distance_m;
        self
    }

    #[must_use]
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Connection settings for an OpenAI-compatible chat completions API.
#[derive(Clone, PartialEq)]
pub struct ReasoningConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Total attempts per request, including the first.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: None,
            temperature: 0.1,
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl std::fmt::Debug for ReasoningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ReasoningConfig {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// `{base_url}/chat/completions`, tolerating a trailing slash.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizer_defaults() {
        let config = NormalizerConfig::default();
        assert_eq!(config.max_features, 20);
        assert_eq!(config.max_distance_m, 500.0);
        assert_eq!(config.confidence_threshold, 0.7);
    }

    #[test]
    fn completions_url_joins_cleanly() {
        let config = ReasoningConfig::default().with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.completions_url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn debug_hides_api_key() {
        let config = ReasoningConfig::default().with_api_key("sk-secret");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }
}
