//! Reasoning collaborator: the model that proposes a mapping.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ReasoningConfig;
use crate::error::{ReasoningError, Result};

/// User agent string for API requests.
const USER_AGENT_VALUE: &str = concat!("biosample-envo/", env!("CARGO_PKG_VERSION"));

/// Answers a prompt with free-form text.
///
/// Responses carry no format guarantee; callers parse them defensively.
#[async_trait]
pub trait ReasoningCollaborator: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Client for any OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    config: ReasoningConfig,
}

impl OpenAiCompatibleClient {
    pub fn new(config: ReasoningConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(ReasoningError::Config("model name is empty".to_string()));
        }
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ReasoningError::Config(format!(
                "base URL must be http(s): {:?}",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ReasoningError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    async fn call_api(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": &self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": self.config.temperature
        });

        let mut request = self.client.post(self.config.completions_url()).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        first_choice(&text)
    }
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// Content of the first choice in a chat completions body.
fn first_choice(body: &str) -> Result<String> {
    let response: ApiResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ReasoningError::EmptyResponse)
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReasoningCollaborator for OpenAiCompatibleClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 1;
        loop {
            let start = Instant::now();
            match self.call_api(system_prompt, user_prompt).await {
                Ok(text) => {
                    debug!(
                        model = %self.config.model,
                        attempt,
                        duration_ms = start.elapsed().as_millis(),
                        "Reasoning call completed"
                    );
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(attempt, attempts, error = %e, "Reasoning call failed, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_choice_content_is_returned() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "ENVO:00000063"}},
            {"message": {"content": "second"}}]}"#;
        assert_eq!(first_choice(body).unwrap(), "ENVO:00000063");
    }

    #[test]
    fn empty_and_malformed_bodies_are_errors() {
        assert!(matches!(
            first_choice(r#"{"choices": []}"#),
            Err(ReasoningError::EmptyResponse)
        ));
        assert!(matches!(
            first_choice(r#"{"choices": [{"message": {"content": null}}]}"#),
            Err(ReasoningError::EmptyResponse)
        ));
        let error = first_choice("<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(error, ReasoningError::JsonParse(_)));
        assert!(!error.is_retryable());
    }

    #[test]
    fn unusable_config_is_rejected() {
        let no_model = ReasoningConfig::default().with_model(" ");
        assert!(matches!(
            OpenAiCompatibleClient::new(no_model),
            Err(ReasoningError::Config(_))
        ));

        let bad_url = ReasoningConfig::default().with_base_url("localhost:11434/v1");
        assert!(matches!(
            OpenAiCompatibleClient::new(bad_url),
            Err(ReasoningError::Config(_))
        ));

        assert!(OpenAiCompatibleClient::new(ReasoningConfig::default()).is_ok());
    }
}
