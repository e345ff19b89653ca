//! HTTP content-safety provider implementation

use super::{CategorySeverity, ModerationError, ModerationProvider, ModerationVerdict};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_VERSION: &str = "2023-10-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the content-safety provider
#[derive(Debug, Clone, Default)]
pub struct ModerationConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl ModerationConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("CONTENT_SAFETY_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            api_key: std::env::var("CONTENT_SAFETY_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Text analysis through a remote content-safety service
pub struct ContentSafetyService {
    client: Client,
    api_key: String,
    url: String,
}

impl ContentSafetyService {
    pub fn new(endpoint: &str, api_key: String) -> Result<Self, ModerationError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ModerationError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            url: analyze_url(endpoint),
        })
    }

    /// Build a provider from config, or `None` when endpoint or key is missing
    pub fn from_config(config: &ModerationConfig) -> Option<Result<Self, ModerationError>> {
        let endpoint = config.endpoint.as_deref()?;
        let api_key = config.api_key.clone()?;
        Some(Self::new(endpoint, api_key))
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> ModerationError {
        match status.as_u16() {
            401 | 403 => ModerationError::auth(format!("Authentication failed: {body}")),
            429 => ModerationError::rate_limit(format!("Rate limited: {body}")),
            400 => ModerationError::invalid_request(format!("Invalid request: {body}")),
            500..=599 => ModerationError::server_error(format!("Server error: {body}")),
            _ => ModerationError::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

fn analyze_url(endpoint: &str) -> String {
    format!(
        "{}/contentsafety/text:analyze?api-version={API_VERSION}",
        endpoint.trim_end_matches('/')
    )
}

#[async_trait]
impl ModerationProvider for ContentSafetyService {
    async fn analyze(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        let response = self
            .client
            .post(&self.url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .json(&AnalyzeTextRequest { text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModerationError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    ModerationError::network(format!("Connection failed: {e}"))
                } else {
                    ModerationError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModerationError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        parse_analyze_response(&body)
    }

    fn name(&self) -> &str {
        "content-safety"
    }
}

fn parse_analyze_response(body: &str) -> Result<ModerationVerdict, ModerationError> {
    let parsed: AnalyzeTextResponse = serde_json::from_str(body).map_err(|e| {
        ModerationError::unknown(format!("Failed to parse response: {e} - body: {body}"))
    })?;

    Ok(ModerationVerdict::from_categories(
        parsed
            .categories_analysis
            .into_iter()
            .map(|c| CategorySeverity::new(c.category, c.severity.unwrap_or(0)))
            .collect(),
    ))
}

// Content-safety API types

#[derive(Debug, Serialize)]
struct AnalyzeTextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeTextResponse {
    #[serde(default)]
    categories_analysis: Vec<CategoryAnalysis>,
}

#[derive(Debug, Deserialize)]
struct CategoryAnalysis {
    category: String,
    severity: Option<u32>,
}
