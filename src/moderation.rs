//! Content moderation
//!
//! A provider performs the remote text analysis; the gate turns a provider
//! result into a screening the behaviors can act on.

mod content_safety;
mod error;

pub use content_safety::{ContentSafetyService, ModerationConfig};
pub use error::{ModerationError, ModerationErrorKind};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Report line used when the provider returned no result
pub const REQUEST_FAILED_REPORT: &str = "request failed";

/// Severity assigned to one analysis category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySeverity {
    pub category: String,
    pub severity: u32,
}

impl CategorySeverity {
    pub fn new(category: impl Into<String>, severity: u32) -> Self {
        Self {
            category: category.into(),
            severity,
        }
    }
}

/// Outcome of a successful analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationVerdict {
    categories: Vec<CategorySeverity>,
}

impl ModerationVerdict {
    pub fn from_categories(categories: Vec<CategorySeverity>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[CategorySeverity] {
        &self.categories
    }

    /// Safe iff every category has severity exactly 0
    pub fn is_safe(&self) -> bool {
        self.categories.iter().all(|c| c.severity == 0)
    }

    /// `"{category}: {severity}"` for every category, in provider order
    pub fn report(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}: {}", c.category, c.severity))
            .collect()
    }
}

/// Remote text-analysis capability
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<ModerationVerdict, ModerationError>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: ModerationProvider + ?Sized> ModerationProvider for Arc<T> {
    async fn analyze(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        (**self).analyze(text).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// What the gate reports back for one piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screening {
    Verdict(ModerationVerdict),
    /// The provider returned no result
    Unavailable { reason: String },
}

impl Screening {
    /// Unavailable analysis counts as unsafe
    pub fn is_safe(&self) -> bool {
        match self {
            Screening::Verdict(v) => v.is_safe(),
            Screening::Unavailable { .. } => false,
        }
    }

    pub fn report(&self) -> Vec<String> {
        match self {
            Screening::Verdict(v) => v.report(),
            Screening::Unavailable { .. } => vec![REQUEST_FAILED_REPORT.to_string()],
        }
    }

    /// Report in the shape attached to message debug data
    pub fn debug_attachment(&self) -> serde_json::Value {
        serde_json::json!({ "moderation": self.report() })
    }
}

/// Single-call gate in front of a moderation provider. Never retries.
pub struct ModerationGate<M: ModerationProvider> {
    provider: M,
}

impl<M: ModerationProvider> ModerationGate<M> {
    pub fn new(provider: M) -> Self {
        Self { provider }
    }

    pub async fn screen(&self, text: &str) -> Screening {
        match self.provider.analyze(text).await {
            Ok(verdict) => Screening::Verdict(verdict),
            Err(e) => {
                tracing::warn!(
                    provider = %self.provider.name(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Moderation analysis unavailable"
                );
                Screening::Unavailable { reason: e.message }
            }
        }
    }

    /// Raw provider call, for callers that report failures themselves
    pub async fn analyze(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        self.provider.analyze(text).await
    }

    #[allow(dead_code)] // Used by tests to inspect mock providers
    pub fn provider(&self) -> &M {
        &self.provider
    }
}

/// Logging wrapper for moderation providers
pub struct LoggingProvider {
    inner: Arc<dyn ModerationProvider>,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn ModerationProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ModerationProvider for LoggingProvider {
    async fn analyze(&self, text: &str) -> Result<ModerationVerdict, ModerationError> {
        let start = std::time::Instant::now();
        let result = self.inner.analyze(text).await;
        let duration = start.elapsed();

        match &result {
            Ok(verdict) => {
                tracing::info!(
                    provider = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    safe = verdict.is_safe(),
                    categories = verdict.categories().len(),
                    "Moderation request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    provider = %self.inner.name(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    transient = e.kind.is_transient(),
                    "Moderation request failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Stand-in used when no content-safety service is configured
pub struct UnconfiguredProvider;

#[async_trait]
impl ModerationProvider for UnconfiguredProvider {
    async fn analyze(&self, _text: &str) -> Result<ModerationVerdict, ModerationError> {
        Err(ModerationError::not_configured(
            "No content safety endpoint configured",
        ))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// Build the production provider from config
pub fn build_provider(config: &ModerationConfig) -> Arc<dyn ModerationProvider> {
    let inner: Arc<dyn ModerationProvider> = match ContentSafetyService::from_config(config) {
        Some(Ok(service)) => Arc::new(service),
        Some(Err(e)) => {
            tracing::error!(error = %e, "Failed to create content safety client");
            Arc::new(UnconfiguredProvider)
        }
        None => {
            tracing::warn!(
                "No content safety service configured. Set CONTENT_SAFETY_ENDPOINT and CONTENT_SAFETY_API_KEY."
            );
            Arc::new(UnconfiguredProvider)
        }
    };
    Arc::new(LoggingProvider::new(inner))
}
