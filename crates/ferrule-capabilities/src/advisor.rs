//! Translation advisor contract and the caller-side fan-out helper.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ferrule_core::CapabilityType;

use crate::error::CapabilityResult;

/// Input for a suggestion lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    /// Source language tag.
    pub source_language: String,
    /// Target language tag.
    pub target_language: String,
    /// Text to translate.
    pub source_text: String,
    /// Surrounding text, when known.
    #[serde(default)]
    pub context: Option<String>,
}

/// A candidate translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Id of the advisor that produced the suggestion.
    pub advisor: String,
    /// Suggested translation.
    pub text: String,
    /// Advisor confidence in `[0, 1]`.
    pub confidence: f32,
}

/// A source of translation suggestions (machine translation, memories, ...).
#[async_trait]
pub trait TranslationAdvisor: Send + Sync {
    /// Extension-chosen identifier.
    fn id(&self) -> &str;

    /// Always [`CapabilityType::TranslationAdvisor`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::TranslationAdvisor
    }

    /// Human-readable name shown next to suggestions.
    fn name(&self) -> &str {
        self.id()
    }

    /// Whether the language pair is supported.
    async fn can_suggest(&self, source_language: &str, target_language: &str) -> bool;

    /// Produce suggestions for `request`.
    async fn suggest(&self, request: &SuggestionRequest) -> CapabilityResult<Vec<Suggestion>>;
}

/// Per-advisor result of [`collect_suggestions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AdvisorStatus {
    /// The advisor answered.
    Success {
        /// Number of suggestions returned.
        count: usize,
    },
    /// The advisor does not support the language pair.
    Skipped,
    /// The advisor failed; the error text is kept for display.
    Failed {
        /// Rendered error.
        error: String,
    },
}

/// Status report for one advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorReport {
    /// Advisor id.
    pub advisor: String,
    /// What happened.
    #[serde(flatten)]
    pub status: AdvisorStatus,
}

async fn ask(
    advisor: &dyn TranslationAdvisor,
    request: &SuggestionRequest,
) -> (Vec<Suggestion>, AdvisorReport) {
    let mut found = Vec::new();
    let status = if !advisor
        .can_suggest(&request.source_language, &request.target_language)
        .await
    {
        debug!(advisor = advisor.id(), "Advisor skipped language pair");
        AdvisorStatus::Skipped
    } else {
        match advisor.suggest(request).await {
            Ok(suggestions) => {
                found = suggestions;
                AdvisorStatus::Success { count: found.len() }
            },
            Err(e) => {
                warn!(advisor = advisor.id(), error = %e, "Advisor failed");
                AdvisorStatus::Failed {
                    error: e.to_string(),
                }
            },
        }
    };
    let report = AdvisorReport {
        advisor: advisor.id().to_string(),
        status,
    };
    (found, report)
}

/// Ask every advisor concurrently, accumulating suggestions and
/// per-advisor statuses. A failing advisor is recorded and skipped; it
/// never aborts the whole lookup.
///
/// Suggestions and reports are returned in advisor order.
pub async fn collect_suggestions(
    advisors: &[Arc<dyn TranslationAdvisor>],
    request: &SuggestionRequest,
) -> (Vec<Suggestion>, Vec<AdvisorReport>) {
    let answers = join_all(advisors.iter().map(|a| ask(a.as_ref(), request))).await;

    let mut suggestions = Vec::new();
    let mut reports = Vec::with_capacity(answers.len());
    for (found, report) in answers {
        suggestions.extend(found);
        reports.push(report);
    }
    (suggestions, reports)
}
