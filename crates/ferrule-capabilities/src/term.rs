//! Terminology extraction and alignment contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ferrule_core::CapabilityType;

use crate::error::CapabilityResult;

/// A candidate term found in a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermCandidate {
    /// Surface form as it appears in the text.
    pub text: String,
    /// Normalized (lemmatized / lowercased) form.
    pub normalized: String,
    /// Occurrence count in the analysed text.
    pub frequency: u32,
    /// Extractor-specific relevance score, higher is better.
    pub score: f32,
}

/// Finds terminology candidates in monolingual text.
#[async_trait]
pub trait TermExtractor: Send + Sync {
    /// Extension-chosen identifier.
    fn id(&self) -> &str;

    /// Always [`CapabilityType::TermExtractor`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::TermExtractor
    }

    /// Extract candidates from `text` written in `language`.
    async fn extract(&self, text: &str, language: &str) -> CapabilityResult<Vec<TermCandidate>>;
}

/// Input for bilingual term alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentRequest {
    /// Source language tag.
    pub source_language: String,
    /// Target language tag.
    pub target_language: String,
    /// Source segment.
    pub source_text: String,
    /// Translated segment.
    pub target_text: String,
    /// Source terms whose translations should be located.
    pub source_terms: Vec<String>,
}

/// A source term paired with its translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermAlignment {
    /// Source term.
    pub source: String,
    /// Aligned target term.
    pub target: String,
    /// Aligner confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Pairs source terms with their translations in a segment pair.
#[async_trait]
pub trait TermAligner: Send + Sync {
    /// Extension-chosen identifier.
    fn id(&self) -> &str;

    /// Always [`CapabilityType::TermAligner`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::TermAligner
    }

    /// Align the requested terms. Terms without a match are omitted.
    async fn align(&self, request: &AlignmentRequest) -> CapabilityResult<Vec<TermAlignment>>;
}
