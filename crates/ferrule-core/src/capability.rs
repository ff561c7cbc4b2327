//! The closed set of capability types known to the host.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A kind of pluggable behavior.
///
/// Each variant maps to exactly one capability contract in
/// `ferrule-capabilities`. The wire form is `SCREAMING_SNAKE_CASE`
/// (e.g. `"STORAGE_PROVIDER"`), which is also what persisted service
/// bindings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapabilityType {
    /// Login methods.
    AuthProvider,
    /// Second-factor methods.
    MfaProvider,
    /// Blob storage backends.
    StorageProvider,
    /// Text embedding engines.
    TextVectorizer,
    /// Vector similarity stores.
    VectorStorage,
    /// File format extract/export handlers.
    TranslatableFileHandler,
    /// Machine translation / suggestion sources.
    TranslationAdvisor,
    /// Terminology candidate extraction.
    TermExtractor,
    /// Bilingual term alignment.
    TermAligner,
    /// Source text tokenizers.
    Tokenizer,
}

impl CapabilityType {
    /// Every capability type, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::AuthProvider,
        Self::MfaProvider,
        Self::StorageProvider,
        Self::TextVectorizer,
        Self::VectorStorage,
        Self::TranslatableFileHandler,
        Self::TranslationAdvisor,
        Self::TermExtractor,
        Self::TermAligner,
        Self::Tokenizer,
    ];

    /// The canonical wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthProvider => "AUTH_PROVIDER",
            Self::MfaProvider => "MFA_PROVIDER",
            Self::StorageProvider => "STORAGE_PROVIDER",
            Self::TextVectorizer => "TEXT_VECTORIZER",
            Self::VectorStorage => "VECTOR_STORAGE",
            Self::TranslatableFileHandler => "TRANSLATABLE_FILE_HANDLER",
            Self::TranslationAdvisor => "TRANSLATION_ADVISOR",
            Self::TermExtractor => "TERM_EXTRACTOR",
            Self::TermAligner => "TERM_ALIGNER",
            Self::Tokenizer => "TOKENIZER",
        }
    }
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownCapabilityType(s.to_string()))
    }
}
