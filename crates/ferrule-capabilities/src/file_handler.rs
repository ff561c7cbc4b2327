//! Translatable file format handlers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ferrule_core::CapabilityType;

use crate::error::{CapabilityError, CapabilityResult};

/// Identifies an uploaded file for format detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Original file name including extension.
    pub name: String,
    /// MIME type reported by the client, if any.
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl FileInfo {
    /// Lowercased extension without the dot, if the name has one.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// One translatable unit extracted from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatableElement {
    /// Stable key locating the element inside the file.
    pub key: String,
    /// Source text.
    pub text: String,
    /// Format-specific data needed to write the element back.
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// A translated value for the element with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementTranslation {
    /// Key of the [`TranslatableElement`].
    pub key: String,
    /// Translated text.
    pub text: String,
}

/// Reads translatable elements out of a file format and writes
/// translations back into it.
#[async_trait]
pub trait TranslatableFileHandler: Send + Sync {
    /// Extension-chosen identifier (e.g. `"json"`, `"xliff"`).
    fn id(&self) -> &str;

    /// Always [`CapabilityType::TranslatableFileHandler`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::TranslatableFileHandler
    }

    /// Whether this handler understands `file`.
    fn can_extract(&self, file: &FileInfo) -> bool;

    /// Whether this handler can write translations for `file`. Defaults to
    /// [`can_extract`](Self::can_extract).
    fn can_export(&self, file: &FileInfo) -> bool {
        self.can_extract(file)
    }

    /// Extract every translatable element, in document order.
    async fn extract(
        &self,
        file: &FileInfo,
        content: &[u8],
    ) -> CapabilityResult<Vec<TranslatableElement>>;

    /// Produce a translated copy of `original`.
    async fn export(
        &self,
        _file: &FileInfo,
        _original: &[u8],
        _translations: &[ElementTranslation],
    ) -> CapabilityResult<Vec<u8>> {
        Err(CapabilityError::unsupported(self.id(), "export"))
    }
}
