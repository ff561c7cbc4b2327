//! Text vectorization and vector storage contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ferrule_core::CapabilityType;

use crate::error::CapabilityResult;

/// Turns text into fixed-width embedding vectors.
#[async_trait]
pub trait TextVectorizer: Send + Sync {
    /// Extension-chosen identifier.
    fn id(&self) -> &str;

    /// Always [`CapabilityType::TextVectorizer`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::TextVectorizer
    }

    /// Width of the vectors this implementation produces.
    fn dimensions(&self) -> usize;

    /// Whether text in `language` (BCP 47 tag) is supported.
    async fn can_vectorize(&self, language: &str) -> bool;

    /// Embed every text, returning one vector per input in input order.
    async fn vectorize(&self, texts: &[String]) -> CapabilityResult<Vec<Vec<f32>>>;
}

/// A vector with its id and opaque metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Caller-chosen record id.
    pub id: String,
    /// The embedding.
    pub vector: Vec<f32>,
    /// Arbitrary metadata returned with matches.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// One similarity search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Record id.
    pub id: String,
    /// Similarity score, higher is closer.
    pub score: f32,
    /// Metadata stored with the record.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Stores vectors and answers nearest-neighbour queries.
#[async_trait]
pub trait VectorStorage: Send + Sync {
    /// Extension-chosen identifier.
    fn id(&self) -> &str;

    /// Always [`CapabilityType::VectorStorage`].
    fn capability_type(&self) -> CapabilityType {
        CapabilityType::VectorStorage
    }

    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<VectorRecord>) -> CapabilityResult<()>;

    /// The `limit` closest records to `query`, best first.
    async fn search(&self, query: &[f32], limit: usize) -> CapabilityResult<Vec<VectorMatch>>;

    /// Remove records; unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> CapabilityResult<()>;
}
