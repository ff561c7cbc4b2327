//! Capability contracts for the Ferrule extension runtime.
//!
//! Every [`CapabilityType`](ferrule_core::CapabilityType) maps to exactly one
//! contract trait in this crate. Extensions implement the contracts; host
//! code only ever programs against them:
//!
//! - [`StorageProvider`]: blob storage with streaming and presigned URLs
//! - [`AuthProvider`] / [`MfaProvider`]: login and second-factor methods
//! - [`TextVectorizer`] / [`VectorStorage`]: embeddings and similarity search
//! - [`TranslatableFileHandler`]: extract/export translatable file content
//! - [`TranslationAdvisor`]: translation suggestions
//! - [`TermExtractor`] / [`TermAligner`]: terminology tooling
//! - [`Tokenizer`]: source text token streams
//!
//! A live capability instance travels through the runtime as a [`Service`],
//! a closed sum type over the contract trait objects. Typed lookups go
//! through the [`CapabilityKind`] marker types so callers get the concrete
//! trait object back without downcasting:
//!
//! ```rust,ignore
//! let storage: Option<Arc<dyn StorageProvider>> =
//!     services.resolve::<StorageCapability>(&plugin_id, "s3");
//! ```
//!
//! # Errors
//!
//! Contract operations fail with [`CapabilityError`]. The registries never
//! catch these: retry and fallback policy belongs to the caller (see
//! [`collect_suggestions`] for the advisor fan-out pattern).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod advisor;
pub mod auth;
pub mod error;
pub mod file_handler;
pub mod service;
pub mod storage;
pub mod term;
pub mod tokenizer;
pub mod vector;

pub use advisor::{
    AdvisorReport, AdvisorStatus, Suggestion, SuggestionRequest, TranslationAdvisor,
    collect_suggestions,
};
pub use auth::{AuthOutcome, AuthProvider, AuthRequest, AuthenticatedUser, MfaProvider};
pub use error::{CapabilityError, CapabilityResult};
pub use file_handler::{ElementTranslation, FileInfo, TranslatableElement, TranslatableFileHandler};
pub use service::{
    AdvisorCapability, AuthCapability, CapabilityKind, FileHandlerCapability, MfaCapability,
    Service, StorageCapability, TermAlignerCapability, TermExtractorCapability,
    TokenizerCapability, VectorStorageCapability, VectorizerCapability,
};
pub use storage::{ByteStream, ObjectMeta, PresignedUrl, StorageProvider};
pub use term::{AlignmentRequest, TermAligner, TermAlignment, TermCandidate, TermExtractor};
pub use tokenizer::{Token, Tokenizer};
pub use vector::{TextVectorizer, VectorMatch, VectorRecord, VectorStorage};
