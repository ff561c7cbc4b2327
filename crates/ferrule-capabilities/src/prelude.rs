//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ferrule_capabilities::prelude::*;` to import all contracts.

// Errors
pub use crate::{CapabilityError, CapabilityResult};

// Contracts
pub use crate::{
    AuthProvider, MfaProvider, StorageProvider, TermAligner, TermExtractor, TextVectorizer,
    Tokenizer, TranslatableFileHandler, TranslationAdvisor, VectorStorage,
};

// Typed service handles
pub use crate::{CapabilityKind, Service};
