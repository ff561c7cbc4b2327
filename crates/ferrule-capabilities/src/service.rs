//! The typed capability map.
//!
//! [`Service`] is a closed sum over every contract's trait object. Each
//! contract also gets a zero-sized marker implementing [`CapabilityKind`],
//! which ties the marker to its [`CapabilityType`], its trait object and the
//! `Service` variant carrying it. Registries store `Service` values and hand
//! back `Arc<dyn Contract>` through the marker.

use std::fmt;
use std::sync::Arc;

use ferrule_core::CapabilityType;

use crate::advisor::TranslationAdvisor;
use crate::auth::{AuthProvider, MfaProvider};
use crate::file_handler::TranslatableFileHandler;
use crate::storage::StorageProvider;
use crate::term::{TermAligner, TermExtractor};
use crate::tokenizer::Tokenizer;
use crate::vector::{TextVectorizer, VectorStorage};

/// Compile-time link between a marker type and one capability contract.
pub trait CapabilityKind {
    /// The capability type this marker stands for.
    const TYPE: CapabilityType;

    /// The contract trait object (`dyn StorageProvider`, ...).
    type Contract: ?Sized + Send + Sync;

    /// Borrow the contract out of a [`Service`] of the matching variant.
    fn extract(service: &Service) -> Option<Arc<Self::Contract>>;

    /// Wrap a contract instance into a [`Service`].
    fn wrap(contract: Arc<Self::Contract>) -> Service;
}

macro_rules! capability_map {
    ($(
        $(#[$meta:meta])*
        $variant:ident($contract:ident) => $ty:ident, $marker:ident, $ctor:ident;
    )+) => {
        /// A live capability instance contributed by an extension.
        #[derive(Clone)]
        pub enum Service {
            $(
                $(#[$meta])*
                $variant(Arc<dyn $contract>),
            )+
        }

        impl Service {
            $(
                #[doc = concat!("Wrap a [`", stringify!($contract), "`] implementation.")]
                pub fn $ctor<T: $contract + 'static>(inner: T) -> Self {
                    Self::$variant(Arc::new(inner))
                }
            )+

            /// The capability type implied by the variant.
            #[must_use]
            pub fn capability_type(&self) -> CapabilityType {
                match self {
                    $( Self::$variant(_) => CapabilityType::$ty, )+
                }
            }

            /// The capability type the instance reports about itself.
            ///
            /// Differs from [`capability_type`](Self::capability_type) only
            /// for a misbehaving implementation that overrides the constant
            /// accessor; the service registry rejects such instances.
            #[must_use]
            pub fn reported_type(&self) -> CapabilityType {
                match self {
                    $( Self::$variant(inner) => inner.capability_type(), )+
                }
            }

            /// The implementation's self-chosen capability id.
            #[must_use]
            pub fn id(&self) -> &str {
                match self {
                    $( Self::$variant(inner) => inner.id(), )+
                }
            }
        }

        $(
            #[doc = concat!("Marker for [`CapabilityType::", stringify!($ty), "`].")]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
            pub struct $marker;

            impl CapabilityKind for $marker {
                const TYPE: CapabilityType = CapabilityType::$ty;
                type Contract = dyn $contract;

                fn extract(service: &Service) -> Option<Arc<Self::Contract>> {
                    match service {
                        Service::$variant(inner) => Some(Arc::clone(inner)),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn wrap(contract: Arc<Self::Contract>) -> Service {
                    Service::$variant(contract)
                }
            }

            impl From<Arc<dyn $contract>> for Service {
                fn from(contract: Arc<dyn $contract>) -> Self {
                    Self::$variant(contract)
                }
            }
        )+
    };
}

capability_map! {
    /// A login method.
    Auth(AuthProvider) => AuthProvider, AuthCapability, auth;
    /// A second-factor method.
    Mfa(MfaProvider) => MfaProvider, MfaCapability, mfa;
    /// A blob storage backend.
    Storage(StorageProvider) => StorageProvider, StorageCapability, storage;
    /// An embedding engine.
    TextVectorizer(TextVectorizer) => TextVectorizer, VectorizerCapability, text_vectorizer;
    /// A vector similarity store.
    VectorStorage(VectorStorage) => VectorStorage, VectorStorageCapability, vector_storage;
    /// A file format handler.
    FileHandler(TranslatableFileHandler) => TranslatableFileHandler, FileHandlerCapability, file_handler;
    /// A suggestion source.
    Advisor(TranslationAdvisor) => TranslationAdvisor, AdvisorCapability, advisor;
    /// A terminology extractor.
    TermExtractor(TermExtractor) => TermExtractor, TermExtractorCapability, term_extractor;
    /// A term aligner.
    TermAligner(TermAligner) => TermAligner, TermAlignerCapability, term_aligner;
    /// A tokenizer.
    Tokenizer(Tokenizer) => Tokenizer, TokenizerCapability, tokenizer;
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("capability_type", &self.capability_type())
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::CapabilityResult;
    use crate::term::TermCandidate;
    use crate::tokenizer::Token;

    struct Whitespace;

    #[async_trait]
    impl Tokenizer for Whitespace {
        fn id(&self) -> &str {
            "whitespace"
        }

        fn priority(&self) -> i32 {
            10
        }

        async fn parse(&self, source: &str) -> CapabilityResult<Vec<Token>> {
            Ok(vec![Token::new("text", source, 0, source.len())])
        }
    }

    struct Liar;

    #[async_trait]
    impl Tokenizer for Liar {
        fn id(&self) -> &str {
            "liar"
        }

        fn capability_type(&self) -> CapabilityType {
            CapabilityType::StorageProvider
        }

        fn priority(&self) -> i32 {
            0
        }

        async fn parse(&self, _source: &str) -> CapabilityResult<Vec<Token>> {
            Ok(Vec::new())
        }
    }

    struct NoTerms;

    #[async_trait]
    impl TermExtractor for NoTerms {
        fn id(&self) -> &str {
            "none"
        }

        async fn extract(&self, _text: &str, _language: &str) -> CapabilityResult<Vec<TermCandidate>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_typed_extraction() {
        let service = Service::tokenizer(Whitespace);
        assert_eq!(service.capability_type(), CapabilityType::Tokenizer);
        assert_eq!(service.reported_type(), CapabilityType::Tokenizer);
        assert_eq!(service.id(), "whitespace");

        let tokenizer = TokenizerCapability::extract(&service).unwrap();
        assert_eq!(tokenizer.priority(), 10);
        assert_eq!(tokenizer.parse("a b").await.unwrap().len(), 1);

        assert!(TermExtractorCapability::extract(&service).is_none());
        assert!(StorageCapability::extract(&service).is_none());
    }

    #[test]
    fn test_wrap_matches_marker_type() {
        let contract: Arc<dyn TermExtractor> = Arc::new(NoTerms);
        let service = TermExtractorCapability::wrap(contract);
        assert_eq!(service.capability_type(), TermExtractorCapability::TYPE);

        let contract: Arc<dyn TermExtractor> = Arc::new(NoTerms);
        let from = Service::from(contract);
        assert_eq!(from.id(), "none");
    }

    #[test]
    fn test_reported_type_mismatch_is_visible() {
        let service = Service::tokenizer(Liar);
        assert_eq!(service.capability_type(), CapabilityType::Tokenizer);
        assert_eq!(service.reported_type(), CapabilityType::StorageProvider);
    }

    #[test]
    fn test_debug_shows_identity() {
        let rendered = format!("{:?}", Service::tokenizer(Whitespace));
        assert!(rendered.contains("Tokenizer"));
        assert!(rendered.contains("whitespace"));
    }
}
