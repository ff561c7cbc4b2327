//! Prelude module - commonly used test helpers.

pub use crate::{
    HookLog, MemoryStorage, MockAdvisor, MockExtension, MockTokenizer, catalog_of,
    init_test_tracing, seed_all, seed_installation, test_project,
};
