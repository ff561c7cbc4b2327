//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ferrule_storage::prelude::*;` to import all essential types.

pub use crate::{
    ExtensionRecord, Installation, MemoryPluginStore, PluginStore, ServiceBinding, StorageError,
    StorageResult,
};
