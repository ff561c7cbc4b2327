//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ferrule_plugins::prelude::*;` to import all essential types.

pub use crate::{
    Component, Extension, ExtensionHooks, ExtensionLoader, ExtensionMetadata, HookResult,
    PluginContext, PluginError, PluginRegistry, PluginResult, RouteContext, ScopeHandle,
    ScopeState, StaticCatalog,
};
