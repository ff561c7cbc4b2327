//! Resolving typed services through an activated scope.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use ferrule_capabilities::{
    AdvisorCapability, AdvisorStatus, Service, StorageCapability, SuggestionRequest,
    TokenizerCapability, collect_suggestions,
};
use ferrule_core::{CapabilityType, PluginId, Scope};
use ferrule_plugins::{PluginError, PluginRegistry};
use ferrule_storage::MemoryPluginStore;
use ferrule_test::{
    MemoryStorage, MockAdvisor, MockExtension, MockTokenizer, catalog_of, seed_all,
    seed_installation,
};
use tokio::io::AsyncReadExt;

#[tokio::test]
async fn storage_provider_resolves_and_works() {
    let mocks = [MockExtension::new("mem-storage").with_service(Service::storage(MemoryStorage::new("mem")))];
    let store = Arc::new(MemoryPluginStore::new());
    seed_all(&store, &Scope::global(), &mocks).await.unwrap();
    let registry = PluginRegistry::new(store, Arc::new(catalog_of(&mocks)));

    let handle = registry.get(&Scope::global()).await.unwrap();
    let storage = handle
        .services()
        .await
        .resolve::<StorageCapability>(&PluginId::from_static("mem-storage"), "mem")
        .unwrap();

    storage
        .put_stream("docs/readme.md", Box::pin(Cursor::new(b"# hi".to_vec())), None)
        .await
        .unwrap();
    let mut body = String::new();
    storage
        .get_stream("docs/readme.md")
        .await
        .unwrap()
        .read_to_string(&mut body)
        .await
        .unwrap();
    assert_eq!(body, "# hi");

    let url = storage
        .presigned_download_url("docs/readme.md", Duration::from_secs(300))
        .await
        .unwrap();
    assert_eq!(url.method, "GET");

    // Wrong kind, wrong id and wrong extension all miss.
    let services = handle.services().await;
    assert!(services
        .resolve::<TokenizerCapability>(&PluginId::from_static("mem-storage"), "mem")
        .is_none());
    assert!(services
        .resolve::<StorageCapability>(&PluginId::from_static("mem-storage"), "s3")
        .is_none());
    assert!(services
        .resolve::<StorageCapability>(&PluginId::from_static("other"), "mem")
        .is_none());
}

#[tokio::test]
async fn unbound_service_is_a_consistency_error() {
    let mocks = [MockExtension::new("sneaky")
        .with_service(Service::tokenizer(MockTokenizer::new("declared", 0)))
        .with_undeclared_service(Service::tokenizer(MockTokenizer::new("hidden", 0)))];
    let store = Arc::new(MemoryPluginStore::new());
    seed_all(&store, &Scope::global(), &mocks).await.unwrap();
    let registry = PluginRegistry::new(store, Arc::new(catalog_of(&mocks)));

    let err = registry.get(&Scope::global()).await.unwrap_err();
    assert!(matches!(
        err,
        PluginError::Consistency { bindings: 0, ref capability_id, .. } if capability_id == "hidden"
    ));
}

#[tokio::test]
async fn duplicated_binding_is_a_consistency_error() {
    let mock = MockExtension::new("dup").with_service(Service::tokenizer(MockTokenizer::new("twice", 0)));
    let store = Arc::new(MemoryPluginStore::new());
    let installation = seed_installation(&store, &Scope::global(), &mock).await.unwrap();
    store
        .insert_binding_unchecked(installation.id, CapabilityType::Tokenizer, "twice")
        .await
        .unwrap();
    let registry = PluginRegistry::new(store, Arc::new(catalog_of(&[mock])));

    let err = registry.get(&Scope::global()).await.unwrap_err();
    assert!(matches!(err, PluginError::Consistency { bindings: 2, .. }));
}

#[tokio::test]
async fn uninstall_cascade_breaks_activation() {
    let mock = MockExtension::new("gone").with_service(Service::tokenizer(MockTokenizer::new("t", 0)));
    let store = Arc::new(MemoryPluginStore::new());
    let installation = seed_installation(&store, &Scope::global(), &mock).await.unwrap();
    let (_, removed) = store.uninstall(installation.id).await.unwrap();
    assert_eq!(removed, 1);
    assert!(store.bindings_for(installation.id).await.is_empty());

    // With the installation gone the scope is simply empty.
    let registry = PluginRegistry::new(store, Arc::new(catalog_of(&[mock])));
    let handle = registry.get(&Scope::global()).await.unwrap();
    assert!(handle.services().await.is_empty());
}

#[tokio::test]
async fn installed_but_uncatalogued_extension_fails_to_load() {
    let mock = MockExtension::new("phantom");
    let store = Arc::new(MemoryPluginStore::new());
    seed_installation(&store, &Scope::global(), &mock).await.unwrap();
    let registry = PluginRegistry::new(store, Arc::new(catalog_of(&[])));

    let err = registry.get(&Scope::global()).await.unwrap_err();
    assert!(matches!(err, PluginError::LoadFailed { .. }));
}

#[tokio::test]
async fn advisors_fan_out_with_per_advisor_status() {
    let mocks = [
        MockExtension::new("deepl").with_service(Service::advisor(MockAdvisor::replying("deepl", "Hallo"))),
        MockExtension::new("offline").with_service(Service::advisor(MockAdvisor::failing("offline"))),
    ];
    let store = Arc::new(MemoryPluginStore::new());
    seed_all(&store, &Scope::global(), &mocks).await.unwrap();
    let registry = PluginRegistry::new(store, Arc::new(catalog_of(&mocks)));
    let handle = registry.get(&Scope::global()).await.unwrap();

    let advisors = handle.services().await.all::<AdvisorCapability>();
    assert_eq!(advisors.len(), 2);

    let request = SuggestionRequest {
        source_language: "en".into(),
        target_language: "de".into(),
        source_text: "Hello".into(),
        context: None,
    };
    let (suggestions, reports) = collect_suggestions(&advisors, &request).await;
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].text, "Hallo");
    assert_eq!(reports.len(), 2);
    assert!(matches!(reports[0].status, AdvisorStatus::Success { count: 1 }));
    assert!(matches!(reports[1].status, AdvisorStatus::Failed { .. }));
}

#[tokio::test]
async fn persistent_id_lookup() {
    let mocks = [MockExtension::new("tok")
        .with_service(Service::tokenizer(MockTokenizer::new("a", 1)))
        .with_service(Service::tokenizer(MockTokenizer::new("b", 2)))];
    let store = Arc::new(MemoryPluginStore::new());
    let installations = seed_all(&store, &Scope::global(), &mocks).await.unwrap();
    let bindings = store.bindings_for(installations[0].id).await;
    let registry = PluginRegistry::new(store, Arc::new(catalog_of(&mocks)));
    let handle = registry.get(&Scope::global()).await.unwrap();

    let services = handle.services().await;
    for binding in &bindings {
        let entry = services.find_by_persistent_id(binding.id).unwrap();
        assert_eq!(entry.capability_id, binding.capability_id);
    }
    assert_eq!(services.by_type(CapabilityType::Tokenizer).len(), 2);
    assert!(services.by_type(CapabilityType::StorageProvider).is_empty());
}
