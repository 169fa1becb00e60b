// ProjectRegistry selection: restore fallbacks, persistence, select errors

mod common;

use actuator_monitor::credential_store::{KvStore, MemoryKvStore, SELECTED_PROJECT_KEY};
use actuator_monitor::registry::{ProjectRegistry, SelectError};
use common::project;
use std::sync::Arc;

fn projects() -> Vec<actuator_monitor::models::Project> {
    vec![
        project("project-1", "http://one", false),
        project("project-2", "http://two", true),
        project("project-3", "http://three", true),
    ]
}

#[tokio::test]
async fn test_restore_prefers_saved_enabled_project() {
    let kv = Arc::new(MemoryKvStore::new());
    kv.set(SELECTED_PROJECT_KEY, "project-3").await.unwrap();
    let registry = ProjectRegistry::new("T", projects(), kv);
    assert_eq!(registry.restore().await.map(|p| p.id).as_deref(), Some("project-3"));
}

#[tokio::test]
async fn test_restore_skips_disabled_saved_project() {
    let kv = Arc::new(MemoryKvStore::new());
    kv.set(SELECTED_PROJECT_KEY, "project-1").await.unwrap();
    let registry = ProjectRegistry::new("T", projects(), kv.clone());

    let chosen = registry.restore().await.unwrap();
    assert_eq!(chosen.id, "project-2");
    assert_eq!(
        kv.get(SELECTED_PROJECT_KEY).await.unwrap().as_deref(),
        Some("project-2")
    );
}

#[tokio::test]
async fn test_restore_falls_back_to_first_when_none_enabled() {
    let kv = Arc::new(MemoryKvStore::new());
    let all_disabled = vec![
        project("project-1", "http://one", false),
        project("project-2", "http://two", false),
    ];
    let registry = ProjectRegistry::new("T", all_disabled, kv);
    assert_eq!(registry.restore().await.unwrap().id, "project-1");
}

#[tokio::test]
async fn test_restore_with_no_projects_selects_nothing() {
    let registry = ProjectRegistry::new("T", vec![], Arc::new(MemoryKvStore::new()));
    assert!(registry.restore().await.is_none());
    assert!(registry.current().await.is_none());
}

#[tokio::test]
async fn test_select_persists_and_rejects_unknown_or_disabled() {
    let kv = Arc::new(MemoryKvStore::new());
    let registry = ProjectRegistry::new("T", projects(), kv.clone());

    let selected = registry.select("project-3").await.unwrap();
    assert_eq!(selected.id, "project-3");
    assert_eq!(registry.current().await.unwrap().id, "project-3");
    assert_eq!(
        kv.get(SELECTED_PROJECT_KEY).await.unwrap().as_deref(),
        Some("project-3")
    );

    assert!(matches!(
        registry.select("project-9").await,
        Err(SelectError::NotFound(_))
    ));
    assert!(matches!(
        registry.select("project-1").await,
        Err(SelectError::Disabled(_))
    ));
    assert_eq!(registry.current().await.unwrap().id, "project-3");
}

#[tokio::test]
async fn test_reload_reselects_when_current_disappears() {
    // No ACTUATOR_MONITOR_RELOAD_TEST_PROJECT_* variables exist, so reload yields the built-in list.
    let kv = Arc::new(MemoryKvStore::new());
    let registry = ProjectRegistry::new(
        "ACTUATOR_MONITOR_RELOAD_TEST",
        vec![project("project-9", "http://gone", true)],
        kv,
    );
    registry.select("project-9").await.unwrap();

    registry.reload().await;
    assert_eq!(registry.projects().await.len(), 5);
    assert_eq!(registry.current().await.unwrap().id, "project-1");
}
