//! Persisting the tab collection and restoring it after a relaunch.

mod common;

use common::TestContext;
use serde_yaml_ng::Value;
use std::path::Path;
use std::sync::Arc;
use tabkeep::session::SessionWriter;
use tabkeep::session::storage::load_session_from;
use tabkeep::tab::RestoreSummary;
use tabkeep::{
    ArtifactStore, Config, HandleState, HeadlessEngine, RegistryEvent, ScreenshotStore,
    TabRegistry,
};
use tempfile::TempDir;

/// Rewrite the session file at `path` through `edit`
fn edit_session_file(path: &Path, edit: impl FnOnce(&mut Vec<Value>)) {
    let contents = std::fs::read_to_string(path).unwrap();
    let mut session: Value = serde_yaml_ng::from_str(&contents).unwrap();
    let tabs = session
        .get_mut("tabs")
        .and_then(Value::as_sequence_mut)
        .expect("session file has a tab list");
    edit(tabs);
    std::fs::write(path, serde_yaml_ng::to_string(&session).unwrap()).unwrap();
}

fn set_field(tab: &mut Value, key: &str, value: Value) {
    tab.as_mapping_mut()
        .expect("tab record is a mapping")
        .insert(Value::String(key.to_string()), value);
}

#[test]
fn test_relaunch_restores_order_groups_pins_and_selection() {
    let mut ctx = TestContext::new();
    let a = ctx.open_live("https://a.test/");
    let b = ctx.registry.open("https://b.test/", None, false);
    let child = ctx.registry.open("https://a.test/child", Some(a), false);
    ctx.registry.select(child).unwrap();
    ctx.pump();
    ctx.navigate_all(child, &["/more"]);
    ctx.registry.set_pinned(b, true).unwrap();

    assert_eq!(ctx.registry.persist_all().unwrap(), 3);
    ctx.relaunch();
    assert_eq!(ctx.registry.tab_count(), 0);

    let summary = ctx.registry.restore_all().unwrap();
    assert_eq!(
        summary,
        RestoreSummary {
            restored: 3,
            skipped: 0,
            degraded: 0,
            archived: 0,
        }
    );
    let order: Vec<_> = ctx.registry.tabs().iter().map(|t| t.id()).collect();
    assert_eq!(order, vec![a, child, b]);

    let restored_child = ctx.registry.get(child).unwrap();
    assert_eq!(restored_child.root_id(), a);
    assert_eq!(restored_child.parent_id(), Some(a));
    assert!(ctx.registry.get(b).unwrap().is_pinned());
    assert!(ctx.registry.get(b).unwrap().pinned_at().is_some());

    // Only the selected tab gets a handle; the rest wait as zombies or cold tabs
    assert_eq!(ctx.registry.foreground_id(), Some(child));
    assert_eq!(
        ctx.registry.get(a).unwrap().handle_state(),
        HandleState::Zombie
    );
    assert_eq!(
        ctx.registry.get(b).unwrap().handle_state(),
        HandleState::Cold
    );

    ctx.pump();
    assert_eq!(ctx.stats.live_handles(), 1);
    let history = ctx.registry.get(child).unwrap().history().unwrap();
    assert_eq!(
        history.urls(),
        vec!["https://a.test/child", "https://a.test/more"]
    );
    assert_eq!(history.current_index, 1);
}

#[test]
fn test_restoring_twice_skips_duplicates() {
    let mut ctx = TestContext::new();
    ctx.open_live("https://a.test/");
    ctx.open_live("https://b.test/");
    ctx.registry.persist_all().unwrap();

    ctx.relaunch();
    assert_eq!(ctx.registry.restore_all().unwrap().restored, 2);
    let again = ctx.registry.restore_all().unwrap();
    assert_eq!(again.restored, 0);
    assert_eq!(again.skipped, 2);
    assert_eq!(ctx.registry.tab_count(), 2);
}

#[test]
fn test_unreadable_record_is_skipped() {
    let mut ctx = TestContext::new();
    let a = ctx.open_live("https://a.test/");
    ctx.open_live("https://b.test/");
    let c = ctx.open_live("https://c.test/");
    ctx.registry.persist_all().unwrap();

    edit_session_file(&ctx.session_path, |tabs| {
        set_field(&mut tabs[1], "id", Value::String("not-a-uuid".to_string()));
    });

    ctx.relaunch();
    let summary = ctx.registry.restore_all().unwrap();
    assert_eq!(summary.restored, 2);
    assert_eq!(summary.skipped, 1);
    assert!(ctx.registry.contains(a));
    assert!(ctx.registry.contains(c));
}

#[test]
fn test_corrupt_snapshot_restores_cold_at_current_url() {
    let mut ctx = TestContext::new();
    let a = ctx.open_live("https://a.test/");
    ctx.navigate_all(a, &["/deep/page"]);
    ctx.open_live("https://b.test/");
    ctx.registry.persist_all().unwrap();

    edit_session_file(&ctx.session_path, |tabs| {
        let mut snapshot = tabs[0]
            .get("session_snapshot")
            .cloned()
            .expect("live tab has a snapshot");
        set_field(
            &mut snapshot,
            "restore_url",
            Value::String("internal://local/session-restore?history=%7Bbroken".to_string()),
        );
        set_field(&mut tabs[0], "session_snapshot", snapshot);
        set_field(&mut tabs[0], "url", Value::String("https://stale.test/".to_string()));
    });

    ctx.relaunch();
    let summary = ctx.registry.restore_all().unwrap();
    assert_eq!(summary.restored, 2);
    assert_eq!(summary.degraded, 1);

    let tab = ctx.registry.get(a).unwrap();
    assert_eq!(tab.handle_state(), HandleState::Cold);
    assert_eq!(tab.url(), "https://a.test/deep/page");

    ctx.registry.select(a).unwrap();
    ctx.pump();
    let tab = ctx.registry.get(a).unwrap();
    assert!(tab.is_live());
    assert_eq!(tab.history().unwrap().urls(), vec!["https://a.test/deep/page"]);
}

#[test]
fn test_incognito_tabs_are_never_persisted() {
    let mut ctx = TestContext::new();
    let normal = ctx.open_live("https://normal.test/");
    let secret = ctx.registry.open("https://secret.test/", None, true);
    ctx.registry.select(secret).unwrap();
    ctx.pump();

    let captured = ctx.registry.capture_session();
    assert_eq!(captured.tabs.len(), 1);
    assert_eq!(captured.selected, None);

    ctx.registry.persist_all().unwrap();
    let on_disk = std::fs::read_to_string(&ctx.session_path).unwrap();
    assert!(!on_disk.contains("secret.test"));

    ctx.relaunch();
    ctx.registry.restore_all().unwrap();
    assert!(ctx.registry.contains(normal));
    assert!(!ctx.registry.contains(secret));
    assert_eq!(ctx.registry.foreground_id(), None);
}

#[test]
fn test_hand_edited_incognito_record_is_ignored() {
    let mut ctx = TestContext::new();
    ctx.open_live("https://a.test/");
    ctx.open_live("https://b.test/");
    ctx.registry.persist_all().unwrap();

    edit_session_file(&ctx.session_path, |tabs| {
        set_field(&mut tabs[0], "is_incognito", Value::Bool(true));
    });

    ctx.relaunch();
    let summary = ctx.registry.restore_all().unwrap();
    assert_eq!(summary.restored, 1);
    assert_eq!(summary.skipped, 1);
}

#[test]
fn test_missing_session_file_restores_nothing() {
    let mut ctx = TestContext::new();
    let summary = ctx.registry.restore_all().unwrap();
    assert_eq!(summary, RestoreSummary::default());
    assert_eq!(ctx.registry.tab_count(), 0);
}

#[test]
fn test_corrupt_session_file_is_an_error() {
    let mut ctx = TestContext::new();
    std::fs::write(&ctx.session_path, "tabs: [unclosed").unwrap();
    assert!(ctx.registry.restore_all().is_err());
    assert_eq!(ctx.registry.tab_count(), 0);
}

#[test]
fn test_stale_tabs_restore_into_archive() {
    let mut ctx = TestContext::new();
    let now = chrono::Utc::now();
    let old = ctx
        .registry
        .open_at("https://old.test/", None, false, now - chrono::Duration::days(45));
    ctx.open_live("https://fresh.test/");
    ctx.registry.persist_all().unwrap();

    ctx.relaunch();
    let summary = ctx.registry.restore_all().unwrap();
    assert_eq!(summary.restored, 2);
    assert_eq!(summary.archived, 1);
    assert!(ctx.registry.is_archived(old));
}

#[test]
fn test_backgrounding_flushes_writer() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("session.yaml");
    let runtime = Arc::new(tokio::runtime::Runtime::new().unwrap());
    let (engine, events) = HeadlessEngine::new(50);
    let mut registry = TabRegistry::new(Box::new(engine), Config::default())
        .with_writer(SessionWriter::new(Arc::clone(&runtime), path.clone()));
    let observed = registry.subscribe();

    let id = registry.open("https://a.test/", None, false);
    registry.select(id).unwrap();
    registry.drain_events(&events);

    let report = registry.on_app_background().unwrap().expect("writer report");
    assert_eq!(report.completed, 1);
    assert_eq!(report.abandoned, 0);
    assert!(observed
        .try_iter()
        .any(|e| e == RegistryEvent::Persisted { tabs: 1 }));

    let loaded = load_session_from(&path).unwrap().expect("session written");
    assert_eq!(loaded.session.selected, Some(id));
    assert_eq!(loaded.session.tabs.len(), 1);
}

#[test]
fn test_backgrounding_can_be_disabled() {
    let ctx_config = Config {
        persist_on_background: false,
        ..Config::default()
    };
    let mut ctx = TestContext::with_config(ctx_config);
    ctx.open_live("https://a.test/");

    assert_eq!(ctx.registry.on_app_background().unwrap(), None);
    assert!(!ctx.session_path.exists());
}

#[test]
fn test_closing_discards_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let store = ScreenshotStore::new(temp_dir.path().join("screenshots"));
    let (engine, _events) = HeadlessEngine::new(50);
    let mut registry =
        TabRegistry::new(Box::new(engine), Config::default()).with_artifacts(Box::new(store.clone()));

    let id = registry.open("https://a.test/", None, false);
    store.save(id, b"\x89PNG").unwrap();
    assert!(store.load(id).unwrap().is_some());

    registry.close(id).unwrap();
    assert_eq!(store.load(id).unwrap(), None);
}
