use mnemo_core::session::{SessionStore, Turn};
use mnemo_core::storage::{KeyValueStore, SESSIONS_KEY, SETTINGS_KEY};
use mnemo_infrastructure::FileKeyValueStore;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_sessions_survive_restart() {
    let temp_dir = TempDir::new().unwrap();

    let (active_id, turns) = {
        let kv = Arc::new(FileKeyValueStore::new(temp_dir.path()));
        let mut store = SessionStore::load(kv);
        let id = store.active_id().to_string();
        store.append_turn(&id, Turn::user("Hello")).unwrap();
        store.append_turn(&id, Turn::assistant("Hi! How can I help?")).unwrap();
        store
            .update_flags(&id, |flags| flags.learning_mode = true)
            .unwrap();
        store
            .update_settings(|s| s.set_field("temperature", "0.2"))
            .unwrap();
        (id, store.active().unwrap().turns().to_vec())
    };

    let kv = Arc::new(FileKeyValueStore::new(temp_dir.path()));
    let store = SessionStore::load(kv);

    assert_eq!(store.active_id(), active_id);
    let session = store.active().unwrap();
    assert_eq!(session.turns(), turns.as_slice());
    assert!(session.flags.learning_mode);
    assert_eq!(store.settings().temperature, 0.2);
}

#[test]
fn test_corrupt_files_are_discarded() {
    let temp_dir = TempDir::new().unwrap();
    let kv = FileKeyValueStore::new(temp_dir.path());
    kv.set(SESSIONS_KEY, "{\"broken\": ").unwrap();
    kv.set(SETTINGS_KEY, "not json at all").unwrap();

    let store = SessionStore::load(Arc::new(FileKeyValueStore::new(temp_dir.path())));

    assert_eq!(store.list().len(), 1);
    assert_eq!(store.active().unwrap().turn_count(), 0);
    let rewritten = kv.get(SESSIONS_KEY).unwrap().unwrap();
    assert!(rewritten.contains(store.active_id()));
}
