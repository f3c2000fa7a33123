use serde_json::json;

use super::*;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!(
            "brandframe_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
        .join("settings.json")
}

#[test]
fn memory_store_round_trips_and_notifies() {
    let store = MemorySettingsStore::new();
    let rx = store.subscribe();
    assert_eq!(store.get("departments").unwrap(), None);

    store.put("departments", json!([{"id": "a"}])).unwrap();
    assert_eq!(store.get("departments").unwrap(), Some(json!([{"id": "a"}])));
    assert_eq!(
        rx.try_recv().unwrap(),
        SettingsChange {
            key: "departments".into()
        }
    );
    assert!(rx.try_recv().is_err());
}

#[test]
fn dropped_subscribers_are_pruned() {
    let store = MemorySettingsStore::new();
    drop(store.subscribe());
    let live = store.subscribe();
    store.put("fonts", json!([])).unwrap();
    assert_eq!(live.try_recv().unwrap().key, "fonts");
    assert_eq!(lock(&store.subscribers.senders).len(), 1);
}

#[test]
fn every_subscriber_sees_every_write() {
    let store = MemorySettingsStore::new();
    let a = store.subscribe();
    let b = store.subscribe();
    store.put("fonts", json!([])).unwrap();
    store.put("departments", json!([])).unwrap();
    for rx in [a, b] {
        let keys: Vec<String> = rx.try_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["fonts".to_owned(), "departments".to_owned()]);
    }
}

#[test]
fn json_file_store_persists_across_opens() {
    let path = temp_path("settings_persist");
    let store = JsonFileSettingsStore::open(&path).unwrap();
    assert_eq!(store.get("fonts").unwrap(), None);
    store.put("fonts", json!([{"name": "Inter"}])).unwrap();
    drop(store);

    let reopened = JsonFileSettingsStore::open(&path).unwrap();
    assert_eq!(reopened.get("fonts").unwrap(), Some(json!([{"name": "Inter"}])));
    assert_eq!(reopened.base_dir(), path.parent().unwrap());

    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn corrupt_file_is_a_serde_error() {
    let path = temp_path("settings_corrupt");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"{not json").unwrap();
    assert!(matches!(
        JsonFileSettingsStore::open(&path),
        Err(BrandframeError::Serde(_))
    ));
    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}

#[test]
fn reload_picks_up_external_writes() {
    let path = temp_path("settings_reload");
    let store = JsonFileSettingsStore::open(&path).unwrap();
    store.put("departments", json!([])).unwrap();
    std::fs::write(&path, br#"{"departments": [{"id": "x"}]}"#).unwrap();
    store.reload().unwrap();
    assert_eq!(store.get("departments").unwrap(), Some(json!([{"id": "x"}])));
    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
}
