use attrarium::attribute::AttrValue;
use attrarium::config::{DEFAULT_MAX_TEXT_LENGTH, StorageMode, StoreConfig, init_tracing};
use attrarium::store::AttrStore;

#[test]
fn defaults_give_an_in_memory_store() {
    let config = StoreConfig::default();
    assert_eq!(config.storage(), StorageMode::InMemory);
    assert_eq!(config.max_text_length, DEFAULT_MAX_TEXT_LENGTH);
}

#[test]
fn load_without_a_file_falls_back_to_defaults() {
    let config = StoreConfig::load(None).expect("load");
    assert_eq!(config.storage(), StorageMode::InMemory);
    assert_eq!(config.max_text_length, DEFAULT_MAX_TEXT_LENGTH);
}

#[test]
fn load_reads_a_config_file() {
    let path = "test_attrarium_config.toml";
    std::fs::write(path, "max_text_length = 16\ndatabase = \"attrs.db\"\n").expect("write");
    let config = StoreConfig::load(Some(path)).expect("load");
    let _ = std::fs::remove_file(path);
    assert_eq!(config.max_text_length, 16);
    assert_eq!(config.storage(), StorageMode::File("attrs.db".to_owned()));
}

#[test]
fn file_mode_persists_across_reopen() {
    init_tracing();
    // Use a temp path; ensure a clean start
    let path = "test_attrarium_temp.db".to_string();
    let _ = std::fs::remove_file(&path);
    let config = StoreConfig {
        database: Some(path.clone()),
        max_text_length: 64,
    };
    let id = {
        let store = AttrStore::open(&config).expect("store");
        store
            .create(&AttrValue::Text("kept".to_owned()))
            .expect("create")
            .id()
    };
    let store = AttrStore::open(&config).expect("reopen");
    let loaded = store.load(id).expect("load");
    assert_eq!(
        store.materialize(&loaded).unwrap(),
        AttrValue::Text("kept".to_owned())
    );
    // the identity generator resumes past what was restored
    let fresh = store.create(&AttrValue::Bool(true)).expect("create");
    assert!(
        fresh.id() > id,
        "restored store must not hand out identities again"
    );
    // Clean up
    let _ = std::fs::remove_file(&path);
}
