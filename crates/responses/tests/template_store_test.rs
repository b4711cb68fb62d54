//! Integration tests for [`responses::TemplateStore`].
//!
//! Writes template resources into a temp directory and loads them back: default sets,
//! locale overlays, missing files, and cache behaviour.

use std::fs;
use std::sync::Arc;

use dbot_core::DbotError;
use responses::TemplateStore;
use tempfile::TempDir;

const DEFAULT_SET: &str = r#"{
    "MessagePrompt": { "text": "What message do you want to send?", "inputHint": "expectingInput" },
    "MessageResponse": { "text": "You said: {message}", "speak": "You said {message}" }
}"#;

const GERMAN_SET: &str = r#"{
    "MessagePrompt": { "text": "Welche Nachricht möchtest du senden?", "inputHint": "expectingInput" }
}"#;

fn resources() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("SampleResponses.json"), DEFAULT_SET).unwrap();
    fs::write(dir.path().join("SampleResponses.de.json"), GERMAN_SET).unwrap();
    dir
}

/// **Test: Loading a set reads every template from `<id>.json`.**
#[test]
fn test_load_default_set() {
    let dir = resources();
    let store = TemplateStore::new(dir.path());

    let set = store.load("SampleResponses").unwrap();

    assert_eq!(set.id(), "SampleResponses");
    assert_eq!(set.len(), 2);
    assert_eq!(
        set.get("MessageResponse").unwrap().speak.as_deref(),
        Some("You said {message}")
    );
}

/// **Test: A locale file overrides matching names; other names fall back to the default set.**
#[test]
fn test_load_localized_overlays_default() {
    let dir = resources();
    let store = TemplateStore::new(dir.path());

    let set = store.load_localized("SampleResponses", Some("de")).unwrap();

    assert_eq!(
        set.get("MessagePrompt").unwrap().text,
        "Welche Nachricht möchtest du senden?"
    );
    assert_eq!(set.get("MessageResponse").unwrap().text, "You said: {message}");
}

/// **Test: A locale without its own file uses the default set.**
#[test]
fn test_load_localized_without_file_uses_default() {
    let dir = resources();
    let store = TemplateStore::new(dir.path());

    let set = store.load_localized("SampleResponses", Some("fr")).unwrap();

    assert_eq!(
        set.get("MessagePrompt").unwrap().text,
        "What message do you want to send?"
    );
}

/// **Test: A missing set is a config error naming the set.**
#[test]
fn test_missing_set_is_config_error() {
    let dir = resources();
    let store = TemplateStore::new(dir.path());

    match store.load("NoSuchResponses") {
        Err(DbotError::Config(message)) => assert!(message.contains("NoSuchResponses")),
        other => panic!("unexpected result: {other:?}"),
    }
}

/// **Test: Repeated loads return the same set without re-reading the file.**
#[test]
fn test_repeated_load_is_cached() {
    let dir = resources();
    let store = TemplateStore::new(dir.path());

    let first = store.load("SampleResponses").unwrap();
    fs::remove_file(dir.path().join("SampleResponses.json")).unwrap();
    let second = store.load("SampleResponses").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

/// **Test: Separate stores do not share a cache.**
#[test]
fn test_stores_do_not_share_cache() {
    let dir = resources();
    let first = TemplateStore::new(dir.path());
    first.load("SampleResponses").unwrap();

    fs::remove_file(dir.path().join("SampleResponses.json")).unwrap();
    let second = TemplateStore::new(dir.path());

    assert!(second.load("SampleResponses").is_err());
}

/// **Test: A localized load does not shadow a set whose id contains a dot.**
#[test]
fn test_localized_cache_entry_is_not_reused_for_dotted_id() {
    let dir = resources();
    let store = TemplateStore::new(dir.path());

    let localized = store.load_localized("SampleResponses", Some("de")).unwrap();
    assert_eq!(localized.len(), 2);

    let plain = store.load("SampleResponses.de").unwrap();
    assert_eq!(plain.id(), "SampleResponses.de");
    assert_eq!(plain.len(), 1);
    assert!(!plain.contains("MessageResponse"));
    assert!(!Arc::ptr_eq(&localized, &plain));
}
