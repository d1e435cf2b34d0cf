//! API shape tests — validates that serialized response bodies match the
//! field names and types the extension frontend expects.

use tutor_core::Settings;
use tutor_relay::{PortEvent, ResponseMetadata};
use tutor_store::{Answer, RenderingFormat, SavedFile, Word};

/// Word rows serialize camelCase with optional fields omitted, matching
/// the stored word shape the frontend reads.
#[test]
fn test_word_shape() {
    let mut word = Word::new(1, "hello");
    word.answers.insert(
        "Translate".into(),
        Answer {
            text: "你好".into(),
            format: RenderingFormat::Markdown,
            ..Answer::default()
        },
    );

    let json = serde_json::to_value(&word).unwrap();
    assert_eq!(json["idx"], 1);
    assert_eq!(json["text"], "hello");
    assert_eq!(json["answers"]["Translate"]["text"], "你好");
    assert_eq!(json["answers"]["Translate"]["format"], "markdown");
    assert_eq!(json["reviewCount"], 0);
    // Unset scheduling fields are omitted, not null
    assert!(json.get("nextReview").is_none());
    assert!(json.get("lastReviewed").is_none());
}

#[test]
fn test_file_shape() {
    let file = SavedFile {
        id: 3,
        name: "Day1".to_string(),
        category: "默认".to_string(),
        words: vec![Word::new(1, "hello")],
    };

    let json = serde_json::to_value(&file).unwrap();
    assert_eq!(json["id"], 3);
    assert_eq!(json["name"], "Day1");
    assert_eq!(json["category"], "默认");
    assert!(json["words"].is_array());
}

/// Settings serialize with the original key casing, including the
/// irregular names.
#[test]
fn test_settings_shape() {
    let json = serde_json::to_value(Settings::default()).unwrap();
    assert!(json["apiURL"].is_string());
    assert!(json["apiModel"].is_string());
    assert!(json["defaultUserLanguage"].is_string());
    assert!(json["tts"].is_object());
    assert!(json["proxy"].is_object());
    assert!(json["hotkey"].is_string());
    assert!(json["defaultLearningLanguage"].is_array());
}

/// Relay events on the wire: metadata has no `data` key, a chunk carries
/// both the metadata fields and `data`, an error nests `{name, message}`.
#[test]
fn test_proxy_event_shapes() {
    let meta = ResponseMetadata {
        ok: true,
        status: 200,
        status_text: "OK".into(),
        redirected: false,
        url: "https://api.openai.com/v1/chat/completions".into(),
    };

    let metadata = serde_json::to_value(PortEvent::Metadata(meta.clone())).unwrap();
    assert_eq!(metadata["ok"], true);
    assert_eq!(metadata["status"], 200);
    assert_eq!(metadata["statusText"], "OK");
    assert!(metadata.get("data").is_none());

    let chunk = serde_json::to_value(PortEvent::Chunk {
        meta,
        data: "data: {}".into(),
    })
    .unwrap();
    assert_eq!(chunk["data"], "data: {}");
    assert_eq!(chunk["url"], "https://api.openai.com/v1/chat/completions");
}

/// RPC request bodies follow `{service, method, args}` with camelCase
/// method names and arg keys.
#[test]
fn test_rpc_request_shape() {
    let parsed = tutor_relay::rpc::parse_request(serde_json::json!({
        "service": "file",
        "method": "loadWordsByPage",
        "args": { "fileId": 1, "page": 2 }
    }));
    assert!(parsed.is_ok());

    let rejected = tutor_relay::rpc::parse_request(serde_json::json!({
        "service": "file",
        "method": "loadWordsByPage",
        "args": { "file": 1 }
    }));
    assert!(rejected.is_err());
}

/// Action export is a bare array whose entries round-trip through import.
#[test]
fn test_action_export_shape() {
    let dir = tempfile::tempdir().unwrap();
    let store = tutor_store::ActionStore::open(dir.path()).unwrap();
    store
        .import_json(r#"{"actions": [{"name": "Translate", "groups": ["基础"]}]}"#)
        .unwrap();

    let exported = store.export_json(None).unwrap();
    let json: serde_json::Value = serde_json::from_str(&exported).unwrap();
    assert!(json.is_array());
    assert_eq!(json[0]["name"], "Translate");
    assert_eq!(json[0]["groups"][0], "基础");
}
