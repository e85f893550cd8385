//! Integration tests for model discovery and registration through a store.

mod common;

use common::{RecordingDriver, write_model};
use docstore_lifecycle::config::{ModelPaths, PathInput};
use docstore_lifecycle::db::SkipReason;
use docstore_lifecycle::models::{FieldType, SchemaBuilder, StoreState};
use docstore_lifecycle::{ConfigSlots, DbError, ModelPathOutcome, Store, StoreConfigInput};

const USER_MODEL: &str = r#"{
    "collection": "people",
    "timestamps": true,
    "fields": {
        "name": { "type": "string", "required": true },
        "age": "number"
    }
}"#;

const POST_MODEL: &str = r#"{ "fields": { "title": "string", "tags": { "type": "array", "items": "string" } } }"#;

fn input_with_models(paths: Vec<&std::path::Path>) -> StoreConfigInput {
    StoreConfigInput {
        path: PathInput {
            models: Some(ModelPaths::Many(
                paths.into_iter().map(|p| p.to_path_buf()).collect(),
            )),
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_default_models_directory_loaded_recursively() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "app/models/User.json", USER_MODEL);
    write_model(dir.path(), "app/models/blog/Post.json", POST_MODEL);
    write_model(dir.path(), "app/models/README.md", "not a model");

    let mut store = Store::new("mongo", RecordingDriver::new()).with_root(dir.path());
    let report = store.init(StoreConfigInput::default()).unwrap();

    assert_eq!(store.state(), StoreState::Initialized);
    assert!(report.is_clean());
    assert_eq!(report.loaded.len(), 2);

    let user = store.model("user").expect("decapitalized name");
    assert_eq!(user.collection(), "people");
    assert!(user.schema().options().timestamps);
    assert_eq!(user.schema().required_fields().collect::<Vec<_>>(), vec!["name"]);

    let post = store.model("post").unwrap();
    assert_eq!(post.collection(), "post");
    assert_eq!(
        post.schema().field("tags").unwrap().items,
        Some(FieldType::String)
    );
    assert!(store.model("User").is_none());
}

#[tokio::test]
async fn test_bad_units_are_skipped_and_loading_continues() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "models/Broken.json", "{ not json");
    write_model(dir.path(), "models/Empty.json", "null");
    write_model(dir.path(), "models/Listy.json", "[1, 2, 3]");
    write_model(dir.path(), "models/Odd.json", r#"{ "fields": { "id": "uuid" } }"#);
    write_model(dir.path(), "models/Valid.json", POST_MODEL);

    let mut store = Store::new("mongo", RecordingDriver::new()).with_root(dir.path());
    let report = store
        .init(input_with_models(vec![std::path::Path::new("models")]))
        .unwrap();

    assert_eq!(report.loaded, vec!["valid".to_string()]);
    assert_eq!(store.models().len(), 1);

    let reason_of = |name: &str| {
        report
            .skipped
            .iter()
            .find(|s| s.model_name == name)
            .map(|s| s.reason)
    };
    assert_eq!(reason_of("broken"), Some(SkipReason::Unreadable));
    assert_eq!(reason_of("empty"), Some(SkipReason::Empty));
    assert_eq!(reason_of("listy"), Some(SkipReason::NotADefinition));
    assert_eq!(reason_of("odd"), Some(SkipReason::InvalidSchema));
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_definitions_without_fields_are_registered() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "models/Bare.json", "{}");
    write_model(dir.path(), "models/NoFields.json", r#"{ "fields": {} }"#);

    let mut store = Store::new("mongo", RecordingDriver::new()).with_root(dir.path());
    let report = store
        .init(input_with_models(vec![std::path::Path::new("models")]))
        .unwrap();

    assert_eq!(report.loaded, vec!["bare".to_string(), "noFields".to_string()]);
    assert!(report.skipped.is_empty());
    assert!(store.model("noFields").unwrap().schema().fields().is_empty());
}

#[tokio::test]
async fn test_duplicate_name_keeps_first_registration() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "a/User.json", USER_MODEL);
    write_model(dir.path(), "b/user.json", POST_MODEL);

    let mut store = Store::new("mongo", RecordingDriver::new()).with_root(dir.path());
    let report = store
        .init(input_with_models(vec![
            &dir.path().join("a"),
            &dir.path().join("b"),
        ]))
        .unwrap();

    assert_eq!(report.loaded, vec!["user".to_string()]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::Duplicate);

    let user = store.model("user").unwrap();
    assert_eq!(user.collection(), "people");
    assert!(user.schema().field("title").is_none());
}

#[tokio::test]
async fn test_model_path_queued_before_init_and_loaded_after() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "early/User.json", USER_MODEL);
    write_model(dir.path(), "late/Post.json", POST_MODEL);

    let mut store = Store::new("mongo", RecordingDriver::new()).with_root(dir.path());

    let outcome = store.add_model_path("early").unwrap();
    assert!(matches!(outcome, ModelPathOutcome::Queued));
    assert!(store.model("user").is_none());

    store.init(StoreConfigInput::default()).unwrap();
    assert!(store.model("user").is_some());

    let config = store.config().unwrap();
    assert_eq!(
        config.path.models,
        vec![
            dir.path().join("app/models"),
            std::path::PathBuf::from("early")
        ]
    );

    match store.add_model_path("late").unwrap() {
        ModelPathOutcome::Loaded(report) => assert_eq!(report.loaded, vec!["post".to_string()]),
        ModelPathOutcome::Queued => panic!("path should load immediately after init"),
    }
    assert!(store.model("post").is_some());
}

#[tokio::test]
async fn test_single_model_path_string_accepted() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "Solo.json", POST_MODEL);

    let input: StoreConfigInput = serde_json::from_value(serde_json::json!({
        "path": { "models": dir.path().join("Solo.json") }
    }))
    .unwrap();

    let mut store = Store::new("mongo", RecordingDriver::new());
    let report = store.init(input).unwrap();
    assert_eq!(report.loaded, vec!["solo".to_string()]);
}

#[tokio::test]
async fn test_register_provider_from_code() {
    let mut store = Store::new("mongo", RecordingDriver::new());

    let account = |mut builder: SchemaBuilder| {
        builder.field("owner", FieldType::ObjectId).required();
        builder.field("balance", FieldType::Number).min(0.0);
        builder.build()
    };
    let model = store.register_provider("account", &account).unwrap();
    assert_eq!(model.name(), "account");
    assert_eq!(model.schema().fields().len(), 2);

    let err = store.register_provider("account", &account).unwrap_err();
    assert!(matches!(err, DbError::DuplicateModel { .. }));

    let invalid = |mut builder: SchemaBuilder| {
        builder.field("$where", FieldType::String);
        builder.build()
    };
    assert!(store.register_provider("operator", &invalid).is_err());
    assert!(store.model("operator").is_none());
}

#[tokio::test]
async fn test_merged_config_published_with_masked_password() {
    let dir = tempfile::tempdir().unwrap();
    let slots = ConfigSlots::new();
    let mut store = Store::new("primary", RecordingDriver::new())
        .with_root(dir.path())
        .with_config_slots(slots.clone());

    store
        .init(StoreConfigInput {
            user: Some("bob".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        })
        .unwrap();

    let published = slots.get("store.primary").expect("config slot");
    assert_eq!(published["password"], "****");
    assert_eq!(published["user"], "bob");
    assert_eq!(published["hostname"], "localhost");
    assert_eq!(published["port"], 27017);
    assert_eq!(published["options"]["pool_size"], 15);
    assert!(!published.to_string().contains("secret"));

    // The live config keeps the real password for connecting
    assert_eq!(
        store.config().unwrap().password.as_deref(),
        Some("secret")
    );
}
