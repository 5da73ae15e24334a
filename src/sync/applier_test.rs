use crate::config::FormatConfig;
use crate::db::Validator;
use crate::sync::applier::*;
use crate::sync::command::{CommandDataLayer, MockCommandRunner};
use crate::sync::selection::{Origin, Target};
use crate::sync::store::{DumpStore, StoreError};
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use tempfile::TempDir;

fn installed(n: usize) -> Output {
    Output {
        status: ExitStatus::from_raw(0),
        stdout: format!("Installed {} object(s) from 1 fixture(s)\n", n).into_bytes(),
        stderr: Vec::new(),
    }
}

fn setup() -> (TempDir, DumpStore, Validator) {
    let temp_dir = TempDir::new().unwrap();
    let store = DumpStore::new(temp_dir.path()).unwrap();
    let validator = Validator::new(&FormatConfig::default()).unwrap();
    (temp_dir, store, validator)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_loading_into_server_reads_node_dump() {
    let (_temp_dir, store, validator) = setup();
    store.save("[]", Origin::Node).unwrap();

    let mut mock = MockCommandRunner::new();
    mock.expect_run()
        .withf(|args: &[String]| args[0] == "loaddata" && args[1].ends_with("node_dump.json"))
        .times(1)
        .returning(|_| Ok(installed(0)));

    let layer = CommandDataLayer::new(mock, "db");
    apply_dump(&layer, &store, &validator, Target::Server)
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_loading_into_node_reads_server_dump() {
    let (_temp_dir, store, validator) = setup();
    store
        .save(
            r#"[{"model": "db.faculty", "pk": 1, "fields": {"name": "Science"}}]"#,
            Origin::Server,
        )
        .unwrap();

    let mut mock = MockCommandRunner::new();
    mock.expect_run()
        .withf(|args: &[String]| args[1].ends_with("server_dump.json"))
        .times(1)
        .returning(|_| Ok(installed(1)));

    let layer = CommandDataLayer::new(mock, "db");
    let summary = apply_dump(&layer, &store, &validator, Target::Node)
        .await
        .unwrap();
    assert_eq!(summary.created, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_dump_never_reaches_the_data_layer() {
    let (_temp_dir, store, validator) = setup();
    // No expectations: any call to the runner fails the test
    let layer = CommandDataLayer::new(MockCommandRunner::new(), "db");

    let err = apply_dump(&layer, &store, &validator, Target::Node)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplyError::Store(StoreError::NotFound { origin: Origin::Server, .. })
    ));
    assert_eq!(err.to_string(), "server dump file not found");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_records_never_reach_the_data_layer() {
    let (_temp_dir, store, validator) = setup();
    store
        .save(
            r#"[{"model": "db.student", "pk": "not-a-reg-number", "fields": {"sex": 3}}]"#,
            Origin::Server,
        )
        .unwrap();

    let layer = CommandDataLayer::new(MockCommandRunner::new(), "db");
    let err = apply_dump(&layer, &store, &validator, Target::Node)
        .await
        .unwrap_err();

    match err {
        ApplyError::Validation(issues) => assert_eq!(issues.len(), 2),
        other => panic!("Expected Validation, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_data_layer_failure_is_surfaced() {
    let (_temp_dir, store, validator) = setup();
    store.save("[]", Origin::Server).unwrap();

    let mut mock = MockCommandRunner::new();
    mock.expect_run().times(1).returning(|_| {
        Err(crate::sync::command::CommandError::NonZeroExit {
            code: 1,
            output: "IntegrityError".to_string(),
        })
    });

    let layer = CommandDataLayer::new(mock, "db");
    let err = apply_dump(&layer, &store, &validator, Target::Node)
        .await
        .unwrap_err();
    assert!(matches!(err, ApplyError::Import(_)));
}
