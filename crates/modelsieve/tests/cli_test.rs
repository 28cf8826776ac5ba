use std::path::{Path, PathBuf};
use std::process::Command;

use modelsieve_test_fixtures::{class_bytes, write_archive, write_class, ClassFileBuilder};

const MODEL: &str = "io/realm/annotations/RealmClass";
const PROXY: &str = "io/realm/internal/RealmObjectProxy";

fn modelsieve_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_modelsieve"))
}

/// A project with one class output directory and one dependency archive.
/// Returns the manifest path.
fn sample_project(root: &Path) -> PathBuf {
    let classes = root.join("classes");
    let dog = write_class(
        &classes,
        "app/Dog",
        &ClassFileBuilder::new("app/Dog").annotation(MODEL).build(),
    );
    let proxy = write_class(
        &classes,
        "app/DogRealmProxy",
        &ClassFileBuilder::new("app/DogRealmProxy")
            .super_class("app/Dog")
            .interface(PROXY)
            .annotation(MODEL)
            .build(),
    );
    let util = write_class(&classes, "app/Util", &class_bytes("app/Util", "java/lang/Object"));
    let stale = write_class(&classes, "app/Stale", &class_bytes("app/Stale", "java/lang/Object"));

    let jar = root.join("realm.jar");
    write_archive(
        &jar,
        &[
            ("io/", vec![]),
            ("io/realm/", vec![]),
            (
                "io/realm/internal/RealmObjectProxy.class",
                ClassFileBuilder::new(PROXY).interface_type().no_super_class().build(),
            ),
        ],
    );
    let gone = root.join("gone.jar");

    let manifest = serde_json::json!({
        "directories": [{
            "root": classes,
            "changed_files": {
                dog.to_string_lossy(): "added",
                proxy.to_string_lossy(): "added",
                util.to_string_lossy(): "changed",
                stale.to_string_lossy(): "notchanged",
            }
        }],
        "archives": [
            { "path": jar, "status": "unchanged" },
            { "path": gone, "status": "removed" },
        ]
    });
    let path = root.join("manifest.json");
    std::fs::write(&path, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
    path
}

#[test]
fn test_classify_json_output() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let manifest = sample_project(dir.path());

    let output = modelsieve_cmd()
        .args(["classify", &manifest.to_string_lossy(), "--format", "json"])
        .output()
        .expect("failed to run modelsieve classify");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "modelsieve classify failed: stdout={stdout}, stderr={stderr}"
    );

    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("should be valid JSON");
    assert_eq!(parsed["models"], serde_json::json!(["app.Dog"]));
    assert_eq!(
        parsed["working_set"]["direct_units"],
        serde_json::json!(["app.Dog", "app.DogRealmProxy", "app.Util"])
    );
    assert_eq!(
        parsed["working_set"]["referenced_units"],
        serde_json::json!(["io.realm.internal.RealmObjectProxy"])
    );
    assert_eq!(parsed["verdicts"]["app.DogRealmProxy"], "generated-proxy");
    assert_eq!(parsed["summary"]["models"], 1);
}

#[test]
fn test_classify_text_output() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let manifest = sample_project(dir.path());

    let output = modelsieve_cmd()
        .args(["classify", &manifest.to_string_lossy()])
        .output()
        .expect("failed to run modelsieve classify");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "classify should succeed: {stdout}");
    assert!(stdout.contains("Model types"), "should list models: {stdout}");
    assert!(stdout.contains("app.Dog"), "should name the model: {stdout}");
    assert!(
        stdout.contains("app.DogRealmProxy (generated proxy)"),
        "should show the excluded proxy: {stdout}"
    );
}

#[test]
fn test_scan_compact_json() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let manifest = sample_project(dir.path());

    let output = modelsieve_cmd()
        .args(["scan", &manifest.to_string_lossy(), "--format", "json", "--compact"])
        .output()
        .expect("failed to run modelsieve scan");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "scan should succeed: {stdout}");
    assert_eq!(stdout.trim().lines().count(), 1, "compact JSON should be single line");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("should be valid JSON");
    let direct = parsed["direct_units"].as_array().unwrap();
    assert!(!direct.contains(&serde_json::json!("app.Stale")));
}

#[test]
fn test_missing_candidate_exits_with_error() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let classes = dir.path().join("classes");
    std::fs::create_dir_all(&classes).unwrap();
    let manifest = serde_json::json!({
        "directories": [{
            "root": classes,
            "changed_files": { classes.join("Ghost.class").to_string_lossy(): "added" }
        }]
    });
    let path = dir.path().join("manifest.json");
    std::fs::write(&path, manifest.to_string()).unwrap();

    let output = modelsieve_cmd()
        .args(["classify", &path.to_string_lossy()])
        .output()
        .expect("failed to run modelsieve classify");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Ghost"), "should name the missing type: {stderr}");
}

#[test]
fn test_custom_markers_from_config() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let classes = dir.path().join("classes");
    let order = write_class(
        &classes,
        "shop/Order",
        &ClassFileBuilder::new("shop/Order").annotation("shop/Entity").build(),
    );
    std::fs::write(
        dir.path().join(".modelsieve.toml"),
        "[markers]\nmodel_annotation = \"shop.Entity\"\n",
    )
    .unwrap();
    let manifest = serde_json::json!({
        "directories": [{
            "root": classes,
            "changed_files": { order.to_string_lossy(): "modified" }
        }]
    });
    let path = dir.path().join("manifest.json");
    std::fs::write(&path, manifest.to_string()).unwrap();

    let output = modelsieve_cmd()
        .args(["classify", &path.to_string_lossy(), "--format", "json"])
        .output()
        .expect("failed to run modelsieve classify");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "classify should succeed: {stdout}");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("should be valid JSON");
    assert_eq!(parsed["models"], serde_json::json!(["shop.Order"]));
}

#[test]
fn test_init_creates_config() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let output = modelsieve_cmd()
        .args(["init"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run modelsieve init");

    assert!(output.status.success(), "init should succeed");

    let config_path = dir.path().join(".modelsieve.toml");
    assert!(config_path.exists(), ".modelsieve.toml should be created");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[markers]"), "should contain [markers] section");

    let again = modelsieve_cmd()
        .args(["init"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run modelsieve init");
    assert_eq!(again.status.code(), Some(2), "init without --force should refuse");
}

#[test]
fn test_rust_log_controls_log_output() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let manifest = sample_project(dir.path());

    let quiet = modelsieve_cmd()
        .args(["classify", &manifest.to_string_lossy()])
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run modelsieve classify");
    let stderr = String::from_utf8_lossy(&quiet.stderr);
    assert!(quiet.status.success());
    assert!(!stderr.contains("classification complete"), "default level is warn: {stderr}");

    let logged = modelsieve_cmd()
        .args(["classify", &manifest.to_string_lossy()])
        .env("RUST_LOG", "modelsieve_core=info")
        .output()
        .expect("failed to run modelsieve classify");
    let stderr = String::from_utf8_lossy(&logged.stderr);
    assert!(logged.status.success());
    assert!(stderr.contains("classification complete"), "RUST_LOG should enable info: {stderr}");
}
