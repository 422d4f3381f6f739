use assert_cmd::Command;
use tempfile::TempDir;

fn write_snapshot(dir: &TempDir, file_name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(file_name);
    std::fs::write(&path, body).unwrap();
    path
}

const EMPTY_OBJECTS: &str = "[]";

fn snapshot_json(database: &str, objects: &str) -> String {
    format!(
        r#"{{"DatabaseName":"{database}","GeneratedAtUtc":"2026-01-01T00:00:00Z","Objects":{objects}}}"#
    )
}

#[test]
fn diff_between_identical_snapshots_is_empty_and_exits_zero() {
    let dir = TempDir::new().unwrap();
    let source = write_snapshot(&dir, "source.json", &snapshot_json("App", EMPTY_OBJECTS));
    let target = write_snapshot(&dir, "target.json", &snapshot_json("App", EMPTY_OBJECTS));
    let out = dir.path().join("diff.sql");

    Command::cargo_bin("sqldiff")
        .unwrap()
        .arg("diff")
        .arg("--source-snapshot")
        .arg(&source)
        .arg("--target-snapshot")
        .arg(&target)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let script = std::fs::read_to_string(&out).unwrap();
    assert!(!script.contains("Drops"));
    assert!(!script.contains("Creates"));
}

#[test]
fn diff_with_new_table_emits_create() {
    let dir = TempDir::new().unwrap();
    let objects = r#"[{"Type":"Table","Schema":"dbo","Name":"T","Definition":"CREATE TABLE [dbo].[T] ( [Id] int NOT NULL );\nGO\n","Dependencies":[]}]"#;
    let source = write_snapshot(&dir, "source.json", &snapshot_json("App", objects));
    let target = write_snapshot(&dir, "target.json", &snapshot_json("App", EMPTY_OBJECTS));
    let out = dir.path().join("diff.sql");

    Command::cargo_bin("sqldiff")
        .unwrap()
        .arg("diff")
        .arg("--source-snapshot")
        .arg(&source)
        .arg("--target-snapshot")
        .arg(&target)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let script = std::fs::read_to_string(&out).unwrap();
    assert!(script.contains("CREATE TABLE [dbo].[T]"));
}

#[test]
fn diff_rejects_both_connection_and_snapshot() {
    let dir = TempDir::new().unwrap();
    let target = write_snapshot(&dir, "target.json", &snapshot_json("App", EMPTY_OBJECTS));

    Command::cargo_bin("sqldiff")
        .unwrap()
        .arg("diff")
        .arg("--source-conn")
        .arg("server=db;database=App;user=sa;password=x")
        .arg("--source-snapshot")
        .arg(dir.path().join("source.json"))
        .arg("--target-snapshot")
        .arg(&target)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn diff_requires_a_source() {
    let dir = TempDir::new().unwrap();
    let target = write_snapshot(&dir, "target.json", &snapshot_json("App", EMPTY_OBJECTS));

    Command::cargo_bin("sqldiff")
        .unwrap()
        .arg("diff")
        .arg("--target-snapshot")
        .arg(&target)
        .assert()
        .failure()
        .code(1);
}
