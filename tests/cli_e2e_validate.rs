//! End-to-end tests for the `validate` command.

mod common;
use common::prelude::*;

#[test]
fn test_validate_accepts_complete_config() {
    let fixture = TestFixture::new();
    fixture.write_config("https://gitlab.example.com/api/v4/projects", true);

    fixture
        .command()
        .arg("validate")
        .arg(fixture.config_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("bare"));
}

#[test]
fn test_validate_rejects_missing_request_url() {
    let fixture = TestFixture::new();
    fixture.write_raw_config("backup_dir = \"backup\"\n");

    fixture
        .command()
        .arg("validate")
        .arg(fixture.config_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No request_url"));
}

#[test]
fn test_validate_rejects_missing_backup_dir_key() {
    let fixture = TestFixture::new();
    fixture.write_raw_config("request_url = \"https://example.com/repos\"\n");

    fixture
        .command()
        .arg("validate")
        .arg(fixture.config_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No backup_dir"));
}

#[test]
fn test_validate_rejects_nonexistent_backup_dir() {
    let fixture = TestFixture::new();
    fixture.write_raw_config(
        "request_url = \"https://example.com/repos\"\nbackup_dir = \"nowhere\"\n",
    );

    fixture
        .command()
        .arg("validate")
        .arg(fixture.config_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_validate_rejects_unknown_key_with_hint() {
    let fixture = TestFixture::new();
    fixture.write_raw_config(
        "request_url = \"https://example.com/repos\"\nbackup_dir = \"backup\"\nclone_baer = true\n",
    );

    fixture
        .command()
        .arg("validate")
        .arg(fixture.config_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("hint"));
}

#[test]
fn test_validate_accepts_yaml_with_camel_case_keys() {
    let fixture = TestFixture::new();
    let path = fixture.path().join("backup.yaml");
    std::fs::write(
        &path,
        "requestUrl: https://api.github.com/users/octocat/repos\nbackupDir: backup\ncloneBare: false\n",
    )
    .unwrap();

    fixture
        .command()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("mirror"));
}

#[test]
fn test_validate_check_listing() {
    let fixture = TestFixture::new();
    let url = serve_listing(r#"[{"path": "a", "clone_url": "x"}]"#);
    fixture.write_config(&url, false);

    fixture
        .command()
        .arg("validate")
        .arg("--check-listing")
        .arg(fixture.config_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Listing returned 1 repositories"));
}
