use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn multisite(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("multisite").unwrap();
    cmd.env_remove("MULTISITE_URL")
        .env_remove("MULTISITE_NETWORK_ID")
        .env("RUST_LOG", "off")
        .arg("--database-url")
        .arg(format!("sqlite://{}", dir.join("multisite.db").display()))
        .arg("--media-dir")
        .arg(dir.join("media"));
    cmd
}

fn installed() -> TempDir {
    let dir = TempDir::new().unwrap();
    multisite(dir.path())
        .args([
            "--migrate",
            "--network-domain",
            "example.com",
            "--admin-email",
            "root@example.com",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success: Network 1 installed at example.com"));
    dir
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("multisite").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Administer the sites of a multisite content network"));
}

#[test]
fn test_cli_site_help() {
    let mut cmd = Command::cargo_bin("multisite").unwrap();
    cmd.args(["site", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("empty"))
        .stdout(predicate::str::contains("move"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_list_requires_installed_network() {
    let dir = TempDir::new().unwrap();
    multisite(dir.path())
        .args(["site", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: This is not a multisite install."));
}

#[test]
fn test_create_list_delete() {
    let dir = installed();

    multisite(dir.path())
        .args(["site", "create", "--slug", "docs", "--porcelain"])
        .assert()
        .success()
        .stdout("2\n");

    multisite(dir.path())
        .args(["site", "list", "--format", "csv", "--fields", "blog_id,url"])
        .assert()
        .success()
        .stdout("blog_id,url\n1,example.com/\n2,example.com/docs/\n");

    multisite(dir.path())
        .args(["site", "delete", "2", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Success: The site at http://example.com/docs/ was deleted.",
        ));

    multisite(dir.path())
        .args(["site", "list", "--format", "url"])
        .assert()
        .success()
        .stdout("http://example.com/\n");
}

#[test]
fn test_create_rejects_reserved_slug() {
    let dir = installed();
    multisite(dir.path())
        .args(["site", "create", "--slug", "feed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reserved and cannot be used as blog names"));
}

#[test]
fn test_delete_without_target() {
    let dir = installed();
    multisite(dir.path())
        .args(["site", "delete", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Need to specify a blog id."));
}
