//! End-to-end runs of the `legend` binary

use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const SPEC: &str = r#"
service: checkout
components:
  redis:
    dimensions:
      - instance: cache:6379
"#;

fn legend(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_legend"))
        .args(args)
        .env("LEGEND_HOME", home)
        .env_remove("LEGEND_CONFIG")
        .env_remove("LEGEND_LIBRARY_DIR")
        .env_remove("GRAFONNET_REPO_NAME")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

/// Local stand-in for the grafonnet-lib remote, one commit on `master`
#[cfg(unix)]
fn grafonnet_origin(dir: &Path) -> PathBuf {
    use git2::{Repository, RepositoryInitOptions, Signature};

    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("master");
    let repo = Repository::init_opts(dir, &opts).unwrap();
    std::fs::create_dir_all(dir.join("grafonnet")).unwrap();
    std::fs::write(dir.join("grafonnet/grafana.libsonnet"), "{}\n").unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new("grafonnet/grafana.libsonnet")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::now("legend", "legend@localhost").unwrap();
    repo.commit(Some("HEAD"), &signature, &signature, "grafonnet", &tree, &[])
        .unwrap();
    dir.to_path_buf()
}

#[cfg(unix)]
fn stub_jsonnet(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let jsonnet = dir.join("jsonnet");
    std::fs::write(
        &jsonnet,
        "#!/bin/sh\nprintf '{\"title\": \"compiled\", \"lib\": \"%s\"}\\n' \"$2\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&jsonnet, std::fs::Permissions::from_mode(0o755)).unwrap();
    jsonnet
}

#[test]
fn test_components() {
    let home = TempDir::new().unwrap();
    let output = legend(home.path(), &["components"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let components: Vec<&str> = stdout.lines().collect();
    assert_eq!(components, vec!["elb", "http", "rds", "redis", "sqs"]);
}

#[test]
fn test_missing_explicit_config() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.cfg");
    let output = legend(home.path(), &["-c", missing.to_str().unwrap(), "components"]);
    assert!(!output.status.success());
}

#[test]
fn test_delete_without_grafana_config() {
    let home = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_legend"))
        .args(["delete", "--uid", "abc"])
        .env("LEGEND_HOME", home.path())
        .env_remove("GRAFANA_API_KEY")
        .env_remove("GRAFANA_HOST")
        .env_remove("GRAFANA_PROTOCOL")
        .env("RUST_LOG", "error")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Incomplete legend config"), "{}", stderr);
}

#[cfg(unix)]
#[test]
fn test_build_with_stub_compiler() {
    let home = TempDir::new().unwrap();
    let jsonnet = stub_jsonnet(home.path());
    std::fs::create_dir_all(home.path().join("grafonnet-lib")).unwrap();

    let spec = home.path().join("spec.yaml");
    std::fs::write(&spec, SPEC).unwrap();
    let out = home.path().join("dashboard.json");

    let output = Command::new(env!("CARGO_BIN_EXE_legend"))
        .args(["build", "-f", spec.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .env("LEGEND_HOME", home.path())
        .env("LEGEND_JSONNET_BIN", &jsonnet)
        .env_remove("GRAFONNET_REPO_NAME")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let dashboard: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(dashboard["title"], "compiled");
    assert_eq!(
        dashboard["lib"],
        home.path().join("grafonnet-lib").to_str().unwrap()
    );
}

#[cfg(unix)]
#[test]
fn test_build_clones_missing_grafonnet() {
    let home = TempDir::new().unwrap();
    let origin = grafonnet_origin(&home.path().join("origin"));
    let jsonnet = stub_jsonnet(home.path());
    let spec = home.path().join("spec.yaml");
    std::fs::write(&spec, SPEC).unwrap();
    let out = home.path().join("dashboard.json");

    let output = Command::new(env!("CARGO_BIN_EXE_legend"))
        .args(["build", "-f", spec.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .env("LEGEND_HOME", home.path())
        .env("LEGEND_JSONNET_BIN", &jsonnet)
        .env("GRAFONNET_REPO_URL", &origin)
        .env_remove("GRAFONNET_REPO_NAME")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(home
        .path()
        .join("grafonnet-lib/grafonnet/grafana.libsonnet")
        .is_file());
    assert!(out.is_file());
}

#[test]
fn test_offline_build_without_grafonnet_fails_early() {
    let home = TempDir::new().unwrap();
    let spec = home.path().join("spec.yaml");
    std::fs::write(&spec, SPEC).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_legend"))
        .args(["build", "-f", spec.to_str().unwrap(), "--offline"])
        .env("LEGEND_HOME", home.path())
        .env_remove("GRAFONNET_REPO_NAME")
        .env("RUST_LOG", "error")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("run `legend install` first"), "{}", stderr);
    assert_eq!(stderr.matches("grafonnet library not found").count(), 1, "{}", stderr);
}
