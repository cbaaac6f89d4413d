//! CLI subprocess integration tests.
//!
//! These tests invoke the `libertine-manager` binary as a subprocess against
//! a stub container-manager executable and a temporary registry file, and
//! verify exit codes, stdout content, and registry side effects.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

fn manager_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_libertine-manager"))
}

fn stub_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("stub-container-manager");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn registry_in(dir: &Path) -> PathBuf {
    dir.join("ContainersConfig.json")
}

fn run_with(
    registry: &Path,
    tool: &Path,
    args: &[&str],
) -> std::process::Output {
    manager_bin()
        .arg("--registry")
        .arg(registry)
        .arg("--tool")
        .arg(tool)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn cli_version_exits_zero() {
    let output = manager_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "--version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("libertine-manager"),
        "version output must contain 'libertine-manager': {stdout}"
    );
}

#[test]
fn cli_help_exits_zero() {
    let output = manager_bin().arg("--help").output().unwrap();
    assert!(output.status.success(), "--help must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("create"), "help must list 'create' command");
    assert!(
        stdout.contains("destroy"),
        "help must list 'destroy' command"
    );
}

#[test]
fn cli_list_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    let tool = stub_tool(dir.path(), "exit 0");
    let output = run_with(&registry_in(dir.path()), &tool, &["list"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("no containers found"), "got: {stdout}");
}

#[test]
fn cli_create_records_ready_container() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "exit 0");

    let output = run_with(
        &registry,
        &tool,
        &["create", "xenial", "--distro", "xenial", "--name", "Xenial Xerus"],
    );
    assert!(
        output.status.success(),
        "create must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let content = std::fs::read_to_string(&registry).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&content).unwrap();
    let entry = &doc["containerList"][0];
    assert_eq!(entry["id"], "xenial");
    assert_eq!(entry["name"], "Xenial Xerus");
    assert_eq!(entry["installStatus"], "ready");
    assert_eq!(entry["distro"], "xenial");
}

#[test]
fn cli_create_failure_marks_entry_failed_and_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "echo 'bootstrap failed' >&2\nexit 1");

    let output = run_with(&registry, &tool, &["create", "broken"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Creating container broken failed"),
        "got: {stderr}"
    );
    assert!(stderr.contains("bootstrap failed"), "got: {stderr}");

    let content = std::fs::read_to_string(&registry).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(doc["containerList"][0]["installStatus"], "failed");
}

#[test]
fn cli_install_and_remove_track_installed_apps() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "exit 0");

    assert!(run_with(&registry, &tool, &["create", "c"]).status.success());
    assert!(run_with(&registry, &tool, &["install-package", "c", "0ad"])
        .status
        .success());

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&registry).unwrap()).unwrap();
    let apps = doc["containerList"][0]["installedApps"].as_array().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["packageName"], "0ad");
    assert_eq!(apps[0]["appStatus"], "installed");

    assert!(run_with(&registry, &tool, &["remove-package", "c", "0ad"])
        .status
        .success());
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&registry).unwrap()).unwrap();
    assert!(doc["containerList"][0]["installedApps"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn cli_failed_install_leaves_registry_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let ok_tool = stub_tool(dir.path(), "exit 0");
    assert!(run_with(&registry, &ok_tool, &["create", "c"])
        .status
        .success());

    let failing = dir.path().join("failing-tool");
    std::fs::write(&failing, "#!/bin/sh\necho 'E: no such package' >&2\nexit 100\n").unwrap();
    let mut perms = std::fs::metadata(&failing).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&failing, perms).unwrap();

    let output = run_with(&registry, &failing, &["install-package", "c", "ghost"]);
    assert_eq!(output.status.code(), Some(1));

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&registry).unwrap()).unwrap();
    assert!(doc["containerList"][0]["installedApps"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn cli_search_prints_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "printf 'libreoffice\\nlibreoffice-help\\n'");

    let output = run_with(&registry, &tool, &["search-cache", "c", "office"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("libreoffice\n"), "got: {stdout}");
    assert!(stdout.contains("libreoffice-help\n"), "got: {stdout}");
}

#[test]
fn cli_search_json_outputs_array() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "printf 'gimp\\n'");

    let output = run_with(&registry, &tool, &["--json", "search-cache", "c", "gimp"]);
    assert!(output.status.success());
    let parsed: Vec<String> =
        serde_json::from_slice(&output.stdout).expect("search --json must emit a JSON array");
    assert_eq!(parsed, vec!["gimp".to_owned()]);
}

#[test]
fn cli_invalid_container_id_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "exit 0");

    let output = run_with(&registry, &tool, &["update", "evil;id"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid request"), "got: {stderr}");
}

#[test]
fn cli_destroy_removes_registry_entry() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "exit 0");

    assert!(run_with(&registry, &tool, &["create", "c"]).status.success());
    assert!(run_with(&registry, &tool, &["destroy", "c"]).status.success());

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&registry).unwrap()).unwrap();
    assert!(doc["containerList"].as_array().unwrap().is_empty());
}

#[test]
fn cli_set_default_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "exit 0");

    assert!(run_with(&registry, &tool, &["create", "c"]).status.success());
    assert!(run_with(&registry, &tool, &["set-default", "c"])
        .status
        .success());
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&registry).unwrap()).unwrap();
    assert_eq!(doc["defaultContainer"], "c");

    assert!(run_with(&registry, &tool, &["set-default", "--clear"])
        .status
        .success());
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&registry).unwrap()).unwrap();
    assert_eq!(doc["defaultContainer"], "");
}

#[test]
fn cli_exec_prints_command_output() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "printf 'file-a\\nfile-b\\n'");

    let output = run_with(&registry, &tool, &["exec", "c", "--", "ls"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "file-a\nfile-b\n");
}

#[test]
fn cli_missing_tool_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());

    let output = run_with(
        &registry,
        Path::new("/nonexistent/libertine-container-manager"),
        &["update", "c"],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to start"), "got: {stderr}");
}

#[test]
fn cli_duplicate_create_suffixes_second_id() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let tool = stub_tool(dir.path(), "exit 0");

    assert!(run_with(&registry, &tool, &["create", "xenial"])
        .status
        .success());
    let output = run_with(&registry, &tool, &["create", "xenial"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("xenial-2"));

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&registry).unwrap()).unwrap();
    let ids: Vec<&str> = doc["containerList"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["xenial", "xenial-2"]);
}
