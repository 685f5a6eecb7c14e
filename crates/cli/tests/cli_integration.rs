//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `cicd-stack` binary inside a scratch
//! project directory and verify exit codes, stdout and stderr.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A scratch project with a function bundle under `lambda/`.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("lambda")).unwrap();
    fs::write(
        tmp.path().join("lambda/main.py"),
        "def handler(event, context):\n    return {'statusCode': 200}\n",
    )
    .unwrap();
    tmp
}

/// Helper: create a Command for the binary, rooted at `dir`, with the
/// configuration variables cleared.
fn cicd_stack(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("cicd-stack");
    cmd.current_dir(dir)
        .env_remove("VERSION")
        .env_remove("CICD_STACK_BUNDLE")
        .env_remove("CICD_STACK_REGION")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout is JSON")
}

fn function_env(template: &Value) -> &Value {
    template["Resources"]
        .as_object()
        .unwrap()
        .values()
        .find(|r| r["Type"] == "AWS::Lambda::Function")
        .map(|r| &r["Properties"]["Environment"]["Variables"])
        .expect("function resource")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let tmp = project();
    cicd_stack(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serverless CI/CD stack"));
}

#[test]
fn version_exits_0() {
    let tmp = project();
    cicd_stack(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cicd-stack"));
}

// ──────────────────────────────────────────────
// 2. Synth
// ──────────────────────────────────────────────

#[test]
fn synth_prints_template_with_url_output() {
    let tmp = project();
    let template = stdout_json(cicd_stack(tmp.path()).arg("synth"));
    assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
    assert!(template["Outputs"]["Url"]["Value"]["Fn::GetAtt"].is_array());
    assert_eq!(template["Resources"].as_object().unwrap().len(), 6);
    assert!(function_env(&template)["TABLE_NAME"]["Ref"].is_string());
}

#[test]
fn synth_empty_version_defaults() {
    let tmp = project();
    let template = stdout_json(cicd_stack(tmp.path()).arg("synth").env("VERSION", ""));
    assert_eq!(function_env(&template)["VERSION"], "0.0");
}

#[test]
fn synth_version_from_environment() {
    let tmp = project();
    let template = stdout_json(cicd_stack(tmp.path()).arg("synth").env("VERSION", "1.2.3"));
    assert_eq!(function_env(&template)["VERSION"], "1.2.3");
}

#[test]
fn synth_env_file_then_flag_precedence() {
    let tmp = project();
    fs::write(tmp.path().join("deploy.env"), "VERSION=4.0\n").unwrap();

    let from_file = stdout_json(cicd_stack(tmp.path()).args(["synth", "--env-file", "deploy.env"]));
    assert_eq!(function_env(&from_file)["VERSION"], "4.0");

    let from_env = stdout_json(
        cicd_stack(tmp.path())
            .args(["synth", "--env-file", "deploy.env"])
            .env("VERSION", "4.1"),
    );
    assert_eq!(function_env(&from_env)["VERSION"], "4.1");

    let from_flag = stdout_json(cicd_stack(tmp.path()).args([
        "synth",
        "--env-file",
        "deploy.env",
        "--stack-version",
        "5.0",
    ]));
    assert_eq!(function_env(&from_flag)["VERSION"], "5.0");
}

#[test]
fn synth_reads_default_config_file() {
    let tmp = project();
    fs::rename(tmp.path().join("lambda"), tmp.path().join("src")).unwrap();
    fs::write(
        tmp.path().join("cicd-stack.toml"),
        "[stack]\ncode_bundle_path = \"src\"\nregion = \"eu-west-1\"\n",
    )
    .unwrap();

    let template = stdout_json(cicd_stack(tmp.path()).arg("synth"));
    let function = template["Resources"]
        .as_object()
        .unwrap()
        .values()
        .find(|r| r["Type"] == "AWS::Lambda::Function")
        .unwrap();
    assert_eq!(
        function["Properties"]["Code"]["S3Bucket"],
        "cicdawsstack-assets-eu-west-1"
    );
}

#[test]
fn synth_missing_bundle_exits_1() {
    let tmp = project();
    cicd_stack(tmp.path())
        .args(["synth", "--bundle", "does_not_exist"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("code_bundle_path"));
}

#[test]
fn synth_missing_bundle_json_error() {
    let tmp = project();
    let out = cicd_stack(tmp.path())
        .args(["--output", "json", "synth", "--bundle", "does_not_exist"])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let err: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(err["error"], "ConfigurationError");
    assert_eq!(err["input"], "code_bundle_path");
}

#[test]
fn synth_strict_version_rejects_malformed_tag() {
    let tmp = project();
    cicd_stack(tmp.path())
        .args(["synth", "--stack-version", "not a version", "--strict-version"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("version"));

    cicd_stack(tmp.path())
        .args(["synth", "--stack-version", "not a version"])
        .assert()
        .success();
}

#[test]
fn synth_manifest_has_etag() {
    let tmp = project();
    let manifest = stdout_json(cicd_stack(tmp.path()).args(["synth", "--manifest"]));
    let etag = manifest["etag"].as_str().unwrap();
    assert_eq!(etag.len(), 64);
    assert!(etag.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(manifest["template"]["Resources"].is_object());
}

#[test]
fn synth_is_deterministic() {
    let tmp = project();
    let first = cicd_stack(tmp.path()).arg("synth").output().unwrap().stdout;
    let second = cicd_stack(tmp.path()).arg("synth").output().unwrap().stdout;
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

// ──────────────────────────────────────────────
// 3. Diff
// ──────────────────────────────────────────────

#[test]
fn diff_identical_templates_exits_0() {
    let tmp = project();
    cicd_stack(tmp.path())
        .args(["synth", "--out", "a.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote a.json"));
    cicd_stack(tmp.path())
        .args(["diff", "a.json", "a.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no differences"));
}

#[test]
fn diff_version_change_exits_1() {
    let tmp = project();
    cicd_stack(tmp.path())
        .args(["synth", "--out", "v1.json", "--stack-version", "1.0"])
        .assert()
        .success();
    cicd_stack(tmp.path())
        .args(["synth", "--out", "v2.json", "--stack-version", "2.0"])
        .assert()
        .success();

    cicd_stack(tmp.path())
        .args(["diff", "v1.json", "v2.json"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("~ AWS::Lambda::Function"))
        .stdout(predicate::str::contains("Environment"));
}

#[test]
fn diff_rejects_non_template() {
    let tmp = project();
    fs::write(tmp.path().join("bad.json"), r#"{"Resources": {"A": {"Type": "Bogus"}}}"#).unwrap();
    cicd_stack(tmp.path())
        .args(["diff", "bad.json", "bad.json"])
        .assert()
        .failure()
        .code(1);
}

// ──────────────────────────────────────────────
// 4. Graph
// ──────────────────────────────────────────────

#[test]
fn graph_puts_table_in_first_layer() {
    let tmp = project();
    let graph = stdout_json(cicd_stack(tmp.path()).args(["--output", "json", "graph"]));
    let first: Vec<&str> = graph["layers"][0]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap())
        .collect();
    assert!(first.contains(&"AWS::DynamoDB::Table"));
    assert!(!first.contains(&"AWS::Lambda::Function"));
    assert!(!graph["edges"].as_array().unwrap().is_empty());
}

#[test]
fn graph_text_lists_layers() {
    let tmp = project();
    cicd_stack(tmp.path())
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("layer 0:"))
        .stdout(predicate::str::contains("->"));
}

// ──────────────────────────────────────────────
// 5. Deploy and plan
// ──────────────────────────────────────────────

#[test]
fn deploy_prints_url() {
    let tmp = project();
    cicd_stack(tmp.path())
        .arg("deploy")
        .assert()
        .success()
        .stdout(predicate::str::contains("Url = https://"))
        .stdout(predicate::str::contains(".lambda-url.us-east-1.on.aws/"));
}

#[test]
fn plan_without_state_creates_everything() {
    let tmp = project();
    let plan = stdout_json(cicd_stack(tmp.path()).args(["--output", "json", "plan"]));
    let changes = plan["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 6);
    assert!(changes.iter().all(|c| c["action"] == "create"));
}

#[test]
fn plan_after_deploy_is_empty() {
    let tmp = project();
    cicd_stack(tmp.path())
        .args(["deploy", "--state-out", "state.json"])
        .assert()
        .success();
    cicd_stack(tmp.path())
        .args(["plan", "--state", "state.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes."));
}

#[test]
fn redeploy_with_new_version_updates_function() {
    let tmp = project();
    cicd_stack(tmp.path())
        .args(["deploy", "--state-out", "state.json"])
        .assert()
        .success();

    cicd_stack(tmp.path())
        .args(["plan", "--state", "state.json", "--stack-version", "9.9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("~ AWS::Lambda::Function"));

    let result = stdout_json(cicd_stack(tmp.path()).args([
        "--output",
        "json",
        "deploy",
        "--state",
        "state.json",
        "--state-out",
        "state.json",
        "--stack-version",
        "9.9",
    ]));
    assert_eq!(result["status"], "Materialized");
    assert!(result["outputs"]["Url"].as_str().unwrap().starts_with("https://"));

    let state: Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("state.json")).unwrap()).unwrap();
    assert_eq!(state["complete"], true);
}

#[test]
fn deploy_rejects_state_of_other_stack() {
    let tmp = project();
    cicd_stack(tmp.path())
        .args(["deploy", "--state-out", "state.json"])
        .assert()
        .success();
    cicd_stack(tmp.path())
        .args(["deploy", "--state", "state.json", "--stack-name", "Other"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("belongs to stack"));
}
