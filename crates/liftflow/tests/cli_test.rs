#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::{ARENA, TestProject};
use predicates::prelude::*;

fn lift() -> Command {
    let mut cmd = Command::cargo_bin("lift").unwrap();
    cmd.env_remove("LIFT_CONFIG_PATH").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    lift()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("GameLift"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_cli_version() {
    lift()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("liftflow"));
}

#[test]
fn test_destroy_help() {
    lift()
        .args(["destroy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_import_requires_arguments() {
    let project = TestProject::new();
    project.write_manifest(ARENA);

    lift()
        .current_dir(project.path())
        .args(["import", "fleet"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_command() {
    lift().arg("invalid-command").assert().failure();
}

#[test]
fn test_validate_ok() {
    let project = TestProject::new();
    project.write_manifest(ARENA);

    lift()
        .current_dir(project.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest is valid"))
        .stdout(predicate::str::contains("Fleets: 1"))
        .stdout(predicate::str::contains("Scaling policies: 1"))
        .stdout(predicate::str::contains("us-west-2"));
}

#[test]
fn test_validate_finds_manifest_in_project_dir() {
    let project = TestProject::new();
    project.write(".liftflow/lift.kdl", ARENA);

    lift()
        .current_dir(project.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains(".liftflow"));
}

#[test]
fn test_validate_reports_bad_port_range() {
    let project = TestProject::new();
    project.write_manifest(
        r#"
        fleet "arena" {
            build-id "build-1111"
            ec2-instance-type "c5.large"
            ec2-inbound-permission from-port=9000 to-port=8000 ip-range="0.0.0.0/0" protocol="UDP"
        }
        "#,
    );

    lift()
        .current_dir(project.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("fleet:arena"));
}

#[test]
fn test_validate_reports_undeclared_fleet() {
    let project = TestProject::new();
    project.write_manifest(
        r#"
        scaling_policy "orphan" {
            fleet "missing"
            metric-name "ActiveInstances"
            policy-type "TargetBased"
            target-configuration target-value=5.0
        }
        "#,
    );

    lift()
        .current_dir(project.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("undeclared fleet missing"));
}

#[test]
fn test_validate_without_project() {
    let empty = TestProject::new();

    lift()
        .current_dir(empty.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no manifest found"));
}

#[test]
fn test_config_flag_and_env() {
    let project = TestProject::new();
    project.write("envs/prod.kdl", ARENA);
    let elsewhere = TestProject::new();

    lift()
        .current_dir(elsewhere.path())
        .args(["--config", project.join("envs/prod.kdl").to_str().unwrap(), "validate"])
        .assert()
        .success();

    lift()
        .current_dir(elsewhere.path())
        .env("LIFT_CONFIG_PATH", project.join("envs/prod.kdl"))
        .arg("validate")
        .assert()
        .success();
}

#[test]
fn test_show_empty_state() {
    let project = TestProject::new();
    project.write_manifest(ARENA);

    lift()
        .current_dir(project.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("arena"))
        .stdout(predicate::str::contains("No resources tracked"));
}

#[test]
fn test_unsupported_provider() {
    let project = TestProject::new();
    project.write_manifest(r#"provider "azure-playfab""#);

    lift()
        .current_dir(project.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported provider"));
}
