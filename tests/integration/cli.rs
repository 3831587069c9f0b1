//! Exit codes and side effects of the `mri2mesh` binary.

use crate::common::Study;
use mri2mesh::Tool;
use std::process::{Command, Output};

fn mri2mesh(study: &Study, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mri2mesh"))
        .current_dir(study.path())
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_noop_exits_zero() {
    let study = Study::new();

    let output = mri2mesh(&study, &["P01"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(!study.workspace_root().exists());
}

#[test]
fn test_brain_with_one_image_is_usage_error() {
    let study = Study::new();
    study.images(1);

    let output = mri2mesh(&study, &["--brain", "P01", "P01_T1.nii.gz"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(!study.workspace_root().exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("exiting"));
}

#[test]
fn test_three_images_is_usage_error() {
    let study = Study::new();
    study.images(3);

    let output = mri2mesh(
        &study,
        &["--head", "P01", "P01_T1.nii.gz", "P01_T1fs.nii.gz", "P01_T2.nii.gz"],
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(!study.workspace_root().exists());
}

#[test]
fn test_unreadable_image_fails_without_workspace() {
    let study = Study::new();

    let output = mri2mesh(&study, &["--brain", "P01", "missing_T1.nii.gz", "missing_T1fs.nii.gz"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!study.workspace_root().exists());
}

#[test]
fn test_zero_vertices_is_rejected_by_the_parser() {
    let study = Study::new();

    let output = mri2mesh(&study, &["--head", "--numvertices=0", "P01"]);

    assert!(!output.status.success());
    assert!(!study.workspace_root().exists());
}

#[test]
fn test_hard_failure_exits_one_and_closes_ledger() {
    let study = Study::new();
    study.images(2);

    let output = Command::new(env!("CARGO_BIN_EXE_mri2mesh"))
        .current_dir(study.path())
        .env("RUST_LOG", "off")
        .env("MRI2MESH_RECON_ALL", "false")
        .args(["--brain", "--subcort", "P01", "P01_T1.nii.gz", "P01_T1fs.nii.gz"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let ledger = study.ledger();
    assert!(ledger.contains("SUBJECTS_DIR=. false -s fs_P01 -i P01_T1.nii.gz -all"));
    assert!(ledger.contains("run aborted"));
    assert!(!ledger.contains("run_first_all"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("exiting"));
}

#[test]
fn test_stage_banners_follow_canonical_order() {
    let study = Study::new();
    study.images(2);

    let mut command = Command::new(env!("CARGO_BIN_EXE_mri2mesh"));
    for tool in Tool::ALL {
        command.env(tool.env_var(), "true");
    }
    let output = command
        .current_dir(study.path())
        .env("RUST_LOG", "off")
        .args([
            "--mni",
            "--head",
            "--subcort",
            "--brain",
            "P01",
            "P01_T1.nii.gz",
            "P01_T1fs.nii.gz",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let ledger = study.ledger();
    let positions: Vec<usize> = ["brain", "subcort", "head", "mni"]
        .iter()
        .map(|name| ledger.find(&format!("<h2>{name}: ")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}
