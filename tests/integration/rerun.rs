//! Reruns over an existing workspace.

use crate::common::{Study, scripted_pipeline};
use mri2mesh::ledger::count_runs;
use mri2mesh::testing::ScriptedLauncher;
use mri2mesh::{StageFlags, StageStatus};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

fn head_outputs(study: &Study) -> Vec<PathBuf> {
    let mask_prep = study.workspace_root().join("mask_prep");
    ["skin.stl", "skull_outer.stl", "skull_inner.stl", "MASK_SKULL.nii.gz"]
        .iter()
        .map(|name| mask_prep.join(name))
        .collect()
}

fn head_launcher(study: &Study) -> Arc<ScriptedLauncher> {
    let outputs = head_outputs(study);
    let launcher = ScriptedLauncher::new()
        .touch_on_run("meshfix", &outputs[0])
        .touch_on_run("meshfix", &outputs[1])
        .touch_on_run("meshfix", &outputs[2])
        .touch_on_run("fslmaths", &outputs[3]);
    Arc::new(launcher)
}

#[tokio::test]
async fn test_keep_masks_leaves_existing_outputs_alone() {
    let study = Study::new();
    let flags = StageFlags {
        head: true,
        ..Default::default()
    };
    let keep = StageFlags {
        keep_masks: true,
        ..flags
    };

    let first = scripted_pipeline(&head_launcher(&study))
        .run(&study.request(flags, 2))
        .await
        .unwrap();
    assert_eq!(first.stages[0].status, StageStatus::Completed);
    assert!(head_outputs(&study).iter().all(|p| p.exists()));

    let skin = head_outputs(&study).remove(0);
    fs::write(&skin, "marker").unwrap();

    let launcher = head_launcher(&study);
    let second = scripted_pipeline(&launcher)
        .run(&study.request(keep, 2))
        .await
        .unwrap();

    assert_eq!(second.stages[0].status, StageStatus::Skipped);
    assert_eq!(fs::read_to_string(&skin).unwrap(), "marker");
    // Only the intersection checks ran.
    assert_eq!(launcher.programs(), ["meshfix", "meshfix"]);
    assert!(launcher.calls().iter().all(|c| !c.is_mutating()));
    assert_eq!(count_runs(&study.ledger()), Some(2));
}

#[tokio::test]
async fn test_without_keep_masks_outputs_are_recomputed() {
    let study = Study::new();
    let flags = StageFlags {
        head: true,
        ..Default::default()
    };
    for path in head_outputs(&study) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "marker").unwrap();
    }

    let report = scripted_pipeline(&head_launcher(&study))
        .run(&study.request(flags, 2))
        .await
        .unwrap();

    assert_eq!(report.stages[0].status, StageStatus::Completed);
    assert_ne!(fs::read_to_string(&head_outputs(&study)[0]).unwrap(), "marker");
}

#[tokio::test]
async fn test_keep_masks_with_missing_output_recomputes() {
    let study = Study::new();
    let flags = StageFlags {
        head: true,
        keep_masks: true,
        ..Default::default()
    };
    let outputs = head_outputs(&study);
    fs::create_dir_all(outputs[0].parent().unwrap()).unwrap();
    fs::write(&outputs[0], "marker").unwrap();

    let launcher = head_launcher(&study);
    let report = scripted_pipeline(&launcher)
        .run(&study.request(flags, 2))
        .await
        .unwrap();

    assert_eq!(report.stages[0].status, StageStatus::Completed);
    assert_eq!(launcher.programs()[0], "bet");
}

#[tokio::test]
async fn test_cache_reuses_surface_reconstruction() {
    let study = Study::new();
    let flags = StageFlags {
        brain: true,
        cache: true,
        ..Default::default()
    };
    let surf = study.path().join("fs_P01").join("surf");
    let mask_prep = study.workspace_root().join("mask_prep");
    fs::create_dir_all(&surf).unwrap();
    fs::create_dir_all(&mask_prep).unwrap();
    fs::write(study.workspace_root().join("T1fs_conform.nii.gz"), "nifti").unwrap();
    for hemi in ["lh", "rh"] {
        for surface in ["pial", "white"] {
            fs::write(surf.join(format!("{hemi}.{surface}")), "surface").unwrap();
            fs::write(mask_prep.join(format!("{hemi}.{surface}.stl")), "solid").unwrap();
        }
    }
    let launcher = Arc::new(ScriptedLauncher::new());

    let report = scripted_pipeline(&launcher)
        .run(&study.request(flags, 2))
        .await
        .unwrap();

    assert_eq!(report.stages[0].status, StageStatus::Skipped);
    assert_eq!(launcher.programs(), ["mris_euler_number", "mris_euler_number"]);
}

#[tokio::test]
async fn test_brainf_discards_previous_surfaces() {
    let study = Study::new();
    let flags = StageFlags {
        brainf: true,
        keep_masks: true,
        ..Default::default()
    };
    let stale = study.path().join("fs_P01").join("surf").join("lh.pial");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "stale").unwrap();
    let launcher = Arc::new(ScriptedLauncher::new());

    let report = scripted_pipeline(&launcher)
        .run(&study.request(flags, 2))
        .await
        .unwrap();

    assert_eq!(report.stages[0].status, StageStatus::Completed);
    assert!(!stale.exists());
    assert_eq!(launcher.programs()[0], "recon-all");
    assert!(study.ledger().contains("removed "));
}
