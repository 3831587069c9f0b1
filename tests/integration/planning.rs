//! Planning tests: stage order, flag interplay and image preconditions.

use crate::common::Study;
use mri2mesh::{ImageRole, PlanError, Planner, StageFlags, StageKind};

#[test]
fn test_selected_stages_are_planned_in_canonical_order() {
    let study = Study::new();
    let flags = StageFlags {
        check: true,
        mni: true,
        brain: true,
        head: true,
        ..Default::default()
    };

    let plan = Planner::plan(&study.request(flags, 2)).unwrap();

    assert_eq!(
        plan.stages(),
        [StageKind::Brain, StageKind::Head, StageKind::Mni, StageKind::Check]
    );
}

#[test]
fn test_all_with_check_runs_every_stage_in_order() {
    let study = Study::new();
    let flags = StageFlags {
        all: true,
        check: true,
        ..Default::default()
    };

    let plan = Planner::plan(&study.request(flags, 4)).unwrap();

    assert_eq!(
        plan.stages(),
        [
            StageKind::Brain,
            StageKind::Subcortical,
            StageKind::Head,
            StageKind::VolumeMesh,
            StageKind::Mni,
            StageKind::Check,
        ]
    );
    assert!(!plan.cleanup());
}

#[test]
fn test_all_with_brainf_forces_surfaces() {
    let study = Study::new();
    let flags = StageFlags {
        all: true,
        brainf: true,
        ..Default::default()
    };

    let plan = Planner::plan(&study.request(flags, 2)).unwrap();

    assert_eq!(plan.stages()[0], StageKind::BrainForced);
    assert!(!plan.contains(StageKind::Brain));
}

#[test]
fn test_no_stage_flag_is_an_empty_plan() {
    let study = Study::new();
    let flags = StageFlags {
        keep_masks: true,
        nocleanup: true,
        ..Default::default()
    };

    let plan = Planner::plan(&study.request(flags, 0)).unwrap();

    assert!(plan.is_empty());
    assert!(!plan.warnings().is_empty());
}

#[test]
fn test_mni_needs_t1() {
    let study = Study::new();
    let flags = StageFlags {
        mni: true,
        ..Default::default()
    };

    let err = Planner::plan(&study.request(flags, 0)).unwrap_err();

    assert_eq!(
        err,
        PlanError::MissingImage {
            stage: StageKind::Mni,
            role: ImageRole::T1,
        }
    );
    assert!(Planner::plan(&study.request(flags, 1)).is_ok());
}

#[test]
fn test_brain_with_one_image_is_a_usage_error() {
    let study = Study::new();
    let flags = StageFlags {
        brain: true,
        ..Default::default()
    };

    let err = Planner::plan(&study.request(flags, 1)).unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("T1fs"));
}
