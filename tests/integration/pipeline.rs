//! End-to-end runs against a scripted toolchain.

use crate::common::{Study, scripted_pipeline};
use mri2mesh::ledger::{CLOSE_MARKER, OPEN_MARKER, count_runs};
use mri2mesh::testing::{RecordingHandler, ScriptedLauncher};
use mri2mesh::{CleanupOutcome, Event, EventBus, RunOutcome, StageFlags, StageKind, StageStatus};
use std::sync::Arc;

#[tokio::test]
async fn test_noop_run_exits_zero_without_side_effects() {
    let study = Study::new();
    let launcher = Arc::new(ScriptedLauncher::new());

    let report = scripted_pipeline(&launcher)
        .run(&study.request(StageFlags::default(), 0))
        .await
        .unwrap();

    assert!(matches!(report.outcome, RunOutcome::NothingToDo));
    assert_eq!(report.exit_code(), 0);
    assert!(report.stages.is_empty());
    assert!(launcher.calls().is_empty());
    assert!(!study.workspace_root().exists());
}

#[tokio::test]
async fn test_failing_surface_reconstruction_aborts_run() {
    let study = Study::new();
    let launcher = Arc::new(ScriptedLauncher::new().fail_program("recon-all", 1));
    let flags = StageFlags {
        brain: true,
        subcort: true,
        head: true,
        ..Default::default()
    };

    let report = scripted_pipeline(&launcher)
        .run(&study.request(flags, 2))
        .await
        .unwrap();

    assert_eq!(report.exit_code(), 1);
    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted {
            stage: StageKind::Brain,
            ..
        }
    ));

    let programs = launcher.programs();
    assert_eq!(programs, ["recon-all"]);
    assert!(!programs.iter().any(|p| p == "run_first_all" || p == "bet"));

    let ledger = study.ledger();
    assert!(ledger.contains("recon-all -s fs_P01 -i"));
    assert!(ledger.contains("exit code 1"));
    assert!(ledger.contains(CLOSE_MARKER));
    assert_eq!(count_runs(&ledger), Some(1));
}

#[tokio::test]
async fn test_complete_run_executes_all_stages_and_cleans() {
    let study = Study::new();
    let launcher = Arc::new(ScriptedLauncher::new());
    let handler = Arc::new(RecordingHandler::new());
    let events = Arc::new(EventBus::new());
    events.register(handler.clone()).await;
    let flags = StageFlags {
        all: true,
        ..Default::default()
    };

    let report = scripted_pipeline(&launcher)
        .with_event_bus(events)
        .run(&study.request(flags, 2))
        .await
        .unwrap();

    assert_eq!(report.exit_code(), 0);
    let kinds: Vec<StageKind> = report.stages.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        [
            StageKind::Brain,
            StageKind::Subcortical,
            StageKind::Head,
            StageKind::VolumeMesh,
            StageKind::Mni,
        ]
    );
    assert!(report.stages.iter().all(|s| s.status == StageStatus::Completed));
    assert_eq!(report.cleanup, Some(CleanupOutcome::AlreadyEmpty));

    for dir in ["tmp", "mask_prep", "eeg_positions"] {
        assert!(study.workspace_root().join(dir).is_dir());
    }
    // The scripted position transform leaves its redirected output behind.
    assert!(
        study
            .workspace_root()
            .join("eeg_positions")
            .join("EEG10-10.csv")
            .exists()
    );

    let events = handler.events().await;
    assert!(matches!(events.first(), Some(Event::RunStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(Event::RunFinished { success: true, .. })
    ));
    let started = events
        .iter()
        .filter(|e| matches!(e, Event::StageStarted { .. }))
        .count();
    assert_eq!(started, 5);
}

#[tokio::test]
async fn test_check_and_qc_never_clean() {
    for flags in [
        StageFlags {
            head: true,
            check: true,
            ..Default::default()
        },
        StageFlags {
            head: true,
            qc: true,
            ..Default::default()
        },
    ] {
        let study = Study::new();
        let scratch = study.workspace_root().join("tmp");
        std::fs::create_dir_all(&scratch).unwrap();
        std::fs::write(scratch.join("T1fs_brain_outskin_mesh.off"), b"OFF").unwrap();
        let launcher = Arc::new(ScriptedLauncher::new());

        let report = scripted_pipeline(&launcher)
            .run(&study.request(flags, 2))
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(report.cleanup.is_none());
        assert!(scratch.join("T1fs_brain_outskin_mesh.off").exists());
        assert!(!study.ledger().contains("cleanup"));
    }
}

#[tokio::test]
async fn test_soft_failures_do_not_abort() {
    let study = Study::new();
    let launcher = Arc::new(
        ScriptedLauncher::new()
            .fail_program("mris_euler_number", 1)
            .unstartable("freeview"),
    );
    let flags = StageFlags {
        brain: true,
        check: true,
        ..Default::default()
    };

    let report = scripted_pipeline(&launcher)
        .run(&study.request(flags, 2))
        .await
        .unwrap();

    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.stages[0].soft_failures, 2);
    assert_eq!(report.stages[1].soft_failures, 1);
    assert!(study.ledger().contains("exit code 127"));
}

#[tokio::test]
async fn test_ledger_stays_well_formed_across_runs() {
    let study = Study::new();
    let ok = Arc::new(ScriptedLauncher::new());
    let failing = Arc::new(ScriptedLauncher::new().fail_program("gmsh", 1));
    let flags = StageFlags {
        volumemesh: true,
        ..Default::default()
    };

    scripted_pipeline(&ok)
        .run(&study.request(flags, 0))
        .await
        .unwrap();
    scripted_pipeline(&failing)
        .run(&study.request(flags, 0))
        .await
        .unwrap();
    scripted_pipeline(&ok)
        .run(&study.request(flags, 0))
        .await
        .unwrap();

    let ledger = study.ledger();
    assert_eq!(count_runs(&ledger), Some(3));
    assert_eq!(ledger.matches(OPEN_MARKER).count(), 3);
    assert!(ledger.contains("run aborted"));
    assert_eq!(ledger.matches("run completed").count(), 2);
}
