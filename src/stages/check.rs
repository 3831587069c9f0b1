//! Visual inspection of the results.

use crate::config::Tool;
use crate::core::command::CaptureMode;
use crate::core::stage::Stage;
use crate::core::types::StageKind;

use super::StageCatalog;

const VIEWPORTS: [&str; 3] = ["sagittal", "coronal", "axial"];

pub(super) fn stage(catalog: &StageCatalog<'_>) -> Stage {
    let ws = catalog.workspace();
    let surfaces = ["skin.stl", "skull_outer.stl", "skull_inner.stl"].map(|s| ws.mask_prep().join(s));

    let viewer = || {
        let mut cmd = catalog
            .command(Tool::Freeview)
            .arg("-v")
            .path_arg(catalog.conformed_t1fs())
            .arg("-f");
        for surface in &surfaces {
            cmd = cmd.path_arg(surface);
        }
        cmd.soft().read_only().capture(CaptureMode::StatusOnly)
    };

    let stage = Stage::new(StageKind::Check);
    if !catalog.request().flags().qc {
        return stage.command(viewer().build());
    }

    VIEWPORTS.into_iter().fold(stage, |stage, viewport| {
        let screenshot = ws.root().join(format!("qc_{viewport}.png"));
        stage.command(
            viewer()
                .arg("-viewport")
                .arg(viewport)
                .arg("-ss")
                .path_arg(screenshot)
                .arg("-quit")
                .build(),
        )
    })
}
