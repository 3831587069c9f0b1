//! Registration to MNI space and EEG electrode positions.
//!
//! The nonlinear warp is written into the workspace root so that later
//! tools can reuse it; the electrode positions are the standard 10-10
//! positions transformed into subject space.

use crate::config::Tool;
use crate::core::request::ImageRole;
use crate::core::stage::Stage;
use crate::core::types::StageKind;
use crate::planner::PlanError;

use super::StageCatalog;

pub(super) fn stage(catalog: &StageCatalog<'_>) -> Result<Stage, PlanError> {
    let kind = StageKind::Mni;
    let ws = catalog.workspace();
    let toolchain = catalog.toolchain();
    let t1 = catalog.image(kind, ImageRole::T1)?;
    let template = toolchain.mni_template();

    let affine = ws.scratch().join("T1_to_MNI.mat");
    let warp = ws.root().join("T1_to_MNI_warp.nii.gz");
    let positions = ws.eeg_positions().join("EEG10-10.csv");

    let mut stage = Stage::new(kind)
        .preserve(catalog.keep_masks())
        .command(
            catalog
                .command(Tool::Flirt)
                .arg("-in")
                .path_arg(t1)
                .arg("-ref")
                .path_arg(template)
                .arg("-omat")
                .path_arg(&affine)
                .build(),
        )
        .command(
            catalog
                .command(Tool::Fnirt)
                .arg(format!("--in={}", t1.display()))
                .arg(format!("--ref={}", template.display()))
                .arg(format!("--aff={}", affine.display()))
                .arg(format!("--cout={}", warp.display()))
                .build(),
        )
        .artifact(&warp);

    if catalog.request().flags().mnimaskskull {
        let warped = ws.root().join("MNI_MASK_SKULL.nii.gz");
        stage = stage
            .command(
                catalog
                    .command(Tool::ApplyWarp)
                    .arg(format!(
                        "--in={}",
                        ws.mask_prep().join("MASK_SKULL.nii.gz").display()
                    ))
                    .arg(format!("--ref={}", template.display()))
                    .arg(format!("--warp={}", warp.display()))
                    .arg(format!("--out={}", warped.display()))
                    .arg("--interp=nn")
                    .build(),
            )
            .artifact(warped);
    }

    let transform = catalog
        .command(Tool::Img2ImgCoord)
        .arg("-mm")
        .arg("-src")
        .path_arg(template)
        .arg("-dest")
        .path_arg(t1)
        .arg("-warp")
        .path_arg(&warp)
        .path_arg(toolchain.eeg_positions())
        .stdout_file(&positions)
        .build();

    Ok(stage.command(transform).artifact(positions))
}
