//! Skin and skull surfaces.
//!
//! `bet -A` extracts the outer skin and both skull boundaries as meshes in
//! the scratch directory; each is then repaired and resampled to the
//! requested vertex count. A final read-only pass reports intersections
//! between neighbouring surfaces without failing the run.

use crate::config::Tool;
use crate::core::request::ImageRole;
use crate::core::stage::Stage;
use crate::core::types::StageKind;
use crate::planner::PlanError;

use super::StageCatalog;

/// (`bet` output suffix, repaired surface name)
const SURFACES: [(&str, &str); 3] = [
    ("outskin_mesh.off", "skin.stl"),
    ("outskull_mesh.off", "skull_outer.stl"),
    ("inskull_mesh.off", "skull_inner.stl"),
];

pub(super) fn stage(catalog: &StageCatalog<'_>) -> Result<Stage, PlanError> {
    let kind = StageKind::Head;
    let ws = catalog.workspace();
    let t1fs = catalog.image(kind, ImageRole::T1Fs)?;
    let prefix = ws.scratch().join("T1fs_brain");
    let vertices = catalog.request().vertex_count().to_string();

    let mut bet = catalog
        .command(Tool::Bet)
        .path_arg(t1fs)
        .path_arg(&prefix)
        .arg("-A");
    if catalog.request().flags().t2mask {
        bet = bet.arg("-A2").path_arg(catalog.image(kind, ImageRole::T2)?);
    }

    let skull_mask = ws.mask_prep().join("MASK_SKULL.nii.gz");
    let mut stage = Stage::new(kind)
        .preserve(catalog.keep_masks())
        .command(bet.build())
        .command(
            catalog
                .command(Tool::FslMaths)
                .arg(format!("{}_outskull_mask.nii.gz", prefix.display()))
                .arg("-bin")
                .path_arg(&skull_mask)
                .build(),
        )
        .artifact(skull_mask);

    for (suffix, name) in SURFACES {
        let repaired = ws.mask_prep().join(name);
        stage = stage
            .command(
                catalog
                    .command(Tool::Meshfix)
                    .arg(format!("{}_{suffix}", prefix.display()))
                    .arg("--vertices")
                    .arg(vertices.as_str())
                    .arg("--stl")
                    .arg("-o")
                    .path_arg(&repaired)
                    .build(),
            )
            .artifact(repaired);
    }

    let checks = [("skin.stl", "skull_outer.stl"), ("skull_outer.stl", "skull_inner.stl")];
    for (outer, inner) in checks {
        stage = stage.command(
            catalog
                .command(Tool::Meshfix)
                .path_arg(ws.mask_prep().join(outer))
                .path_arg(ws.mask_prep().join(inner))
                .arg("--shells")
                .arg("2")
                .arg("--intersect")
                .soft()
                .read_only()
                .build(),
        );
    }

    Ok(stage)
}
