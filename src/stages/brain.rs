//! Cortical surface reconstruction.

use crate::config::Tool;
use crate::core::request::ImageRole;
use crate::core::stage::Stage;
use crate::core::types::StageKind;
use crate::planner::PlanError;

use super::StageCatalog;

const HEMISPHERES: [&str; 2] = ["lh", "rh"];
const SURFACES: [&str; 2] = ["pial", "white"];

pub(super) fn stage(catalog: &StageCatalog<'_>, forced: bool) -> Result<Stage, PlanError> {
    let kind = if forced {
        StageKind::BrainForced
    } else {
        StageKind::Brain
    };
    let request = catalog.request();
    let ws = catalog.workspace();
    let t1 = catalog.image(kind, ImageRole::T1)?;
    let t1fs = catalog.image(kind, ImageRole::T1Fs)?;
    let surfaces = ws.surfaces();

    let mut recon = catalog
        .command(Tool::ReconAll)
        .env("SUBJECTS_DIR", ws.base().display().to_string())
        .arg("-s")
        .arg(ws.surfaces_name())
        .arg("-i")
        .path_arg(t1);
    if request.flags().t2pial {
        recon = recon
            .arg("-T2")
            .path_arg(catalog.image(kind, ImageRole::T2)?)
            .arg("-T2pial");
    }

    let preserve = !forced && (request.flags().keep_masks || request.flags().cache);
    let mut stage = Stage::new(kind)
        .preserve(preserve)
        .command(recon.arg("-all").build())
        .command(
            catalog
                .command(Tool::MriConvert)
                .arg("--conform")
                .path_arg(t1fs)
                .path_arg(catalog.conformed_t1fs())
                .build(),
        )
        .artifact(catalog.conformed_t1fs());

    if forced {
        stage = stage.reset_dir(&surfaces);
    }

    for hemi in HEMISPHERES {
        for surface in SURFACES {
            let name = format!("{hemi}.{surface}");
            let exported = ws.mask_prep().join(format!("{name}.stl"));
            stage = stage
                .command(
                    catalog
                        .command(Tool::MrisConvert)
                        .path_arg(surfaces.join("surf").join(&name))
                        .path_arg(&exported)
                        .build(),
                )
                .artifact(surfaces.join("surf").join(&name))
                .artifact(exported);
        }
    }

    for hemi in HEMISPHERES {
        stage = stage.command(
            catalog
                .command(Tool::MrisEulerNumber)
                .path_arg(surfaces.join("surf").join(format!("{hemi}.white")))
                .soft()
                .read_only()
                .build(),
        );
    }

    Ok(stage)
}
