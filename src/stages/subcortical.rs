//! Subcortical segmentation.

use crate::config::Tool;
use crate::core::stage::Stage;
use crate::core::types::StageKind;

use super::StageCatalog;

pub(super) fn stage(catalog: &StageCatalog<'_>) -> Stage {
    let ws = catalog.workspace();
    let mri = ws.surfaces().join("mri");
    let scratch = ws.scratch();
    let aseg = ws.mask_prep().join("aseg.nii.gz");
    let mask = ws.mask_prep().join("MASK_SUBCORT.nii.gz");
    let orig = scratch.join("orig.nii.gz");
    let first = scratch.join("first");

    Stage::new(StageKind::Subcortical)
        .preserve(catalog.keep_masks())
        .command(
            catalog
                .command(Tool::MriConvert)
                .path_arg(mri.join("aseg.mgz"))
                .path_arg(&aseg)
                .build(),
        )
        .command(
            catalog
                .command(Tool::MriConvert)
                .path_arg(mri.join("orig.mgz"))
                .path_arg(&orig)
                .build(),
        )
        .command(
            catalog
                .command(Tool::RunFirstAll)
                .arg("-i")
                .path_arg(&orig)
                .arg("-o")
                .path_arg(&first)
                .arg("-b")
                .build(),
        )
        .command(
            catalog
                .command(Tool::FslMaths)
                .path_arg(scratch.join("first_all_fast_firstseg.nii.gz"))
                .arg("-bin")
                .path_arg(&mask)
                .build(),
        )
        .artifact(aseg)
        .artifact(mask)
}
