//! Tetrahedral head mesh.

use crate::config::Tool;
use crate::core::stage::Stage;
use crate::core::types::StageKind;

use super::StageCatalog;

pub(super) fn stage(catalog: &StageCatalog<'_>) -> Stage {
    let ws = catalog.workspace();
    let merged = ws.scratch().join("head_surfaces.stl");
    let mesh = ws.mesh();

    let merge = catalog
        .command(Tool::Meshfix)
        .path_arg(ws.mask_prep().join("skin.stl"))
        .path_arg(ws.mask_prep().join("skull_outer.stl"))
        .path_arg(ws.mask_prep().join("skull_inner.stl"))
        .arg("--shells")
        .arg("3")
        .arg("--no-clean")
        .arg("--stl")
        .arg("-o")
        .path_arg(&merged)
        .build();

    let tetrahedralize = catalog
        .command(Tool::Gmsh)
        .arg("-3")
        .arg("-format")
        .arg("msh2")
        .arg("-o")
        .path_arg(&mesh)
        .path_arg(&merged)
        .build();

    let inspect = catalog
        .command(Tool::Gmsh)
        .arg("-check")
        .path_arg(&mesh)
        .soft()
        .read_only()
        .build();

    Stage::new(StageKind::VolumeMesh)
        .preserve(catalog.keep_masks())
        .command(merge)
        .command(tetrahedralize)
        .command(inspect)
        .artifact(mesh)
}
