//! Locations of the external collaborators.
//!
//! Every tool is invoked by its canonical program name unless overridden by
//! an environment variable named `MRI2MESH_<TOOL>`, where `<TOOL>` is the
//! program name upper-cased with dashes replaced by underscores
//! (`MRI2MESH_RECON_ALL`, `MRI2MESH_MESHFIX`, ...).

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

/// Prefix of the override variables.
pub const ENV_PREFIX: &str = "MRI2MESH_";

/// The external programs a run may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    // surface reconstruction toolkit
    ReconAll,
    MriConvert,
    MrisConvert,
    MrisEulerNumber,
    // registration toolkit
    RunFirstAll,
    Bet,
    FslMaths,
    Flirt,
    Fnirt,
    ApplyWarp,
    Img2ImgCoord,
    // surface repair
    Meshfix,
    // volume mesher
    Gmsh,
    // viewer
    Freeview,
}

impl Tool {
    pub const ALL: [Tool; 14] = [
        Tool::ReconAll,
        Tool::MriConvert,
        Tool::MrisConvert,
        Tool::MrisEulerNumber,
        Tool::RunFirstAll,
        Tool::Bet,
        Tool::FslMaths,
        Tool::Flirt,
        Tool::Fnirt,
        Tool::ApplyWarp,
        Tool::Img2ImgCoord,
        Tool::Meshfix,
        Tool::Gmsh,
        Tool::Freeview,
    ];

    /// Canonical program name.
    pub fn program(&self) -> &'static str {
        match self {
            Tool::ReconAll => "recon-all",
            Tool::MriConvert => "mri_convert",
            Tool::MrisConvert => "mris_convert",
            Tool::MrisEulerNumber => "mris_euler_number",
            Tool::RunFirstAll => "run_first_all",
            Tool::Bet => "bet",
            Tool::FslMaths => "fslmaths",
            Tool::Flirt => "flirt",
            Tool::Fnirt => "fnirt",
            Tool::ApplyWarp => "applywarp",
            Tool::Img2ImgCoord => "img2imgcoord",
            Tool::Meshfix => "meshfix",
            Tool::Gmsh => "gmsh",
            Tool::Freeview => "freeview",
        }
    }

    /// Name of the environment variable overriding this tool.
    pub fn env_var(&self) -> String {
        format!(
            "{}{}",
            ENV_PREFIX,
            self.program().to_ascii_uppercase().replace('-', "_")
        )
    }
}

/// Program names and reference data used by the stage catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    programs: HashMap<Tool, String>,
    mni_template: PathBuf,
    eeg_positions: PathBuf,
}

impl Toolchain {
    /// Canonical program names and default reference data.
    pub fn new() -> Self {
        Self {
            programs: HashMap::new(),
            mni_template: PathBuf::from("MNI152_T1_1mm.nii.gz"),
            eeg_positions: PathBuf::from("EEG10-10_UI_Jurak_2007.csv"),
        }
    }

    /// Resolve the toolchain from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Resolve the toolchain from a set of environment variables.
    ///
    /// `FSLDIR` locates the standard MNI template; the `MRI2MESH_*`
    /// variables override individual tools and data files.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        let mut toolchain = Self::new();

        if let Some(fsldir) = vars.get("FSLDIR") {
            toolchain.mni_template = PathBuf::from(fsldir)
                .join("data")
                .join("standard")
                .join("MNI152_T1_1mm.nii.gz");
        }
        if let Some(template) = vars.get("MRI2MESH_MNI_TEMPLATE") {
            toolchain.mni_template = PathBuf::from(template);
        }
        if let Some(positions) = vars.get("MRI2MESH_EEG_POSITIONS") {
            toolchain.eeg_positions = PathBuf::from(positions);
        }

        for tool in Tool::ALL {
            if let Some(program) = vars.get(&tool.env_var()) {
                debug!(tool = tool.program(), program = %program, "tool override");
                toolchain = toolchain.with_program(tool, program.clone());
            }
        }

        toolchain
    }

    /// Builder: override the program used for a tool.
    pub fn with_program(mut self, tool: Tool, program: impl Into<String>) -> Self {
        self.programs.insert(tool, program.into());
        self
    }

    /// Builder: set the MNI template.
    pub fn with_mni_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.mni_template = path.into();
        self
    }

    /// The program to run for a tool.
    pub fn program(&self, tool: Tool) -> &str {
        self.programs
            .get(&tool)
            .map(String::as_str)
            .unwrap_or_else(|| tool.program())
    }

    pub fn mni_template(&self) -> &PathBuf {
        &self.mni_template
    }

    /// Standard EEG electrode positions in MNI space.
    pub fn eeg_positions(&self) -> &PathBuf {
        &self.eeg_positions
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new()
    }
}
