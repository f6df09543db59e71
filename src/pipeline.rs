//! The conversion driver.
//!
//! A run is strictly linear: expand each input surface to its own
//! intermediate STL, read both intermediates back and concatenate them
//! into the combined output, then smooth the combined file with the
//! filter script. The first failure aborts the run; intermediates that
//! were already written stay on disk.

use std::fmt;
use std::path::{Path, PathBuf};

use log::info;

use crate::convert::{self, ConvertError};
use crate::gifti::{self, GiftiError};
use crate::smooth::{self, SmoothError};
use crate::stl::{self, StlError};

/// One conversion job, as given on the command line.
#[derive(Debug, Clone)]
pub struct Job {
    /// Exactly two GIfTI surface files.
    pub inputs: [PathBuf; 2],
    /// Combined (un-smoothed) output path; also the base name for the
    /// intermediates and the smoothed result.
    pub output: PathBuf,
    /// Filter-script file consumed opaquely by the smoothing step.
    pub script: PathBuf,
}

/// Errors aborting a pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    Gifti(GiftiError),
    Convert(ConvertError),
    Stl(StlError),
    Smooth(SmoothError),
    /// Upfront gate: a required file is absent before any work starts.
    MissingFile(PathBuf),
    /// Both inputs resolve to the same hemisphere tag, so their
    /// intermediate files would overwrite each other.
    IntermediateCollision(PathBuf),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Gifti(e) => write!(f, "{e}"),
            PipelineError::Convert(e) => write!(f, "{e}"),
            PipelineError::Stl(e) => write!(f, "{e}"),
            PipelineError::Smooth(e) => write!(f, "{e}"),
            PipelineError::MissingFile(path) => {
                write!(f, "required file {} does not exist", path.display())
            }
            PipelineError::IntermediateCollision(path) => write!(
                f,
                "both inputs map to the intermediate {}; rename an input so the \
                 hemispheres are distinguishable",
                path.display()
            ),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Gifti(e) => Some(e),
            PipelineError::Convert(e) => Some(e),
            PipelineError::Stl(e) => Some(e),
            PipelineError::Smooth(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GiftiError> for PipelineError {
    fn from(err: GiftiError) -> Self {
        PipelineError::Gifti(err)
    }
}

impl From<ConvertError> for PipelineError {
    fn from(err: ConvertError) -> Self {
        PipelineError::Convert(err)
    }
}

impl From<StlError> for PipelineError {
    fn from(err: StlError) -> Self {
        PipelineError::Stl(err)
    }
}

impl From<SmoothError> for PipelineError {
    fn from(err: SmoothError) -> Self {
        PipelineError::Smooth(err)
    }
}

/// Hemisphere tag inferred from a filename.
///
/// `"lh."` anywhere in the name wins over `"rh."`; a name containing
/// neither gets no tag. Used only to build intermediate filenames.
pub fn hemisphere_tag(filename: &str) -> &'static str {
    if filename.contains("lh.") {
        "_lh"
    } else if filename.contains("rh.") {
        "_rh"
    } else {
        ""
    }
}

/// Derive `base<tag>.stl` from the output path, where `base` is the
/// output path with its final extension stripped.
pub fn tagged_path(output: &Path, tag: &str) -> PathBuf {
    let stem = output.file_stem().unwrap_or_default().to_string_lossy();
    output.with_file_name(format!("{stem}{tag}.stl"))
}

/// Load a GIfTI surface, expand it into a triangle soup, and save it as
/// binary STL.
pub fn convert_surface(input: &Path, output: &Path) -> Result<(), PipelineError> {
    let surface = gifti::read_surface(input)?;
    let soup = convert::expand(&surface)?;
    stl::save_stl(&soup, output)?;
    info!("STL file saved to {}", output.display());
    Ok(())
}

/// Read two STL files back from disk, concatenate them first-then-second,
/// and save the result. The storage round-trip is intentional: the
/// combined mesh is built from what the intermediate files declare, not
/// from in-memory state.
pub fn combine_files(first: &Path, second: &Path, output: &Path) -> Result<(), PipelineError> {
    let a = stl::read_stl(first)?;
    let b = stl::read_stl(second)?;
    let combined = convert::concatenate(&a, &b);
    stl::save_stl(&combined, output)?;
    info!("Combined mesh saved to {}", output.display());
    Ok(())
}

/// Run the whole pipeline for one job.
pub fn run(job: &Job) -> Result<(), PipelineError> {
    // Upfront gate: fail before touching the filesystem for output.
    for path in job.inputs.iter().chain(std::iter::once(&job.script)) {
        if !path.is_file() {
            return Err(PipelineError::MissingFile(path.clone()));
        }
    }

    let tag1 = hemisphere_tag(&job.inputs[0].to_string_lossy());
    let tag2 = hemisphere_tag(&job.inputs[1].to_string_lossy());
    let intermediate1 = tagged_path(&job.output, tag1);
    let intermediate2 = tagged_path(&job.output, tag2);
    if intermediate1 == intermediate2 {
        return Err(PipelineError::IntermediateCollision(intermediate1));
    }

    convert_surface(&job.inputs[0], &intermediate1)?;
    convert_surface(&job.inputs[1], &intermediate2)?;

    combine_files(&intermediate1, &intermediate2, &job.output)?;

    let smoothed = tagged_path(&job.output, "_smoothed");
    smooth::apply_filter_script(&job.output, &job.script, &smoothed)?;

    Ok(())
}
