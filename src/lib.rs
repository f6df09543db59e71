//! Convert paired GIfTI cortical surfaces into a combined, smoothed STL.
//!
//! The pipeline is strictly linear: each input surface is loaded,
//! expanded into a triangle soup, and saved to a per-hemisphere
//! intermediate STL; the two intermediates are read back and
//! concatenated into the combined output; the combined mesh is then
//! smoothed by an externally authored filter script and saved once more.
//!
//! See [`pipeline::run`] for the driver and [`smooth::apply_filter_script`]
//! for the script-driven smoothing entry point.

pub mod convert;
pub mod gifti;
pub mod pipeline;
pub mod script;
pub mod smooth;
pub mod stl;
pub mod types;
pub mod weld;

pub use pipeline::{run, Job};
pub use types::{SurfaceMesh, TriangleSoup};
