//! Script-driven mesh smoothing.
//!
//! The pipeline treats smoothing as an opaque capability: load a mesh,
//! apply an externally authored, ordered sequence of named operations,
//! save the result. All-or-nothing: an unknown operation or a bad
//! parameter aborts the whole step and nothing is written.
//!
//! [`FilterBackend`] is the substitution seam; [`UmbrellaBackend`] is the
//! built-in implementation covering the Laplacian family that
//! cortical-surface scripts use.

use std::fmt;
use std::path::Path;

use log::info;
use nalgebra::Vector3;

use crate::script::{self, FilterScript, ScriptError};
use crate::stl::{self, StlError};
use crate::weld::{weld, WeldedMesh};

/// Errors produced by the smoothing step.
#[derive(Debug)]
pub enum SmoothError {
    Stl(StlError),
    Script(ScriptError),
    /// The script names an operation the backend does not provide.
    UnknownFilter(String),
}

impl fmt::Display for SmoothError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothError::Stl(e) => write!(f, "smoothing: {e}"),
            SmoothError::Script(e) => write!(f, "smoothing: {e}"),
            SmoothError::UnknownFilter(name) => {
                write!(f, "smoothing: unknown filter {name:?}")
            }
        }
    }
}

impl std::error::Error for SmoothError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SmoothError::Stl(e) => Some(e),
            SmoothError::Script(e) => Some(e),
            SmoothError::UnknownFilter(_) => None,
        }
    }
}

impl From<StlError> for SmoothError {
    fn from(err: StlError) -> Self {
        SmoothError::Stl(err)
    }
}

impl From<ScriptError> for SmoothError {
    fn from(err: ScriptError) -> Self {
        SmoothError::Script(err)
    }
}

/// A geometry backend that can run a parsed filter script over a mesh.
///
/// The pipeline only ever talks to this interface, so a different
/// mesh-processing engine can be substituted without touching the driver.
pub trait FilterBackend {
    /// Apply every operation of `script` to `mesh`, in declared order.
    fn apply(&self, mesh: &mut WeldedMesh, script: &FilterScript) -> Result<(), SmoothError>;
}

/// Built-in backend: uniform-umbrella Laplacian smoothing and variants.
pub struct UmbrellaBackend;

impl FilterBackend for UmbrellaBackend {
    fn apply(&self, mesh: &mut WeldedMesh, script: &FilterScript) -> Result<(), SmoothError> {
        for op in &script.filters {
            match op.name.as_str() {
                "Laplacian Smooth" => {
                    let steps = op.int_param("stepsmoothnum", 3)?;
                    laplacian(mesh, steps);
                }
                "Taubin Smooth" => {
                    let lambda = op.float_param("lambda", 0.5)?;
                    let mu = op.float_param("mu", -0.53)?;
                    let steps = op.int_param("stepsmoothnum", 10)?;
                    taubin(mesh, lambda, mu, steps);
                }
                "HC Laplacian Smooth" => {
                    hc_laplacian(mesh);
                }
                other => return Err(SmoothError::UnknownFilter(other.to_string())),
            }
        }
        Ok(())
    }
}

/// Smooth a mesh file with the given filter script and write the result.
///
/// Reads the mesh, parses the script, applies every operation in order via
/// the built-in backend, and saves the smoothed mesh to `output`.
pub fn apply_filter_script(
    input: &Path,
    script_path: &Path,
    output: &Path,
) -> Result<(), SmoothError> {
    apply_with_backend(&UmbrellaBackend, input, script_path, output)
}

/// [`apply_filter_script`] with an explicit backend.
pub fn apply_with_backend(
    backend: &dyn FilterBackend,
    input: &Path,
    script_path: &Path,
    output: &Path,
) -> Result<(), SmoothError> {
    let soup = stl::read_stl(input)?;
    let script = script::read_script(script_path)?;

    let mut mesh = weld(&soup);
    backend.apply(&mut mesh, &script)?;

    stl::save_stl(&mesh.to_soup(), output)?;
    info!("Smoothed mesh saved to {}", output.display());
    Ok(())
}

/// One umbrella step: move every vertex toward the centroid of its
/// neighbors by `factor`. Displacements are computed against the
/// positions at the start of the step.
fn umbrella_step(vertices: &mut [Vector3<f64>], neighbors: &[Vec<u32>], factor: f64) {
    let current = vertices.to_vec();
    for (i, v) in vertices.iter_mut().enumerate() {
        let ring = &neighbors[i];
        if ring.is_empty() {
            continue;
        }
        let mut centroid = Vector3::zeros();
        for &n in ring {
            centroid += current[n as usize];
        }
        centroid /= ring.len() as f64;
        *v += factor * (centroid - *v);
    }
}

fn laplacian(mesh: &mut WeldedMesh, steps: u32) {
    let neighbors = mesh.vertex_neighbors();
    for _ in 0..steps {
        umbrella_step(&mut mesh.vertices, &neighbors, 1.0);
    }
}

fn taubin(mesh: &mut WeldedMesh, lambda: f64, mu: f64, steps: u32) {
    let neighbors = mesh.vertex_neighbors();
    for _ in 0..steps {
        umbrella_step(&mut mesh.vertices, &neighbors, lambda);
        umbrella_step(&mut mesh.vertices, &neighbors, mu);
    }
}

/// One Vollmer-style pass: umbrella step, then push each vertex back by a
/// blend of its own drift and its neighbors' average drift (beta = 0.5).
fn hc_laplacian(mesh: &mut WeldedMesh) {
    const BETA: f64 = 0.5;

    let neighbors = mesh.vertex_neighbors();
    let original = mesh.vertices.clone();
    umbrella_step(&mut mesh.vertices, &neighbors, 1.0);

    let drift: Vec<Vector3<f64>> = mesh
        .vertices
        .iter()
        .zip(&original)
        .map(|(q, p)| q - p)
        .collect();

    for (i, v) in mesh.vertices.iter_mut().enumerate() {
        let ring = &neighbors[i];
        if ring.is_empty() {
            continue;
        }
        let mut ring_drift = Vector3::zeros();
        for &n in ring {
            ring_drift += drift[n as usize];
        }
        ring_drift /= ring.len() as f64;
        *v -= BETA * drift[i] + (1.0 - BETA) * ring_drift;
    }
}
