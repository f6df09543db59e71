//! Indexed-mesh expansion and triangle-soup concatenation.

use std::fmt;

use crate::types::{SurfaceMesh, TriangleSoup};

/// Errors produced while expanding an indexed mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// A face references a vertex position that does not exist.
    FaceIndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::FaceIndexOutOfRange { face, index, vertex_count } => write!(
                f,
                "face {face} references vertex {index}, mesh has {vertex_count} vertices"
            ),
        }
    }
}

impl std::error::Error for ConvertError {}

/// Expand an indexed surface into a triangle soup.
///
/// Each face `[a, b, c]` becomes one triangle whose corners are
/// `vertices[a], vertices[b], vertices[c]` in that order; corner order
/// encodes the winding and is preserved. The result carries no normals;
/// the STL writer derives facet normals at save time.
pub fn expand(surface: &SurfaceMesh) -> Result<TriangleSoup, ConvertError> {
    let mut triangles = Vec::with_capacity(surface.faces.len());
    for (fi, face) in surface.faces.iter().enumerate() {
        let mut corners = [nalgebra::Vector3::zeros(); 3];
        for (corner, &index) in corners.iter_mut().zip(face) {
            *corner = *surface.vertices.get(index as usize).ok_or(
                ConvertError::FaceIndexOutOfRange {
                    face: fi,
                    index,
                    vertex_count: surface.vertices.len(),
                },
            )?;
        }
        triangles.push(corners);
    }
    Ok(TriangleSoup { triangles, normals: Vec::new() })
}

/// Concatenate two triangle soups: `first`'s triangles followed by
/// `second`'s, normals likewise. Normals are copied as declared, never
/// recomputed, and no vertices are welded across the seam.
pub fn concatenate(first: &TriangleSoup, second: &TriangleSoup) -> TriangleSoup {
    let mut triangles = Vec::with_capacity(first.len() + second.len());
    triangles.extend_from_slice(&first.triangles);
    triangles.extend_from_slice(&second.triangles);

    let mut normals = Vec::with_capacity(first.normals.len() + second.normals.len());
    normals.extend_from_slice(&first.normals);
    normals.extend_from_slice(&second.normals);

    TriangleSoup { triangles, normals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn quad_surface() -> SurfaceMesh {
        SurfaceMesh {
            vertices: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    #[test]
    fn expansion_emits_one_triangle_per_face() {
        let surface = quad_surface();
        let soup = expand(&surface).unwrap();
        assert_eq!(soup.len(), surface.faces.len());
        assert!(soup.normals.is_empty());
    }

    #[test]
    fn expansion_preserves_corner_order() {
        let surface = quad_surface();
        let soup = expand(&surface).unwrap();
        for (face, tri) in surface.faces.iter().zip(&soup.triangles) {
            for (corner, &index) in tri.iter().zip(face) {
                assert_eq!(*corner, surface.vertices[index as usize]);
            }
        }
    }

    #[test]
    fn expansion_rejects_out_of_range_index() {
        let mut surface = quad_surface();
        surface.faces.push([1, 2, 4]);
        let err = expand(&surface).unwrap_err();
        assert_eq!(
            err,
            ConvertError::FaceIndexOutOfRange { face: 2, index: 4, vertex_count: 4 }
        );
    }

    #[test]
    fn concatenation_preserves_order_and_counts() {
        let surface = quad_surface();
        let first = expand(&surface).unwrap();
        let mut second = expand(&surface).unwrap();
        for tri in &mut second.triangles {
            for corner in tri.iter_mut() {
                corner.z += 5.0;
            }
        }

        let combined = concatenate(&first, &second);
        assert_eq!(combined.len(), first.len() + second.len());
        assert_eq!(&combined.triangles[..first.len()], &first.triangles[..]);
        assert_eq!(&combined.triangles[first.len()..], &second.triangles[..]);

        // Order of arguments matters; the asymmetry is intended.
        let flipped = concatenate(&second, &first);
        assert_ne!(combined.triangles[0], flipped.triangles[0]);
    }

    #[test]
    fn concatenation_copies_declared_normals() {
        let mut first = TriangleSoup::new();
        first.triangles.push([Vector3::zeros(); 3]);
        first.normals.push(Vector3::new(1.0, 0.0, 0.0));
        let mut second = TriangleSoup::new();
        second.triangles.push([Vector3::zeros(); 3]);
        second.normals.push(Vector3::new(0.0, 1.0, 0.0));

        let combined = concatenate(&first, &second);
        assert_eq!(
            combined.normals,
            vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)]
        );
    }
}
