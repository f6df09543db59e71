//! Vertex welding for triangle soups.
//!
//! STL stores every triangle independently, so the smoothing filters first
//! rebuild shared vertices: corners whose quantized positions coincide are
//! merged into a single vertex, which gives the umbrella operators the
//! connectivity they need. Welding happens only inside the smoothing step;
//! combined meshes on disk stay unwelded.

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::types::TriangleSoup;

// Positions matching after quantization at this scale weld together.
const WELD_SCALE: f64 = 1e6;

/// An indexed mesh rebuilt from a triangle soup.
pub struct WeldedMesh {
    pub vertices: Vec<Vector3<f64>>,
    pub triangles: Vec<[u32; 3]>,
}

/// Merge coincident corners of a soup into shared vertices.
///
/// Triangle order and winding are preserved; degenerate triangles (all
/// corners welded together) are kept, so the triangle count never changes.
pub fn weld(soup: &TriangleSoup) -> WeldedMesh {
    let mut index_of: HashMap<[i64; 3], u32> = HashMap::new();
    let mut vertices: Vec<Vector3<f64>> = Vec::new();
    let mut triangles = Vec::with_capacity(soup.len());

    for tri in &soup.triangles {
        let mut mapped = [0u32; 3];
        for (slot, corner) in mapped.iter_mut().zip(tri) {
            let key = [
                (corner.x * WELD_SCALE) as i64,
                (corner.y * WELD_SCALE) as i64,
                (corner.z * WELD_SCALE) as i64,
            ];
            *slot = *index_of.entry(key).or_insert_with(|| {
                vertices.push(*corner);
                (vertices.len() - 1) as u32
            });
        }
        triangles.push(mapped);
    }

    WeldedMesh { vertices, triangles }
}

impl WeldedMesh {
    /// Unique neighbor list per vertex, built from triangle edges.
    pub fn vertex_neighbors(&self) -> Vec<Vec<u32>> {
        let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); self.vertices.len()];
        for tri in &self.triangles {
            for i in 0..3 {
                let a = tri[i];
                let b = tri[(i + 1) % 3];
                if a == b {
                    continue;
                }
                if !neighbors[a as usize].contains(&b) {
                    neighbors[a as usize].push(b);
                }
                if !neighbors[b as usize].contains(&a) {
                    neighbors[b as usize].push(a);
                }
            }
        }
        neighbors
    }

    /// Expand back into a triangle soup with no normals (the STL writer
    /// derives facet normals on save).
    pub fn to_soup(&self) -> TriangleSoup {
        let triangles = self
            .triangles
            .iter()
            .map(|t| {
                [
                    self.vertices[t[0] as usize],
                    self.vertices[t[1] as usize],
                    self.vertices[t[2] as usize],
                ]
            })
            .collect();
        TriangleSoup { triangles, normals: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_edge_soup() -> TriangleSoup {
        // Two triangles of a unit quad sharing the diagonal (0,0,0)-(1,1,0).
        TriangleSoup {
            triangles: vec![
                [
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(1.0, 0.0, 0.0),
                    Vector3::new(1.0, 1.0, 0.0),
                ],
                [
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(1.0, 1.0, 0.0),
                    Vector3::new(0.0, 1.0, 0.0),
                ],
            ],
            normals: Vec::new(),
        }
    }

    #[test]
    fn weld_merges_coincident_corners() {
        let mesh = weld(&shared_edge_soup());
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangles.len(), 2);
        // The shared diagonal corners map to the same indices.
        assert_eq!(mesh.triangles[0][0], mesh.triangles[1][0]);
        assert_eq!(mesh.triangles[0][2], mesh.triangles[1][1]);
    }

    #[test]
    fn neighbors_follow_triangle_edges() {
        let mesh = weld(&shared_edge_soup());
        let neighbors = mesh.vertex_neighbors();
        // Diagonal endpoints see all three other vertices.
        assert_eq!(neighbors[mesh.triangles[0][0] as usize].len(), 3);
        // Off-diagonal corners see only the diagonal endpoints.
        assert_eq!(neighbors[mesh.triangles[0][1] as usize].len(), 2);
        assert_eq!(neighbors[mesh.triangles[1][2] as usize].len(), 2);
    }

    #[test]
    fn to_soup_round_trips_positions() {
        let soup = shared_edge_soup();
        let back = weld(&soup).to_soup();
        assert_eq!(back.triangles, soup.triangles);
        assert!(back.normals.is_empty());
    }

    #[test]
    fn degenerate_triangles_survive_welding() {
        let mut soup = shared_edge_soup();
        let p = Vector3::new(2.0, 2.0, 2.0);
        soup.triangles.push([p, p, p]);
        let mesh = weld(&soup);
        assert_eq!(mesh.triangles.len(), 3);
        assert_eq!(mesh.triangles[2], [4, 4, 4]);
    }
}
