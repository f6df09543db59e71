use nalgebra::Vector3;

/// An indexed surface mesh as stored in a GIfTI file.
///
/// Loaded once per input file and discarded after expansion into a
/// [`TriangleSoup`].
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    /// Vertex positions.
    pub vertices: Vec<Vector3<f64>>,
    /// Triangle connectivity (every entry indexes `vertices`).
    pub faces: Vec<[u32; 3]>,
}

/// A triangle soup: every triangle carries its own three corners.
///
/// This is the STL-level representation. `normals` is either empty (no
/// declared normals, the writer derives facet normals on save) or holds
/// exactly one normal per triangle, in triangle order.
#[derive(Debug, Clone)]
pub struct TriangleSoup {
    pub triangles: Vec<[Vector3<f64>; 3]>,
    pub normals: Vec<Vector3<f64>>,
}

impl TriangleSoup {
    /// Soup with no triangles and no normals.
    pub fn new() -> Self {
        Self { triangles: Vec::new(), normals: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Whether a declared normal exists for every triangle.
    pub fn has_normals(&self) -> bool {
        !self.triangles.is_empty() && self.normals.len() == self.triangles.len()
    }
}

impl Default for TriangleSoup {
    fn default() -> Self {
        Self::new()
    }
}
