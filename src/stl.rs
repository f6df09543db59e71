//! STL reading and writing.
//!
//! The writer emits the standard binary layout: 80-byte header, little-endian
//! triangle count, then one 50-byte record per triangle (facet normal, three
//! vertex positions, attribute word). The reader accepts both binary and
//! ASCII variants; declared facet normals are kept as read, so a later save
//! re-emits them verbatim.

use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use nalgebra::Vector3;

use crate::types::TriangleSoup;

/// Errors produced while reading or writing STL files.
#[derive(Debug)]
pub enum StlError {
    Io(std::io::Error),
    /// Truncated or malformed STL content.
    Format(String),
}

impl fmt::Display for StlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StlError::Io(e) => write!(f, "STL I/O error: {e}"),
            StlError::Format(msg) => write!(f, "STL format error: {msg}"),
        }
    }
}

impl std::error::Error for StlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StlError::Io(e) => Some(e),
            StlError::Format(_) => None,
        }
    }
}

impl From<std::io::Error> for StlError {
    fn from(err: std::io::Error) -> Self {
        StlError::Io(err)
    }
}

/// Facet normal from the triangle's winding order.
///
/// Degenerate triangles get a +Z placeholder normal.
pub fn facet_normal(tri: &[Vector3<f64>; 3]) -> Vector3<f64> {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let n = e1.cross(&e2);
    let len = n.norm();
    if len > 1e-15 {
        n / len
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    }
}

/// Write a triangle soup as binary STL to the given writer.
///
/// Declared normals are written as stored; if the soup carries none, facet
/// normals are derived from each triangle's winding.
pub fn write_stl<W: Write>(soup: &TriangleSoup, writer: &mut W) -> io::Result<()> {
    // 80-byte header
    let header = b"Binary STL from gii2stl\0";
    let mut header_buf = [0u8; 80];
    let len = header.len().min(80);
    header_buf[..len].copy_from_slice(&header[..len]);
    writer.write_all(&header_buf)?;

    writer.write_all(&(soup.len() as u32).to_le_bytes())?;

    let declared = soup.has_normals();
    for (i, tri) in soup.triangles.iter().enumerate() {
        let n = if declared { soup.normals[i] } else { facet_normal(tri) };

        write_f32(writer, n.x as f32)?;
        write_f32(writer, n.y as f32)?;
        write_f32(writer, n.z as f32)?;

        for v in tri {
            write_f32(writer, v.x as f32)?;
            write_f32(writer, v.y as f32)?;
            write_f32(writer, v.z as f32)?;
        }

        // Attribute byte count (unused)
        writer.write_all(&0u16.to_le_bytes())?;
    }

    Ok(())
}

/// Write a triangle soup as a binary STL file.
pub fn save_stl<P: AsRef<Path>>(soup: &TriangleSoup, path: P) -> Result<(), StlError> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_stl(soup, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Read an STL file (binary or ASCII) into a triangle soup.
pub fn read_stl<P: AsRef<Path>>(path: P) -> Result<TriangleSoup, StlError> {
    let bytes = fs::read(path)?;
    if let Some(text) = as_ascii_stl(&bytes) {
        parse_ascii(text)
    } else {
        parse_binary(&bytes)
    }
}

/// ASCII detection: UTF-8 content that opens with `solid` and actually
/// contains facet records (binary headers may also start with "solid").
fn as_ascii_stl(bytes: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(bytes).ok()?;
    let trimmed = text.trim_start();
    if trimmed.starts_with("solid") && trimmed.contains("facet") {
        Some(text)
    } else {
        None
    }
}

fn parse_binary(bytes: &[u8]) -> Result<TriangleSoup, StlError> {
    if bytes.len() < 84 {
        return Err(StlError::Format(format!(
            "binary STL needs at least 84 bytes, file has {}",
            bytes.len()
        )));
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    let needed = 84 + count * 50;
    if bytes.len() < needed {
        return Err(StlError::Format(format!(
            "binary STL declares {count} triangles ({needed} bytes), file has {}",
            bytes.len()
        )));
    }

    let mut soup = TriangleSoup {
        triangles: Vec::with_capacity(count),
        normals: Vec::with_capacity(count),
    };
    for t in 0..count {
        let base = 84 + t * 50;
        let n = read_vector(bytes, base);
        let tri = [
            read_vector(bytes, base + 12),
            read_vector(bytes, base + 24),
            read_vector(bytes, base + 36),
        ];
        soup.normals.push(n);
        soup.triangles.push(tri);
    }
    Ok(soup)
}

fn read_vector(bytes: &[u8], offset: usize) -> Vector3<f64> {
    Vector3::new(
        read_f32_at(bytes, offset),
        read_f32_at(bytes, offset + 4),
        read_f32_at(bytes, offset + 8),
    )
}

fn read_f32_at(bytes: &[u8], offset: usize) -> f64 {
    let raw = [
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ];
    f64::from(f32::from_le_bytes(raw))
}

fn parse_ascii(text: &str) -> Result<TriangleSoup, StlError> {
    let mut soup = TriangleSoup::new();
    let mut normal = Vector3::zeros();
    let mut corners: Vec<Vector3<f64>> = Vec::with_capacity(3);

    for line in text.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("facet") => {
                // facet normal nx ny nz
                let _ = parts.next();
                normal = parse_triple(&mut parts)
                    .ok_or_else(|| StlError::Format("malformed facet normal".into()))?;
                corners.clear();
            }
            Some("vertex") => {
                let v = parse_triple(&mut parts)
                    .ok_or_else(|| StlError::Format("malformed vertex line".into()))?;
                corners.push(v);
            }
            Some("endfacet") => {
                if corners.len() != 3 {
                    return Err(StlError::Format(format!(
                        "facet has {} vertices, expected 3",
                        corners.len()
                    )));
                }
                soup.triangles.push([corners[0], corners[1], corners[2]]);
                soup.normals.push(normal);
                corners.clear();
            }
            _ => {}
        }
    }
    Ok(soup)
}

fn parse_triple<'a, I: Iterator<Item = &'a str>>(parts: &mut I) -> Option<Vector3<f64>> {
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    Some(Vector3::new(x, y, z))
}

fn write_f32<W: Write>(writer: &mut W, val: f32) -> io::Result<()> {
    writer.write_all(&val.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangle_soup() -> TriangleSoup {
        TriangleSoup {
            triangles: vec![
                [
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(1.5, 0.0, 0.0),
                    Vector3::new(0.0, 2.0, 0.0),
                ],
                [
                    Vector3::new(0.25, 0.5, 1.0),
                    Vector3::new(1.0, 0.5, 1.0),
                    Vector3::new(0.25, 1.5, 1.0),
                ],
            ],
            normals: Vec::new(),
        }
    }

    #[test]
    fn stl_valid_size() {
        let soup = two_triangle_soup();
        let mut buf = Vec::new();
        write_stl(&soup, &mut buf).unwrap();

        // Expected: 80 header + 4 count + n_tris * 50
        let expected = 80 + 4 + soup.len() * 50;
        assert_eq!(buf.len(), expected, "STL file size mismatch");
    }

    #[test]
    fn stl_header_correct() {
        let soup = two_triangle_soup();
        let mut buf = Vec::new();
        write_stl(&soup, &mut buf).unwrap();

        assert!(buf.len() >= 84);
        assert!(buf.starts_with(b"Binary STL from gii2stl"));
    }

    #[test]
    fn binary_round_trip_preserves_coordinates() {
        let soup = two_triangle_soup();
        let mut buf = Vec::new();
        write_stl(&soup, &mut buf).unwrap();

        let read = parse_binary(&buf).unwrap();
        assert_eq!(read.len(), 2);
        // All coordinates above are exactly representable as f32.
        assert_eq!(read.triangles, soup.triangles);
        // Normals were derived on write and are now declared.
        assert_eq!(read.normals.len(), 2);
        assert_eq!(read.normals[0], Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn declared_normals_written_verbatim() {
        let mut soup = two_triangle_soup();
        // Deliberately stale normals, as a source file might declare.
        soup.normals = vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)];

        let mut buf = Vec::new();
        write_stl(&soup, &mut buf).unwrap();
        let read = parse_binary(&buf).unwrap();
        assert_eq!(read.normals, soup.normals);
    }

    #[test]
    fn parses_ascii_stl() {
        let text = "\
solid demo
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid demo
";
        let soup = parse_ascii(text).unwrap();
        assert_eq!(soup.len(), 1);
        assert_eq!(soup.triangles[0][1], Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(soup.normals[0], Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn ascii_detection_requires_facets() {
        // A binary header is allowed to start with "solid".
        let mut bytes = vec![0u8; 84];
        bytes[..5].copy_from_slice(b"solid");
        assert!(as_ascii_stl(&bytes).is_none());
        assert_eq!(parse_binary(&bytes).unwrap().len(), 0);
    }

    #[test]
    fn truncated_binary_rejected() {
        let soup = two_triangle_soup();
        let mut buf = Vec::new();
        write_stl(&soup, &mut buf).unwrap();
        buf.truncate(buf.len() - 10);
        assert!(matches!(parse_binary(&buf), Err(StlError::Format(_))));
    }
}
