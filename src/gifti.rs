//! GIfTI surface reader.
//!
//! GIfTI stores a brain-surface mesh as an XML document whose `DataArray`
//! elements carry base64- or text-encoded numeric payloads. A surface file
//! holds (at least) two arrays: vertex coordinates (N×3 float) followed by
//! triangle indices (M×3 int). Array selection is positional, matching the
//! surface files produced by CAT12/FreeSurfer conversion pipelines.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::GzDecoder;
use nalgebra::Vector3;
use roxmltree::{Document, Node, ParsingOptions};

use crate::types::SurfaceMesh;

/// Errors produced while reading a GIfTI surface.
#[derive(Debug)]
pub enum GiftiError {
    /// The file could not be read.
    Io(std::io::Error),
    /// The document is not well-formed XML.
    Xml(roxmltree::Error),
    /// The document is XML but not a usable GIfTI surface (wrong array
    /// count, shape, data type, encoding, or payload length).
    Format(String),
}

impl fmt::Display for GiftiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GiftiError::Io(e) => write!(f, "GIfTI I/O error: {e}"),
            GiftiError::Xml(e) => write!(f, "GIfTI XML error: {e}"),
            GiftiError::Format(msg) => write!(f, "GIfTI format error: {msg}"),
        }
    }
}

impl std::error::Error for GiftiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GiftiError::Io(e) => Some(e),
            GiftiError::Xml(e) => Some(e),
            GiftiError::Format(_) => None,
        }
    }
}

impl From<std::io::Error> for GiftiError {
    fn from(err: std::io::Error) -> Self {
        GiftiError::Io(err)
    }
}

impl From<roxmltree::Error> for GiftiError {
    fn from(err: roxmltree::Error) -> Self {
        GiftiError::Xml(err)
    }
}

/// Read a GIfTI surface file into an indexed mesh.
pub fn read_surface<P: AsRef<Path>>(path: P) -> Result<SurfaceMesh, GiftiError> {
    let text = fs::read_to_string(path)?;
    parse_surface(&text)
}

/// Parse GIfTI XML text into an indexed mesh.
pub fn parse_surface(text: &str) -> Result<SurfaceMesh, GiftiError> {
    // GIfTI files carry a <!DOCTYPE> referencing the format's DTD.
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options(text, options)?;
    let root = doc.root_element();
    if root.tag_name().name() != "GIFTI" {
        return Err(GiftiError::Format(format!(
            "root element is <{}>, expected <GIFTI>",
            root.tag_name().name()
        )));
    }

    let arrays: Vec<Node> = root
        .children()
        .filter(|n| n.has_tag_name("DataArray"))
        .collect();
    if arrays.len() < 2 {
        return Err(GiftiError::Format(format!(
            "surface needs two data arrays (coordinates, triangles), found {}",
            arrays.len()
        )));
    }

    // First array: vertex coordinates. Second: triangle indices.
    let vertices = match decode_array(&arrays[0])? {
        Numbers::Float(values) => values
            .chunks_exact(3)
            .map(|c| Vector3::new(c[0], c[1], c[2]))
            .collect(),
        Numbers::Int(_) => {
            return Err(GiftiError::Format(
                "vertex coordinate array has an integer data type".into(),
            ))
        }
    };

    let faces = match decode_array(&arrays[1])? {
        Numbers::Int(values) => {
            let mut faces = Vec::with_capacity(values.len() / 3);
            for c in values.chunks_exact(3) {
                let mut face = [0u32; 3];
                for (slot, &idx) in face.iter_mut().zip(c) {
                    *slot = u32::try_from(idx).map_err(|_| {
                        GiftiError::Format(format!("negative triangle index {idx}"))
                    })?;
                }
                faces.push(face);
            }
            faces
        }
        Numbers::Float(_) => {
            return Err(GiftiError::Format(
                "triangle index array has a floating-point data type".into(),
            ))
        }
    };

    Ok(SurfaceMesh { vertices, faces })
}

/// Decoded payload of one `DataArray`, flattened in row-major order.
enum Numbers {
    Float(Vec<f64>),
    Int(Vec<i32>),
}

#[derive(Clone, Copy, PartialEq)]
enum Endian {
    Little,
    Big,
}

fn attr<'a>(node: &Node<'a, '_>, name: &str) -> Result<&'a str, GiftiError> {
    node.attribute(name)
        .ok_or_else(|| GiftiError::Format(format!("DataArray missing {name} attribute")))
}

fn decode_array(node: &Node) -> Result<Numbers, GiftiError> {
    let data_type = attr(node, "DataType")?;
    let encoding = attr(node, "Encoding")?;

    let dimensionality: usize = attr(node, "Dimensionality")?
        .parse()
        .map_err(|_| GiftiError::Format("unparseable Dimensionality".into()))?;
    if dimensionality != 2 {
        return Err(GiftiError::Format(format!(
            "expected a two-dimensional array, got Dimensionality={dimensionality}"
        )));
    }
    let rows: usize = attr(node, "Dim0")?
        .parse()
        .map_err(|_| GiftiError::Format("unparseable Dim0".into()))?;
    let cols: usize = attr(node, "Dim1")?
        .parse()
        .map_err(|_| GiftiError::Format("unparseable Dim1".into()))?;
    if cols != 3 {
        return Err(GiftiError::Format(format!(
            "expected an N\u{d7}3 array, got {rows}\u{d7}{cols}"
        )));
    }

    let endian = match node.attribute("Endian").unwrap_or("LittleEndian") {
        "LittleEndian" => Endian::Little,
        "BigEndian" => Endian::Big,
        other => {
            return Err(GiftiError::Format(format!("unknown byte order {other:?}")))
        }
    };
    let column_major = match node.attribute("ArrayIndexingOrder").unwrap_or("RowMajorOrder") {
        "RowMajorOrder" => false,
        "ColumnMajorOrder" => true,
        other => {
            return Err(GiftiError::Format(format!("unknown indexing order {other:?}")))
        }
    };

    let data = node
        .children()
        .find(|n| n.has_tag_name("Data"))
        .ok_or_else(|| GiftiError::Format("DataArray has no Data element".into()))?
        .text()
        .unwrap_or("");

    let count = rows * cols;
    let mut numbers = match encoding {
        "ASCII" => decode_ascii(data, data_type)?,
        "Base64Binary" => from_bytes(&decode_base64(data)?, data_type, endian)?,
        "GZipBase64Binary" => from_bytes(&gunzip(&decode_base64(data)?)?, data_type, endian)?,
        other => {
            return Err(GiftiError::Format(format!("unsupported encoding {other:?}")))
        }
    };

    let actual = match &numbers {
        Numbers::Float(v) => v.len(),
        Numbers::Int(v) => v.len(),
    };
    if actual != count {
        return Err(GiftiError::Format(format!(
            "payload holds {actual} values, dimensions declare {count}"
        )));
    }

    if column_major {
        numbers = match numbers {
            Numbers::Float(v) => Numbers::Float(to_row_major(&v, rows, cols)),
            Numbers::Int(v) => Numbers::Int(to_row_major(&v, rows, cols)),
        };
    }
    Ok(numbers)
}

fn decode_ascii(data: &str, data_type: &str) -> Result<Numbers, GiftiError> {
    match data_type {
        "NIFTI_TYPE_FLOAT32" | "NIFTI_TYPE_FLOAT64" => {
            let mut values = Vec::new();
            for token in data.split_whitespace() {
                values.push(token.parse::<f64>().map_err(|_| {
                    GiftiError::Format(format!("unparseable float {token:?}"))
                })?);
            }
            Ok(Numbers::Float(values))
        }
        "NIFTI_TYPE_INT32" => {
            let mut values = Vec::new();
            for token in data.split_whitespace() {
                values.push(token.parse::<i32>().map_err(|_| {
                    GiftiError::Format(format!("unparseable integer {token:?}"))
                })?);
            }
            Ok(Numbers::Int(values))
        }
        other => Err(GiftiError::Format(format!("unsupported data type {other:?}"))),
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>, GiftiError> {
    // Encoders are free to wrap the payload in whitespace.
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| GiftiError::Format(format!("invalid base64 payload: {e}")))
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, GiftiError> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| GiftiError::Format(format!("invalid gzip payload: {e}")))?;
    Ok(out)
}

fn from_bytes(bytes: &[u8], data_type: &str, endian: Endian) -> Result<Numbers, GiftiError> {
    let size = match data_type {
        "NIFTI_TYPE_FLOAT32" | "NIFTI_TYPE_INT32" => 4,
        "NIFTI_TYPE_FLOAT64" => 8,
        other => {
            return Err(GiftiError::Format(format!("unsupported data type {other:?}")))
        }
    };
    if bytes.len() % size != 0 {
        return Err(GiftiError::Format(format!(
            "payload length {} is not a multiple of the {size}-byte element size",
            bytes.len()
        )));
    }

    match data_type {
        "NIFTI_TYPE_FLOAT32" => Ok(Numbers::Float(
            bytes
                .chunks_exact(4)
                .map(|c| {
                    let raw = [c[0], c[1], c[2], c[3]];
                    let v = match endian {
                        Endian::Little => f32::from_le_bytes(raw),
                        Endian::Big => f32::from_be_bytes(raw),
                    };
                    f64::from(v)
                })
                .collect(),
        )),
        "NIFTI_TYPE_FLOAT64" => Ok(Numbers::Float(
            bytes
                .chunks_exact(8)
                .map(|c| {
                    let raw = [c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]];
                    match endian {
                        Endian::Little => f64::from_le_bytes(raw),
                        Endian::Big => f64::from_be_bytes(raw),
                    }
                })
                .collect(),
        )),
        "NIFTI_TYPE_INT32" => Ok(Numbers::Int(
            bytes
                .chunks_exact(4)
                .map(|c| {
                    let raw = [c[0], c[1], c[2], c[3]];
                    match endian {
                        Endian::Little => i32::from_le_bytes(raw),
                        Endian::Big => i32::from_be_bytes(raw),
                    }
                })
                .collect(),
        )),
        _ => unreachable!("size match above rejects other types"),
    }
}

fn to_row_major<T: Copy>(values: &[T], rows: usize, cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for r in 0..rows {
        for c in 0..cols {
            out.push(values[c * rows + r]);
        }
    }
    out
}
