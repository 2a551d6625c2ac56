//! OBJ file loader for 3D models
//!
//! Supports positions with optional per-vertex colors (`v x y z r g b`),
//! normals, texture coordinates and polygon faces, which are fan
//! triangulated. Identical position/uv/normal triples share one vertex.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use super::mesh::{MeshData, Vertex};

/// OBJ parsing errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A number or index failed to parse
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Structurally invalid file
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Key identifying a unique face corner
type CornerKey = (usize, Option<usize>, Option<usize>);

#[derive(Default)]
struct ObjBuilder {
    positions: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    unique: HashMap<CornerKey, u32>,
}

impl ObjBuilder {
    fn corner(&mut self, key: CornerKey) -> Result<u32, ObjError> {
        if let Some(&index) = self.unique.get(&key) {
            return Ok(index);
        }

        let (pos_idx, tex_idx, normal_idx) = key;
        let position = *self.positions.get(pos_idx).ok_or_else(|| {
            ObjError::InvalidFormat(format!("position index {} out of bounds", pos_idx + 1))
        })?;
        let uv = match tex_idx {
            Some(idx) => *self.tex_coords.get(idx).ok_or_else(|| {
                ObjError::InvalidFormat(format!("texture coordinate index {} out of bounds", idx + 1))
            })?,
            None => [0.0, 0.0],
        };
        let normal = match normal_idx {
            Some(idx) => *self.normals.get(idx).ok_or_else(|| {
                ObjError::InvalidFormat(format!("normal index {} out of bounds", idx + 1))
            })?,
            None => [0.0, 0.0, 0.0],
        };

        let index = u32::try_from(self.vertices.len())
            .map_err(|_| ObjError::InvalidFormat("too many vertices".to_string()))?;
        self.vertices.push(Vertex {
            position,
            color: self.colors[pos_idx],
            normal,
            uv,
        });
        self.unique.insert(key, index);
        Ok(index)
    }
}

fn parse_floats<const N: usize>(parts: &[&str], line: usize, what: &str) -> Result<[f32; N], ObjError> {
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|_| ObjError::ParseError {
            line,
            message: format!("invalid {what} component '{part}'"),
        })?;
    }
    if parts.len() < N {
        return Err(ObjError::ParseError {
            line,
            message: format!("{what} needs {N} components, found {}", parts.len()),
        });
    }
    Ok(out)
}

/// Resolve a 1-based or negative (relative) OBJ index to 0-based
fn resolve_index(raw: &str, count: usize, line: usize) -> Result<usize, ObjError> {
    let value: i64 = raw.parse().map_err(|_| ObjError::ParseError {
        line,
        message: format!("invalid index '{raw}'"),
    })?;
    let resolved = match value {
        0 => None,
        v if v > 0 => usize::try_from(v - 1).ok(),
        v => usize::try_from(v.unsigned_abs()).ok().and_then(|back| count.checked_sub(back)),
    };
    resolved.ok_or_else(|| ObjError::ParseError {
        line,
        message: format!("index '{raw}' does not refer to an element"),
    })
}

/// OBJ model loader
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file from disk
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<MeshData, ObjError> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Parse OBJ text from any buffered reader
    pub fn parse<R: BufRead>(reader: R) -> Result<MeshData, ObjError> {
        let mut builder = ObjBuilder::default();

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = line_number + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let Some((&keyword, args)) = parts.split_first() else {
                continue;
            };

            match keyword {
                "v" => {
                    let position = parse_floats::<3>(args, line_number, "vertex")?;
                    let color = if args.len() >= 6 {
                        parse_floats::<3>(&args[3..], line_number, "vertex color")?
                    } else {
                        [1.0, 1.0, 1.0]
                    };
                    builder.positions.push(position);
                    builder.colors.push(color);
                }
                "vn" => {
                    let normal = parse_floats::<3>(args, line_number, "normal")?;
                    builder.normals.push(normal);
                }
                "vt" => {
                    let uv = parse_floats::<2>(args, line_number, "texture coordinate")?;
                    builder.tex_coords.push(uv);
                }
                "f" => {
                    if args.len() < 3 {
                        return Err(ObjError::ParseError {
                            line: line_number,
                            message: format!("face needs at least 3 vertices, found {}", args.len()),
                        });
                    }

                    let mut corners = Vec::with_capacity(args.len());
                    for corner in args {
                        let mut fields = corner.split('/');
                        let pos = fields.next().unwrap_or_default();
                        let tex = fields.next().filter(|s| !s.is_empty());
                        let normal = fields.next().filter(|s| !s.is_empty());

                        let key = (
                            resolve_index(pos, builder.positions.len(), line_number)?,
                            tex.map(|t| resolve_index(t, builder.tex_coords.len(), line_number)).transpose()?,
                            normal.map(|n| resolve_index(n, builder.normals.len(), line_number)).transpose()?,
                        );
                        corners.push(builder.corner(key)?);
                    }

                    for i in 1..corners.len() - 1 {
                        builder.indices.extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
                    }
                }
                other => log::trace!("Ignoring OBJ statement '{other}' on line {line_number}"),
            }
        }

        if builder.vertices.is_empty() {
            return Err(ObjError::InvalidFormat("no faces found in OBJ file".to_string()));
        }

        log::debug!(
            "Parsed OBJ: {} unique vertices, {} triangles",
            builder.vertices.len(),
            builder.indices.len() / 3
        );
        Ok(MeshData::new(builder.vertices, builder.indices))
    }
}
