//! Mesh loading into flat, index-aligned vertex arrays.
//!
//! Every loader produces a [`MeshData`]: three parallel arrays where vertex
//! `i`'s position, texture coordinate and normal all sit at index `i`. Index
//! buffers are expanded on load, so the mesh is drawn as a plain triangle list.
//!
//! # Supported Formats
//!
//! | Format          | Extensions | Notes                                   |
//! |-----------------|------------|-----------------------------------------|
//! | Wavefront OBJ   | `.obj`     | Polygons are fan-triangulated           |
//! | STL             | `.stl`     | Binary and ASCII, no UV coordinates     |
//!
//! ```no_run
//! use meshview::MeshData;
//!
//! let mesh = MeshData::load("models/monkey.obj").unwrap();
//! println!("{} vertices", mesh.vertex_count());
//! ```

use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use glam::Vec3;

/// Errors that can occur when loading geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// File format could not be determined from extension.
    #[error("unknown geometry format: '{0}'")]
    UnknownFormat(String),
    /// The geometry data was invalid or corrupt.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("STL parse error: {0}")]
    Stl(String),
    /// The attribute arrays do not describe the same vertices.
    #[error(
        "vertex attributes are not aligned: {positions} positions, {texcoords} texcoords, {normals} normals"
    )]
    Misaligned {
        positions: usize,
        texcoords: usize,
        normals: usize,
    },
    #[error("mesh has no triangles")]
    Empty,
}

/// De-indexed triangle-list geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

impl MeshData {
    /// Builds mesh data from parallel attribute arrays.
    pub fn new(
        positions: Vec<[f32; 3]>,
        texcoords: Vec<[f32; 2]>,
        normals: Vec<[f32; 3]>,
    ) -> Result<Self, GeometryError> {
        if positions.len() != texcoords.len() || positions.len() != normals.len() {
            return Err(GeometryError::Misaligned {
                positions: positions.len(),
                texcoords: texcoords.len(),
                normals: normals.len(),
            });
        }
        if positions.is_empty() {
            return Err(GeometryError::Empty);
        }
        Ok(Self {
            positions,
            texcoords,
            normals,
        })
    }

    /// Loads a mesh file, picking the parser from the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeometryError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        if !matches!(ext.as_str(), "obj" | "stl") {
            return Err(GeometryError::UnknownFormat(ext));
        }

        let mut reader = BufReader::new(std::fs::File::open(path)?);
        if ext == "obj" {
            Self::parse_obj(reader)
        } else {
            Self::parse_stl(&mut reader)
        }
    }

    /// A cube spanning -1..1 on every axis, 36 vertices with flat normals.
    pub fn cube() -> Self {
        // Corner positions and the outward normal of each face, CCW from outside.
        #[rustfmt::skip]
        let faces: [([[f32; 3]; 4], [f32; 3]); 6] = [
            ([[-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0]], [ 0.0,  0.0,  1.0]),
            ([[ 1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0]], [ 0.0,  0.0, -1.0]),
            ([[-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0]], [ 0.0,  1.0,  0.0]),
            ([[-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0]], [ 0.0, -1.0,  0.0]),
            ([[ 1.0, -1.0,  1.0], [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0]], [ 1.0,  0.0,  0.0]),
            ([[-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0], [-1.0,  1.0, -1.0]], [-1.0,  0.0,  0.0]),
        ];
        let corner_uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let mut mesh = Self::default();
        for (corners, normal) in faces {
            for corner in [0, 1, 2, 2, 3, 0] {
                mesh.positions.push(corners[corner]);
                mesh.texcoords.push(corner_uvs[corner]);
                mesh.normals.push(normal);
            }
        }
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn texcoords(&self) -> &[[f32; 2]] {
        &self.texcoords
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Parses Wavefront OBJ text.
    ///
    /// Only `v`, `vt`, `vn` and `f` statements matter; everything else is
    /// skipped. Faces missing a normal get the flat face normal, faces missing
    /// a texture coordinate get `(0, 0)`.
    pub fn parse_obj<R: BufRead>(reader: R) -> Result<Self, GeometryError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut texcoords: Vec<[f32; 2]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut mesh = Self::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let number = index + 1;
            let mut tokens = line.split_whitespace();

            match tokens.next() {
                Some("v") => positions.push(parse_floats(tokens, number)?),
                Some("vt") => {
                    // A third `w` component is legal and ignored.
                    let uv: [f32; 3] = parse_floats_padded(tokens, 2, number)?;
                    texcoords.push([uv[0], uv[1]]);
                }
                Some("vn") => normals.push(parse_floats(tokens, number)?),
                Some("f") => {
                    let corners = tokens
                        .map(|token| {
                            FaceCorner::parse(
                                token,
                                [positions.len(), texcoords.len(), normals.len()],
                                number,
                            )
                        })
                        .collect::<Result<Vec<_>, _>>()?;

                    if corners.len() < 3 {
                        return Err(GeometryError::Parse {
                            line: number,
                            message: format!("face needs 3 vertices, found {}", corners.len()),
                        });
                    }

                    for i in 1..corners.len() - 1 {
                        let triangle = [corners[0], corners[i], corners[i + 1]];
                        mesh.push_triangle(&triangle, &positions, &texcoords, &normals);
                    }
                }
                _ => {}
            }
        }

        if mesh.positions.is_empty() {
            return Err(GeometryError::Empty);
        }
        Ok(mesh)
    }

    fn push_triangle(
        &mut self,
        triangle: &[FaceCorner; 3],
        positions: &[[f32; 3]],
        texcoords: &[[f32; 2]],
        normals: &[[f32; 3]],
    ) {
        let corner_positions = triangle.map(|c| positions[c.position]);
        let p0 = Vec3::from(corner_positions[0]);
        let p1 = Vec3::from(corner_positions[1]);
        let p2 = Vec3::from(corner_positions[2]);
        let face_normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();

        for (corner, position) in triangle.iter().zip(corner_positions) {
            self.positions.push(position);
            self.texcoords
                .push(corner.texcoord.map_or([0.0, 0.0], |i| texcoords[i]));
            self.normals
                .push(corner.normal.map_or(face_normal.into(), |i| normals[i]));
        }
    }

    /// Parses binary or ASCII STL.
    pub fn parse_stl<R: Read + Seek>(reader: &mut R) -> Result<Self, GeometryError> {
        let stl = stl_io::read_stl(reader).map_err(|e| GeometryError::Stl(e.to_string()))?;

        let mut mesh = Self::default();
        for face in &stl.faces {
            let normal: [f32; 3] = face.normal.into();
            for &vertex_idx in &face.vertices {
                let position: [f32; 3] = stl.vertices[vertex_idx].into();
                mesh.positions.push(position);
                mesh.texcoords.push([0.0, 0.0]);
                mesh.normals.push(normal);
            }
        }

        if mesh.positions.is_empty() {
            return Err(GeometryError::Empty);
        }
        Ok(mesh)
    }
}

/// Zero-based attribute indices of one face corner.
#[derive(Clone, Copy, Debug)]
struct FaceCorner {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

impl FaceCorner {
    /// Parses `v`, `v/vt`, `v//vn` or `v/vt/vn`. `counts` is how many
    /// positions, texcoords and normals have been declared so far, which is
    /// what negative (relative) indices count back from.
    fn parse(token: &str, counts: [usize; 3], line: usize) -> Result<Self, GeometryError> {
        let mut parts = token.split('/');
        let position = match parts.next() {
            Some(raw) if !raw.is_empty() => resolve_index(raw, counts[0], line)?,
            _ => {
                return Err(GeometryError::Parse {
                    line,
                    message: format!("face corner '{token}' has no position index"),
                });
            }
        };
        let texcoord = match parts.next() {
            Some(raw) if !raw.is_empty() => Some(resolve_index(raw, counts[1], line)?),
            _ => None,
        };
        let normal = match parts.next() {
            Some(raw) if !raw.is_empty() => Some(resolve_index(raw, counts[2], line)?),
            _ => None,
        };

        Ok(Self {
            position,
            texcoord,
            normal,
        })
    }
}

fn resolve_index(raw: &str, count: usize, line: usize) -> Result<usize, GeometryError> {
    let value: i64 = raw.parse().map_err(|_| GeometryError::Parse {
        line,
        message: format!("invalid index '{raw}'"),
    })?;

    let resolved = match value {
        v if v > 0 => Some(v as usize - 1),
        v if v < 0 => count.checked_sub(v.unsigned_abs() as usize),
        _ => None,
    };

    match resolved {
        Some(i) if i < count => Ok(i),
        _ => Err(GeometryError::Parse {
            line,
            message: format!("index {value} out of range (have {count})"),
        }),
    }
}

fn parse_floats<'a, const N: usize>(
    tokens: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<[f32; N], GeometryError> {
    parse_floats_padded(tokens, N, line)
}

/// Reads up to `N` floats, requiring at least `required` of them. Missing
/// trailing components are zero.
fn parse_floats_padded<'a, const N: usize>(
    tokens: impl Iterator<Item = &'a str>,
    required: usize,
    line: usize,
) -> Result<[f32; N], GeometryError> {
    let mut out = [0.0; N];
    let mut found = 0;

    for (slot, token) in out.iter_mut().zip(tokens) {
        *slot = token.parse().map_err(|_| GeometryError::Parse {
            line,
            message: format!("invalid number '{token}'"),
        })?;
        found += 1;
    }

    if found < required {
        return Err(GeometryError::Parse {
            line,
            message: format!("expected {required} components, found {found}"),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD: &str = "\
# a unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn cube_has_36_aligned_vertices() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertex_count(), 36);
        assert_eq!(cube.texcoords().len(), 36);
        assert_eq!(cube.normals().len(), 36);
    }

    #[test]
    fn cube_faces_wind_counter_clockwise() {
        let cube = MeshData::cube();
        for (tri, normals) in cube.positions().chunks(3).zip(cube.normals().chunks(3)) {
            let p0 = Vec3::from(tri[0]);
            let winding = (Vec3::from(tri[1]) - p0).cross(Vec3::from(tri[2]) - p0);
            assert!(winding.dot(Vec3::from(normals[0])) > 0.0);
        }
    }

    #[test]
    fn obj_quad_is_fan_triangulated() {
        let mesh = MeshData::parse_obj(Cursor::new(QUAD)).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.positions()[3], [0.0, 0.0, 0.0]);
        assert_eq!(mesh.positions()[4], [1.0, 1.0, 0.0]);
        assert_eq!(mesh.positions()[5], [0.0, 1.0, 0.0]);
        assert_eq!(mesh.texcoords()[5], [0.0, 1.0]);
        assert!(mesh.normals().iter().all(|n| *n == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn obj_without_normals_uses_face_normal() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = MeshData::parse_obj(Cursor::new(src)).unwrap();
        assert_eq!(mesh.normals()[0], [0.0, 0.0, 1.0]);
        assert_eq!(mesh.texcoords()[0], [0.0, 0.0]);
    }

    #[test]
    fn obj_negative_indices_count_back() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf -3//-1 -2//-1 -1//-1\n";
        let mesh = MeshData::parse_obj(Cursor::new(src)).unwrap();
        assert_eq!(mesh.positions()[2], [0.0, 1.0, 0.0]);
        assert_eq!(mesh.normals()[1], [0.0, 0.0, -1.0]);
    }

    #[test]
    fn obj_out_of_range_index_reports_line() {
        let src = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        let err = MeshData::parse_obj(Cursor::new(src)).unwrap_err();
        assert!(matches!(err, GeometryError::Parse { line: 3, .. }));
    }

    #[test]
    fn obj_without_faces_is_empty() {
        let err = MeshData::parse_obj(Cursor::new("v 0 0 0\n")).unwrap_err();
        assert!(matches!(err, GeometryError::Empty));
    }

    #[test]
    fn misaligned_arrays_are_rejected() {
        let err = MeshData::new(vec![[0.0; 3]; 3], vec![[0.0; 2]; 2], vec![[0.0; 3]; 3])
            .unwrap_err();
        assert!(matches!(
            err,
            GeometryError::Misaligned {
                positions: 3,
                texcoords: 2,
                normals: 3
            }
        ));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = Path::new("missing/mesh.PLY");
        assert!(matches!(
            MeshData::load(&path),
            Err(GeometryError::UnknownFormat(ext)) if ext == "ply"
        ));
    }

    #[test]
    fn ascii_stl_loads_facets() {
        let src = "solid t
facet normal 0 0 1
outer loop
vertex 0 0 0
vertex 1 0 0
vertex 0 1 0
endloop
endfacet
endsolid t
";
        let mesh = MeshData::parse_stl(&mut Cursor::new(src.as_bytes())).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.normals()[2], [0.0, 0.0, 1.0]);
        assert_eq!(mesh.positions()[1], [1.0, 0.0, 0.0]);
    }
}
