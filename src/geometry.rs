//! Loading and preparing model geometry before upload.
//!
//! The viewer shows a single mesh: either the built-in cube or a model file.
//! [`RawGeometry`] is the CPU-side representation; [`GeometryOptions`] applies
//! the fixups models usually need (centering, fitting to a unit cube, Z-up to
//! Y-up) so the orientation math always rotates the model about its middle.
//!
//! # Supported Formats
//!
//! | Format | Extensions | Notes |
//! |--------|------------|-------|
//! | OBJ    | `.obj`     | Positions, normals and UVs; materials are ignored |
//! | STL    | `.stl`     | Binary and ASCII, no UV coordinates |

use std::io::{BufRead, Read, Seek};
use std::path::Path;

use glam::{Quat, Vec3};
use thiserror::Error;

use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d, cube_geometry};

/// Errors that can occur when loading geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse OBJ: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("unknown geometry format: '{0}'")]
    UnknownFormat(String),
    #[error("model contains no triangles")]
    Empty,
}

/// Raw geometry data before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct RawGeometry {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// The built-in unit cube.
    pub fn cube() -> Self {
        let (vertices, indices) = cube_geometry();
        Self::new(vertices, indices)
    }

    /// Load a model file, picking the parser from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GeometryError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "obj" => {
                let file = std::fs::File::open(path)?;
                Self::from_obj(&mut std::io::BufReader::new(file))
            }
            "stl" => {
                let file = std::fs::File::open(path)?;
                Self::from_stl(&mut std::io::BufReader::new(file))
            }
            _ => Err(GeometryError::UnknownFormat(ext)),
        }
    }

    /// Parse binary or ASCII STL.
    ///
    /// STL stores one normal per face, so every face gets its own three
    /// vertices carrying that normal. UVs are zero.
    pub fn from_stl<R: Read + Seek>(reader: &mut R) -> Result<Self, GeometryError> {
        let stl = stl_io::read_stl(reader)?;
        if stl.faces.is_empty() {
            return Err(GeometryError::Empty);
        }

        let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
        let mut indices = Vec::with_capacity(stl.faces.len() * 3);

        for (i, face) in stl.faces.iter().enumerate() {
            let normal: [f32; 3] = face.normal.into();

            for &vertex_idx in &face.vertices {
                let position: [f32; 3] = stl.vertices[vertex_idx].into();
                vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
            }

            let base = (i * 3) as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }

        Ok(Self::new(vertices, indices))
    }

    /// Parse Wavefront OBJ, triangulated, merging every object into one mesh.
    ///
    /// V is flipped so OBJ's bottom-left texture origin maps onto wgpu's
    /// top-left one. Objects without normals get smooth normals computed.
    pub fn from_obj<R: BufRead>(reader: &mut R) -> Result<Self, GeometryError> {
        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        };
        let (models, _materials) = tobj::load_obj_buf(reader, &options, |_| Ok(Default::default()))?;

        let mut geometry = Self::new(Vec::new(), Vec::new());
        let mut missing_normals = false;

        for model in &models {
            let mesh = &model.mesh;
            let count = mesh.positions.len() / 3;
            let has_normals = mesh.normals.len() == count * 3;
            let has_uvs = mesh.texcoords.len() == count * 2;
            missing_normals |= !has_normals;

            let base = geometry.vertices.len() as u32;
            for (i, p) in mesh.positions.chunks_exact(3).enumerate() {
                let normal = if has_normals {
                    [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
                } else {
                    [0.0; 3]
                };
                let uv = if has_uvs {
                    [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
                } else {
                    [0.0; 2]
                };
                geometry.vertices.push(Vertex3d::new([p[0], p[1], p[2]], normal, uv));
            }
            geometry.indices.extend(mesh.indices.iter().map(|i| base + i));
        }

        if geometry.indices.is_empty() {
            return Err(GeometryError::Empty);
        }
        if missing_normals {
            geometry.recalculate_normals();
        }

        Ok(geometry)
    }

    /// False when every UV is zero, as for STL input; a texture would show as
    /// one flat color.
    pub fn has_uvs(&self) -> bool {
        self.vertices.iter().any(|v| v.uv != [0.0, 0.0])
    }

    /// Returns the `(min, max)` corners of the axis-aligned bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) + offset).into();
        }
    }

    /// Scales all vertices uniformly around the origin.
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) * factor).into();
        }
    }

    /// Rotates all vertices and normals by the given quaternion.
    pub fn rotate(&mut self, rotation: Quat) {
        for v in &mut self.vertices {
            v.position = (rotation * Vec3::from(v.position)).into();
            v.normal = (rotation * Vec3::from(v.normal)).into();
        }
    }

    /// Centers the bounding box on the origin.
    pub fn recenter(&mut self) {
        let center = self.center();
        self.translate(-center);
    }

    /// Scales the geometry to fit within a unit cube (-0.5 to 0.5).
    pub fn normalize(&mut self) {
        let size = self.size();
        let max_dim = size.x.max(size.y).max(size.z);
        if max_dim > 0.0 {
            self.scale(1.0 / max_dim);
        }
    }

    /// Recompute smooth normals by area-weighted averaging of face normals.
    ///
    /// Only vertices shared through the index buffer are smoothed; STL input
    /// has unshared vertices and therefore stays faceted.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];

            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            let face_normal = (p1 - p0).cross(p2 - p0);

            for i in [i0, i1, i2] {
                let n = Vec3::from(self.vertices[i].normal) + face_normal;
                self.vertices[i].normal = n.into();
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().into();
        }
    }

    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}

/// Fixups applied to loaded geometry, in the order listed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometryOptions {
    /// Move the bounding box center to the origin.
    pub center: bool,
    /// Convert a Z-up model to Y-up (-90 degrees about X).
    pub upright: bool,
    /// Fit into a unit cube.
    pub normalize: bool,
    /// Recompute normals from faces.
    pub smooth_normals: bool,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            center: true,
            upright: false,
            normalize: true,
            smooth_normals: false,
        }
    }
}

impl GeometryOptions {
    pub fn apply(&self, geometry: &mut RawGeometry) {
        if self.center {
            geometry.recenter();
        }
        if self.upright {
            geometry.rotate(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2));
        }
        if self.normalize {
            geometry.normalize();
        }
        if self.smooth_normals {
            geometry.recalculate_normals();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Binary STL with one triangle per entry, normals taken as given.
    fn binary_stl(triangles: &[([f32; 3], [[f32; 3]; 3])]) -> Vec<u8> {
        let mut bytes = vec![0u8; 80];
        bytes.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for (normal, verts) in triangles {
            for value in normal.iter().chain(verts.iter().flatten()) {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
            bytes.extend_from_slice(&0u16.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn raw_geometry_bounds() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let geom = RawGeometry::new(vertices, vec![0, 1, 2]);

        let (min, max) = geom.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn raw_geometry_recenter() {
        let vertices = vec![
            Vertex3d::new([2.0, 2.0, 2.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([4.0, 4.0, 4.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let mut geom = RawGeometry::new(vertices, vec![0, 1, 0]);

        geom.recenter();

        assert!(geom.center().length() < 0.001);
    }

    #[test]
    fn default_options_fit_unit_cube_at_origin() {
        let mut geom = RawGeometry::cube();
        geom.scale(10.0);
        geom.translate(Vec3::new(5.0, -3.0, 1.0));

        GeometryOptions::default().apply(&mut geom);

        assert!(geom.center().length() < 1e-5);
        assert!((geom.size() - Vec3::ONE).length() < 1e-5);
    }

    #[test]
    fn upright_turns_z_up_into_y_up() {
        let vertices = vec![Vertex3d::new([0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0])];
        let mut geom = RawGeometry::new(vertices, vec![]);
        let options = GeometryOptions {
            center: false,
            upright: true,
            normalize: false,
            smooth_normals: false,
        };

        options.apply(&mut geom);

        let p = Vec3::from(geom.vertices[0].position);
        let n = Vec3::from(geom.vertices[0].normal);
        assert!((p - Vec3::Y).length() < 1e-5, "{p}");
        assert!((n - Vec3::Y).length() < 1e-5, "{n}");
    }

    #[test]
    fn smooth_normals_average_shared_vertices() {
        // Two triangles folded along the shared edge 0-1.
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex3d::new([1.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex3d::new([0.0, 1.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex3d::new([0.0, 0.0, -1.0], [0.0; 3], [0.0, 0.0]),
        ];
        let mut geom = RawGeometry::new(vertices, vec![0, 1, 2, 1, 0, 3]);

        geom.recalculate_normals();

        let shared = Vec3::from(geom.vertices[0].normal);
        let expected = Vec3::new(0.0, -1.0, 1.0).normalize();
        assert!((shared - expected).length() < 1e-5, "{shared}");
        assert!((Vec3::from(geom.vertices[2].normal) - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn parses_binary_stl() {
        let bytes = binary_stl(&[
            ([0.0, 0.0, 1.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
            ([0.0, 0.0, 1.0], [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
        ]);

        let geom = RawGeometry::from_stl(&mut std::io::Cursor::new(bytes)).unwrap();

        assert_eq!(geom.triangle_count(), 2);
        assert_eq!(geom.vertices.len(), 6);
        assert_eq!(geom.vertices[4].position, [1.0, 1.0, 0.0]);
        assert!(geom.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert_eq!(geom.indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_stl_is_rejected() {
        let bytes = binary_stl(&[]);
        let err = RawGeometry::from_stl(&mut std::io::Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, GeometryError::Empty));
    }

    #[test]
    fn parses_obj_with_uvs() {
        let obj = "\
o quad
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
        let geom = RawGeometry::from_obj(&mut std::io::Cursor::new(obj)).unwrap();

        assert_eq!(geom.triangle_count(), 2);
        assert_eq!(geom.vertices.len(), 4);
        assert!(geom.has_uvs());
        let uvs: Vec<[f32; 2]> = geom.vertices.iter().map(|v| v.uv).collect();
        assert!(uvs.contains(&[1.0, 1.0]), "{uvs:?}");
        assert!(uvs.contains(&[1.0, 0.0]), "{uvs:?}");
        assert!(geom.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn obj_without_normals_gets_computed_ones() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let geom = RawGeometry::from_obj(&mut std::io::Cursor::new(obj)).unwrap();

        assert!(!geom.has_uvs());
        for v in &geom.vertices {
            assert!((Vec3::from(v.normal) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn empty_obj_is_rejected() {
        let err = RawGeometry::from_obj(&mut std::io::Cursor::new("# nothing\n")).unwrap_err();
        assert!(matches!(err, GeometryError::Empty));
    }

    #[test]
    fn stl_geometry_has_no_uvs() {
        let bytes = binary_stl(&[([0.0, 0.0, 1.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])]);
        let geom = RawGeometry::from_stl(&mut std::io::Cursor::new(bytes)).unwrap();
        assert!(!geom.has_uvs());
        assert!(RawGeometry::cube().has_uvs());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = RawGeometry::from_file("model.fbx").unwrap_err();
        assert!(matches!(err, GeometryError::UnknownFormat(ext) if ext == "fbx"));
    }
}
