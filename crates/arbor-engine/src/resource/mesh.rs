use serde::{Deserialize, Serialize};

use super::registry::Resource;
use super::source::ResourceSource;
use crate::coords::Vec2;
use crate::device::{GpuAllocator, GpuHandle};
use crate::error::{Error, Result};

/// Which attributes the corners of a [`MeshData`] record carry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FaceLayout {
    V = 0,
    Vt = 1,
    Vn = 2,
    Vtn = 3,
}

impl FaceLayout {
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(FaceLayout::V),
            1 => Ok(FaceLayout::Vt),
            2 => Ok(FaceLayout::Vn),
            3 => Ok(FaceLayout::Vtn),
            other => Err(Error::invalid(format!("unknown face layout code {other}"))),
        }
    }

    #[inline]
    pub const fn has_uv(self) -> bool {
        matches!(self, FaceLayout::Vt | FaceLayout::Vtn)
    }

    #[inline]
    pub const fn has_normal(self) -> bool {
        matches!(self, FaceLayout::Vn | FaceLayout::Vtn)
    }
}

/// Slot of the position index in a face corner.
pub const CORNER_POSITION: usize = 0;
/// Slot of the uv index in a face corner.
pub const CORNER_UV: usize = 1;
/// Slot of the normal index in a face corner.
pub const CORNER_NORMAL: usize = 2;

/// Three corners of `[position, uv, normal]` indices, all 0-based.
///
/// Every corner has all three slots; the layout decides which are read.
pub type Face = [[u32; 3]; 3];

/// Serialized mesh record (bincode).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub name: String,
    pub face_layout: u32,
    pub v: Vec<[f32; 3]>,
    pub n: Vec<[f32; 3]>,
    pub t: Vec<[f32; 2]>,
    pub f: Vec<Face>,
}

impl MeshData {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (data, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| Error::invalid(format!("mesh metadata: {e}")))?;
        Ok(data)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::invalid(format!("mesh metadata: {e}")))
    }
}

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Triangle list with per-corner positions, normals and uvs.
#[derive(Debug)]
pub struct Mesh {
    name: String,
    vertices: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    handle: Option<GpuHandle>,
}

impl Mesh {
    /// Builds a mesh from expanded per-corner arrays, which must have equal length.
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        uvs: Vec<[f32; 2]>,
    ) -> Result<Self> {
        let name = name.into();
        if vertices.len() != normals.len() || vertices.len() != uvs.len() {
            return Err(Error::invalid(format!(
                "mesh '{name}': {} vertices, {} normals, {} uvs",
                vertices.len(),
                normals.len(),
                uvs.len()
            )));
        }
        Ok(Self { name, vertices, normals, uvs, handle: None })
    }

    /// Expands an indexed record into per-corner arrays.
    ///
    /// Attributes missing from the layout are filled with zeros.
    pub fn from_data(data: MeshData) -> Result<Self> {
        let layout = FaceLayout::from_code(data.face_layout)?;
        if data.f.is_empty() {
            return Err(Error::invalid(format!("mesh '{}' has no faces", data.name)));
        }

        let corners = data.f.len() * 3;
        let mut vertices = Vec::with_capacity(corners);
        let mut normals = Vec::with_capacity(corners);
        let mut uvs = Vec::with_capacity(corners);

        for corner in data.f.iter().flatten() {
            vertices.push(fetch(&data.v, corner[CORNER_POSITION], "position")?);
            uvs.push(if layout.has_uv() { fetch(&data.t, corner[CORNER_UV], "uv")? } else { [0.0; 2] });
            normals.push(if layout.has_normal() { fetch(&data.n, corner[CORNER_NORMAL], "normal")? } else { [0.0; 3] });
        }

        Self::new(data.name, vertices, normals, uvs)
    }

    /// Two triangles covering `(0,0)..size`, facing +Z.
    pub fn quad(name: impl Into<String>, size: Vec2) -> Self {
        let (w, h) = (size.x, size.y);
        let vertices = vec![
            [0.0, 0.0, 0.0],
            [0.0, h, 0.0],
            [w, h, 0.0],
            [0.0, 0.0, 0.0],
            [w, h, 0.0],
            [w, 0.0, 0.0],
        ];
        let uvs = vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [1.0, 0.0]];
        Self {
            name: name.into(),
            normals: vec![[0.0, 0.0, 1.0]; vertices.len()],
            vertices,
            uvs,
            handle: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn handle(&self) -> Option<GpuHandle> {
        self.handle
    }

    pub fn interleaved(&self) -> Vec<Vertex> {
        self.vertices
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .map(|((p, n), t)| Vertex { position: *p, normal: *n, uv: *t })
            .collect()
    }
}

fn fetch<const N: usize>(items: &[[f32; N]], index: u32, what: &str) -> Result<[f32; N]> {
    items
        .get(index as usize)
        .copied()
        .ok_or_else(|| Error::invalid(format!("{what} index {index} out of range (have {})", items.len())))
}

impl Resource for Mesh {
    const KIND: &'static str = "mesh";

    fn decode(source: &mut ResourceSource) -> Result<Self> {
        let bytes = source.read_all()?;
        Self::from_data(MeshData::from_bytes(&bytes)?)
    }

    fn allocate(&mut self, gpu: &dyn GpuAllocator) -> Result<()> {
        if self.vertices.is_empty() {
            return Err(Error::invalid(format!("mesh '{}' has no vertices", self.name)));
        }
        if let Some(old) = self.handle.take() {
            gpu.release(old);
        }
        let vertices = self.interleaved();
        self.handle = Some(gpu.create_buffer(&self.name, bytemuck::cast_slice(&vertices))?);
        Ok(())
    }

    fn release(&self, gpu: &dyn GpuAllocator) {
        if let Some(handle) = self.handle {
            gpu.release(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device::{AllocationKind, HeadlessGpu};
    use crate::identity::IdentityRegistry;
    use crate::resource::ResourceRegistry;

    fn triangle(layout: u32, f: Vec<Face>) -> MeshData {
        MeshData {
            name: "tri".into(),
            face_layout: layout,
            v: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            n: vec![[0.0, 0.0, 1.0]],
            t: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            f,
        }
    }

    /// Corner `i` uses position `i`, uv `i` and the single normal.
    const FACE: Face = [[0, 0, 0], [1, 1, 0], [2, 2, 0]];

    // ── decoding ──────────────────────────────────────────────────────────

    #[test]
    fn vtn_faces_expand_per_corner() {
        let mesh = Mesh::from_data(triangle(3, vec![FACE])).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        let v = mesh.interleaved();
        assert_eq!(v[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(v[2].uv, [0.0, 1.0]);
        assert_eq!(v[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn indices_are_zero_based() {
        let mesh = Mesh::from_data(triangle(0, vec![[[0, 0, 0], [1, 0, 0], [2, 0, 0]]])).unwrap();
        let positions: Vec<_> = mesh.interleaved().iter().map(|v| v.position).collect();
        assert_eq!(positions, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn position_only_layout_zero_fills() {
        let mesh = Mesh::from_data(triangle(0, vec![FACE])).unwrap();
        assert!(mesh.interleaved().iter().all(|v| v.normal == [0.0; 3] && v.uv == [0.0; 2]));
    }

    #[test]
    fn vn_reads_the_normal_slot() {
        // uv slots point nowhere but are not read by a VN layout
        let face = [[0, 99, 0], [1, 99, 0], [2, 99, 0]];
        let mesh = Mesh::from_data(triangle(2, vec![face])).unwrap();
        assert!(mesh.interleaved().iter().all(|v| v.normal == [0.0, 0.0, 1.0] && v.uv == [0.0; 2]));

        assert!(Mesh::from_data(triangle(1, vec![face])).is_err());
    }

    #[test]
    fn empty_faces_are_invalid() {
        assert!(matches!(Mesh::from_data(triangle(0, vec![])), Err(Error::InvalidContent(_))));
    }

    #[test]
    fn unknown_layout_is_invalid() {
        assert!(matches!(Mesh::from_data(triangle(7, vec![FACE])), Err(Error::InvalidContent(_))));
    }

    #[test]
    fn out_of_range_indices_are_invalid() {
        let err = Mesh::from_data(triangle(0, vec![[[0, 0, 0], [1, 0, 0], [3, 0, 0]]])).unwrap_err();
        assert!(matches!(err, Error::InvalidContent(_)));
        assert!(Mesh::from_data(triangle(2, vec![[[0, 0, 0], [1, 0, 1], [2, 0, 0]]])).is_err());
    }

    #[test]
    fn asymmetric_arrays_are_invalid() {
        let err = Mesh::new("bad", vec![[0.0; 3]; 3], vec![[0.0; 3]; 2], vec![[0.0; 2]; 3]);
        assert!(matches!(err, Err(Error::InvalidContent(_))));
    }

    // ── registry round trip ───────────────────────────────────────────────

    #[test]
    fn load_from_encoded_metadata() {
        let gpu = Arc::new(HeadlessGpu::new());
        let reg: ResourceRegistry<Mesh> = ResourceRegistry::new(Arc::new(IdentityRegistry::new()), gpu.clone());
        let bytes = triangle(1, vec![FACE]).to_bytes().unwrap();

        reg.load(ResourceSource::from_bytes("models/tri.mesh", bytes)).unwrap();

        let mesh = reg.get("tri.mesh").unwrap();
        let alloc = gpu.allocation(mesh.handle().unwrap()).unwrap();
        assert_eq!(
            alloc.kind,
            AllocationKind::Buffer { len: 3 * std::mem::size_of::<Vertex>() }
        );
    }

    #[test]
    fn garbage_metadata_is_invalid() {
        let mut src = ResourceSource::from_bytes("x.mesh", vec![0xff; 3]);
        assert!(matches!(Mesh::decode(&mut src), Err(Error::InvalidContent(_))));
    }

    #[test]
    fn quad_covers_size() {
        let quad = Mesh::quad("q", Vec2::new(40.0, 20.0));
        assert_eq!(quad.vertex_count(), 6);
        assert!(quad.interleaved().iter().any(|v| v.position == [40.0, 20.0, 0.0]));
    }
}
