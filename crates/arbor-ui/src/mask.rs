use arbor_engine::Result;
use arbor_engine::coords::{Rect, Vec2};
use arbor_engine::device::GpuAllocator;
use arbor_engine::error::Error;
use arbor_engine::render::{RenderCmd, RenderList};
use arbor_engine::resource::{Mesh, Resource};
use arbor_engine::scene::{Capabilities, Component, Mask, MaskPass};
use log::trace;

/// Clips its node's widgets, and those of every descendant, to the node's frame.
///
/// Keeps a quad mesh on the GPU sized to the last frame it wrote; the mesh is
/// rebuilt only when that size changes.
#[derive(Debug, Default)]
pub struct MaskComponent {
    mesh: Option<Mesh>,
    size: Vec2,
    pass: Option<MaskPass>,
}

impl MaskComponent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the GPU quad was built for.
    pub fn mesh_size(&self) -> Option<Vec2> {
        self.mesh.as_ref().map(|_| self.size)
    }

    fn ensure_mesh(&mut self, size: Vec2, gpu: &dyn GpuAllocator) -> Result<()> {
        if self.mesh_size() == Some(size) && self.mesh.as_ref().is_some_and(|m| m.handle().is_some()) {
            return Ok(());
        }
        if let Some(old) = self.mesh.take() {
            old.release(gpu);
        }
        trace!("MaskComponent: rebuilding quad {}x{}", size.x, size.y);
        let mut mesh = Mesh::quad("ui.mask", size);
        mesh.allocate(gpu)?;
        self.mesh = Some(mesh);
        self.size = size;
        Ok(())
    }
}

impl Mask for MaskComponent {
    fn pass(&self) -> Option<MaskPass> {
        self.pass
    }

    fn write_mask(&mut self, pass: MaskPass, frame: Rect, gpu: &dyn GpuAllocator, list: &mut RenderList) -> Result<()> {
        self.pass = Some(pass);
        self.ensure_mesh(frame.size, gpu)?;
        let mesh = self
            .mesh
            .as_ref()
            .and_then(Mesh::handle)
            .ok_or_else(|| Error::Gpu("mask quad has no buffer".into()))?;
        list.push(RenderCmd::WriteMask {
            mesh,
            rect: frame,
            index: pass.index,
            compare: pass.compare,
            level: pass.level,
        });
        Ok(())
    }
}

impl Component for MaskComponent {
    fn type_name(&self) -> &'static str {
        "ui.mask"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::MASK
    }

    fn as_mask(&mut self) -> Option<&mut dyn Mask> {
        Some(self)
    }

    fn release(&mut self, gpu: &dyn GpuAllocator) {
        if let Some(mesh) = self.mesh.take() {
            mesh.release(gpu);
        }
    }
}
