use crate::coords::Rect;
use crate::device::GpuHandle;
use crate::paint::Color;

/// One step of a recorded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCmd {
    /// Redirect subsequent drawing into an offscreen target.
    BindTarget(GpuHandle),

    /// Return drawing to the primary target.
    UnbindTarget,

    /// Clear the bound target's color and stencil planes.
    Clear { color: Color, stencil: u8 },

    SetDepthTest(bool),

    SetStencilTest(bool),

    /// Alpha blending: color `src_alpha / one_minus_src_alpha`,
    /// alpha `one / one_minus_src_alpha`.
    SetBlend(bool),

    /// Stencil-only draw of `mesh` over `rect`.
    ///
    /// Pixels whose stencil equals `compare` become `level`; color writes are
    /// off. `index` is the mask's slot in this pass.
    WriteMask {
        mesh: GpuHandle,
        rect: Rect,
        index: u8,
        compare: u8,
        level: u8,
    },

    /// Filled or textured rectangle. With `stencil: Some(l)` only pixels whose
    /// stencil equals `l` are touched.
    Quad {
        rect: Rect,
        color: Color,
        texture: Option<GpuHandle>,
        stencil: Option<u8>,
    },

    /// Copy the color plane of `source` onto the primary target.
    BlitToPrimary { source: GpuHandle },
}
