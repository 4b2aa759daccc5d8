use std::any::Any;
use std::ops::BitOr;

use crate::coords::{Rect, Vec2};
use crate::device::GpuAllocator;
use crate::error::Result;
use crate::identity::ObjectId;
use crate::render::RenderList;

use super::context::ScriptCtx;

/// Components are identified objects; their ids come from the same registry as nodes.
pub type ComponentId = ObjectId;

/// Capability set a component declares when it is constructed.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const SCRIPT: Capabilities = Capabilities(1 << 0);
    pub const TRANSFORM: Capabilities = Capabilities(1 << 1);
    pub const WIDGET: Capabilities = Capabilities(1 << 2);
    pub const MASK: Capabilities = Capabilities(1 << 3);

    #[inline]
    pub const fn union(self, other: Capabilities) -> Capabilities {
        Capabilities(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    #[inline]
    fn bitor(self, rhs: Capabilities) -> Capabilities {
        self.union(rhs)
    }
}

/// Object-safe access to the concrete type behind a `dyn Component`.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of behavior or data owned by exactly one [`GameObject`](super::GameObject).
///
/// `capabilities` must agree with the narrowing methods: a component that
/// reports `WIDGET` returns `Some` from `as_widget`, and so on. The graph only
/// calls a narrowing method when the matching capability is declared.
pub trait Component: AsAny + Send + 'static {
    /// Short type label used in logs and debug output.
    fn type_name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    fn as_script(&mut self) -> Option<&mut dyn Script> {
        None
    }

    fn as_transform(&self) -> Option<&dyn Transform> {
        None
    }

    fn as_transform_mut(&mut self) -> Option<&mut dyn Transform> {
        None
    }

    fn as_widget(&mut self) -> Option<&mut dyn Widget> {
        None
    }

    fn as_mask(&mut self) -> Option<&mut dyn Mask> {
        None
    }

    /// Gives back GPU objects. Called once when the component is destroyed.
    fn release(&mut self, gpu: &dyn GpuAllocator) {
        let _ = gpu;
    }
}

/// Receives lifecycle messages in traversal order.
pub trait Script {
    fn start(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        let _ = ctx;
    }

    fn update(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        let _ = ctx;
    }

    fn fixed_update(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        let _ = ctx;
    }

    fn late_update(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        let _ = ctx;
    }

    /// Topology under some root changed since the previous broadcast.
    fn scene_graph_update(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        let _ = ctx;
    }

    fn gui_render(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        let _ = ctx;
    }
}

/// Rectangular layout frame positioned relative to the parent's frame.
pub trait Transform {
    /// This node's frame given its parent's frame.
    fn frame_in(&self, parent: Rect) -> Rect;

    fn position(&self) -> Vec2;

    fn set_position(&mut self, position: Vec2);

    fn size(&self) -> Vec2;

    fn set_size(&mut self, size: Vec2);
}

/// Events the UI router sends to widgets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum WidgetEvent {
    MouseEnter,
    MouseLeave,
    Select,
    Deselect,
    DragStart { pointer: Vec2 },
    Drag { pointer: Vec2, delta: Vec2 },
    DragEnd { pointer: Vec2 },
    Click { pointer: Vec2 },
    MouseWheel { delta: Vec2 },
}

/// What the router should do after a widget handled an event.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub enum WidgetReply {
    #[default]
    None,
    /// Move the owning node's transform by this offset.
    MoveBy(Vec2),
}

/// Hit-testable, redrawable UI element.
pub trait Widget {
    fn hit_test(&self, frame: Rect, point: Vec2) -> bool {
        frame.contains(point)
    }

    fn on_event(&mut self, event: WidgetEvent) -> WidgetReply;

    /// True between an accepted `DragStart` and the matching `DragEnd`.
    fn dragging(&self) -> bool {
        false
    }

    fn redraw(&mut self, frame: Rect, list: &mut RenderList);
}

/// Stencil parameters handed to a mask for one render pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MaskPass {
    /// Position of the mask in this pass, saturating at 255.
    pub index: u8,
    /// Stencil value inside the nearest enclosing mask (0 outside all masks).
    pub compare: u8,
    /// Stencil value this mask writes; descendants draw where stencil equals it.
    pub level: u8,
}

/// Writes a clip region into the stencil plane for itself and its descendants.
pub trait Mask {
    /// Parameters from the most recent pass, if any.
    fn pass(&self) -> Option<MaskPass>;

    fn write_mask(
        &mut self,
        pass: MaskPass,
        frame: Rect,
        gpu: &dyn GpuAllocator,
        list: &mut RenderList,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_union_and_contains() {
        let caps = Capabilities::SCRIPT | Capabilities::WIDGET;
        assert!(caps.contains(Capabilities::SCRIPT));
        assert!(caps.contains(Capabilities::WIDGET));
        assert!(!caps.contains(Capabilities::MASK));
        assert!(caps.contains(Capabilities::NONE));
        assert!(Capabilities::NONE.is_empty());
    }
}
