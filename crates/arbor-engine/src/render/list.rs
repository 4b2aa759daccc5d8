use crate::coords::Rect;
use crate::device::GpuHandle;
use crate::paint::Color;

use super::RenderCmd;

/// Recorded command stream for one frame.
///
/// Quads pushed through [`quad`](Self::quad) inherit the stencil level on top
/// of the stencil stack, so a widget only needs to know its rect and color.
#[derive(Debug, Default)]
pub struct RenderList {
    cmds: Vec<RenderCmd>,
    stencil_stack: Vec<u8>,
}

impl RenderList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops recorded commands and the stencil stack, keeping capacity.
    pub fn clear(&mut self) {
        self.cmds.clear();
        self.stencil_stack.clear();
    }

    #[inline]
    pub fn push(&mut self, cmd: RenderCmd) {
        self.cmds.push(cmd);
    }

    #[inline]
    pub fn commands(&self) -> &[RenderCmd] {
        &self.cmds
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Gates subsequent quads on stencil `level`.
    pub fn push_stencil(&mut self, level: u8) {
        self.stencil_stack.push(level);
    }

    pub fn pop_stencil(&mut self) {
        if self.stencil_stack.pop().is_none() {
            log::warn!("RenderList::pop_stencil called with empty stencil stack");
        }
    }

    #[inline]
    pub fn current_stencil(&self) -> Option<u8> {
        self.stencil_stack.last().copied()
    }

    /// Records a quad gated by the current stencil level.
    pub fn quad(&mut self, rect: Rect, color: Color, texture: Option<GpuHandle>) {
        let stencil = self.current_stencil();
        self.cmds.push(RenderCmd::Quad { rect, color, texture, stencil });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stencil_of(cmd: &RenderCmd) -> Option<u8> {
        match cmd {
            RenderCmd::Quad { stencil, .. } => *stencil,
            other => panic!("not a quad: {other:?}"),
        }
    }

    #[test]
    fn quads_inherit_stencil_level() {
        let mut list = RenderList::new();
        let r = Rect::new(0.0, 0.0, 4.0, 4.0);

        list.quad(r, Color::WHITE, None);
        list.push_stencil(1);
        list.quad(r, Color::WHITE, None);
        list.push_stencil(2);
        list.quad(r, Color::WHITE, None);
        list.pop_stencil();
        list.quad(r, Color::WHITE, None);

        let levels: Vec<_> = list.commands().iter().map(stencil_of).collect();
        assert_eq!(levels, vec![None, Some(1), Some(2), Some(1)]);
    }

    #[test]
    fn clear_resets_stack() {
        let mut list = RenderList::new();
        list.push_stencil(3);
        list.push(RenderCmd::SetBlend(true));
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.current_stencil(), None);
    }
}
