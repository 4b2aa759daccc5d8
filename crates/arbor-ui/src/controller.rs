use std::collections::HashMap;

use arbor_engine::coords::{Rect, Vec2};
use arbor_engine::device::{GpuAllocator, GpuHandle};
use arbor_engine::identity::ObjectId;
use arbor_engine::paint::Color;
use arbor_engine::render::{RenderCmd, RenderList};
use arbor_engine::scene::{
    Capabilities, Component, ComponentId, FrameEnv, MaskPass, SceneGraph, Script, ScriptCtx, WidgetEvent, WidgetReply,
};
use arbor_engine::Result;
use log::{debug, error, trace, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Cached {
    node: ObjectId,
    component: ComponentId,
}

/// Routes pointer input to the widgets below its node and composites them
/// through an offscreen target clipped by their masks.
///
/// Widgets and masks are cached in traversal order, which is also the hit
/// priority: the first widget accepting the pointer wins.
///
/// Per tick with pending input:
///
/// 1. A dragging selection receives `Drag` (and nothing else happens) until
///    the primary button is released, which sends `DragEnd` and falls through.
/// 2. Hover changes send `MouseLeave` to the old widget, then `MouseEnter`
///    to the new one.
/// 3. At most one of press (`Select`/`DragStart` or `Deselect`), release
///    (`Click`) or wheel (`MouseWheel`) is handled.
#[derive(Debug, Default)]
pub struct Controller {
    widgets: Vec<Cached>,
    masks: Vec<Cached>,
    hovered: Option<ComponentId>,
    selected: Option<ComponentId>,
    target: Option<GpuHandle>,
    mask_index: u8,
    last_pointer: Option<Vec2>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widget components under the controller, in hit order.
    pub fn widgets(&self) -> Vec<ComponentId> {
        self.widgets.iter().map(|c| c.component).collect()
    }

    pub fn masks(&self) -> Vec<ComponentId> {
        self.masks.iter().map(|c| c.component).collect()
    }

    #[inline]
    pub fn hovered(&self) -> Option<ComponentId> {
        self.hovered
    }

    #[inline]
    pub fn selected(&self) -> Option<ComponentId> {
        self.selected
    }

    /// Offscreen target the widgets are drawn into.
    #[inline]
    pub fn target(&self) -> Option<GpuHandle> {
        self.target
    }

    /// Re-collects widgets and masks below `owner`. Hover and selection on
    /// components that are gone are dropped without events.
    pub fn refresh_cache(&mut self, graph: &SceneGraph, owner: ObjectId) {
        let collect = |caps| {
            graph
                .descendant_components(owner, caps)
                .into_iter()
                .filter_map(|component| graph.owner_of(component).map(|node| Cached { node, component }))
                .collect::<Vec<_>>()
        };
        self.widgets = collect(Capabilities::WIDGET);
        self.masks = collect(Capabilities::MASK);

        let alive = |id: &ComponentId| self.widgets.iter().any(|c| c.component == *id);
        self.hovered = self.hovered.filter(alive);
        self.selected = self.selected.filter(alive);

        trace!("Controller: cached {} widget(s), {} mask(s)", self.widgets.len(), self.masks.len());
    }

    /// Matches the offscreen target and the controller's own frame to the viewport.
    fn resize(&mut self, ctx: &mut ScriptCtx<'_, '_>) -> Result<()> {
        let viewport = ctx.env.input.viewport;
        let (width, height) = viewport.physical_size();
        let gpu = ctx.graph.gpu();
        match self.target {
            Some(target) => gpu.resize_target(target, width, height)?,
            None => self.target = Some(gpu.create_target("ui.controller", width, height)?),
        }
        if let Some(transform) = ctx.graph.transform_mut(ctx.owner) {
            transform.set_size(viewport.size());
        }
        debug!("Controller: resized to {width}x{height}");
        Ok(())
    }

    fn resize_or_log(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        if let Err(e) = self.resize(ctx) {
            error!("Controller: resize failed: {e}");
        }
    }

    // ── routing ───────────────────────────────────────────────────────────

    fn route(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        let input = ctx.env.input;
        let edges = ctx.env.edges;
        let graph = &mut *ctx.graph;
        let base = input.viewport.rect();
        let pointer = input.pointer_or_offscreen();
        let delta = match (input.pointer, self.last_pointer) {
            (Some(now), Some(then)) => now - then,
            _ => Vec2::ZERO,
        };
        self.last_pointer = input.pointer;

        if let Some(selected) = self.selected {
            if graph.widget_mut(selected).is_some_and(|w| w.dragging()) {
                if edges.primary_released() {
                    emit(graph, selected, WidgetEvent::DragEnd { pointer });
                } else {
                    emit(graph, selected, WidgetEvent::Drag { pointer, delta });
                    return;
                }
            }
        }

        let target = self.hit_test(graph, base, pointer);

        if target != self.hovered {
            if let Some(prev) = self.hovered.take() {
                emit(graph, prev, WidgetEvent::MouseLeave);
            }
            self.hovered = target;
            if let Some(next) = target {
                emit(graph, next, WidgetEvent::MouseEnter);
            }
        }

        if edges.primary_pressed() {
            match target {
                Some(t) if self.selected != Some(t) => {
                    if let Some(prev) = self.selected.replace(t) {
                        emit(graph, prev, WidgetEvent::Deselect);
                    }
                    emit(graph, t, WidgetEvent::Select);
                    emit(graph, t, WidgetEvent::DragStart { pointer });
                }
                Some(t) => emit(graph, t, WidgetEvent::DragStart { pointer }),
                None => {
                    if let Some(prev) = self.selected.take() {
                        emit(graph, prev, WidgetEvent::Deselect);
                    }
                }
            }
        } else if edges.primary_released() {
            if let Some(t) = target {
                emit(graph, t, WidgetEvent::Click { pointer });
            }
        } else if let Some(wheel) = edges.scrolled() {
            if let Some(t) = target {
                emit(graph, t, WidgetEvent::MouseWheel { delta: wheel });
            }
        }
    }

    fn hit_test(&self, graph: &mut SceneGraph, base: Rect, pointer: Vec2) -> Option<ComponentId> {
        self.widgets.iter().find_map(|c| {
            let frame = graph.world_frame(c.node, base);
            let hit = graph.widget_mut(c.component).is_some_and(|w| w.hit_test(frame, pointer));
            hit.then_some(c.component)
        })
    }

    // ── compositing ───────────────────────────────────────────────────────

    fn next_mask_index(&mut self) -> u8 {
        let index = self.mask_index;
        self.mask_index = self.mask_index.saturating_add(1);
        index
    }

    fn composite(&mut self, graph: &mut SceneGraph, env: &mut FrameEnv<'_>) {
        if self.widgets.is_empty() {
            return;
        }
        let Some(target) = self.target else {
            warn!("Controller: no offscreen target, skipping UI pass");
            return;
        };
        let base = env.input.viewport.rect();
        let gpu = graph.gpu_arc().clone();
        let list = &mut *env.render;

        list.push(RenderCmd::BindTarget(target));
        list.push(RenderCmd::Clear { color: Color::TRANSPARENT, stencil: 0 });
        list.push(RenderCmd::SetDepthTest(false));
        list.push(RenderCmd::SetStencilTest(true));
        list.push(RenderCmd::SetBlend(true));

        // node -> stencil level written by the last mask on that node
        let mut levels: HashMap<ObjectId, u8> = HashMap::new();
        self.mask_index = 0;
        for i in 0..self.masks.len() {
            let Cached { node, component } = self.masks[i];
            let index = self.next_mask_index();
            let compare = enclosing_level(graph, &levels, node).unwrap_or(0);
            let pass = MaskPass { index, compare, level: index.saturating_add(1) };
            levels.insert(node, pass.level);

            let frame = graph.world_frame(node, base);
            if let Some(mask) = graph.mask_mut(component) {
                if let Err(e) = mask.write_mask(pass, frame, &*gpu, list) {
                    error!("Controller: mask {component} failed to write: {e}");
                }
            }
        }
        if self.masks.len() > usize::from(u8::MAX) + 1 {
            warn!("Controller: {} masks, stencil slot {} is shared", self.masks.len(), u8::MAX);
        }

        for c in &self.widgets {
            let frame = graph.world_frame(c.node, base);
            let level = enclosing_level(graph, &levels, c.node);
            if let Some(widget) = graph.widget_mut(c.component) {
                redraw_gated(list, level, |list| widget.redraw(frame, list));
            }
        }

        list.push(RenderCmd::UnbindTarget);
        list.push(RenderCmd::SetStencilTest(false));
        list.push(RenderCmd::BlitToPrimary { source: target });
        list.push(RenderCmd::SetDepthTest(true));
        list.push(RenderCmd::SetBlend(false));
    }
}

fn redraw_gated(list: &mut RenderList, level: Option<u8>, draw: impl FnOnce(&mut RenderList)) {
    match level {
        Some(level) => {
            list.push_stencil(level);
            draw(list);
            list.pop_stencil();
        }
        None => draw(list),
    }
}

/// Level of the nearest mask on `node` or one of its ancestors.
fn enclosing_level(graph: &SceneGraph, levels: &HashMap<ObjectId, u8>, node: ObjectId) -> Option<u8> {
    if levels.is_empty() {
        return None;
    }
    std::iter::once(node).chain(graph.ancestors(node)).find_map(|n| levels.get(&n).copied())
}

/// Sends `event` and applies the widget's reply to its node.
fn emit(graph: &mut SceneGraph, component: ComponentId, event: WidgetEvent) {
    let Some(widget) = graph.widget_mut(component) else {
        return;
    };
    trace!("Controller: {event:?} -> {component}");
    if let WidgetReply::MoveBy(delta) = widget.on_event(event) {
        let node = graph.owner_of(component);
        if let Some(transform) = node.and_then(|n| graph.transform_mut(n)) {
            let position = transform.position();
            transform.set_position(position + delta);
        }
    }
}

impl Script for Controller {
    fn start(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        self.resize_or_log(ctx);
        self.refresh_cache(ctx.graph, ctx.owner);
    }

    fn update(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        if ctx.env.edges.resized.is_some() {
            self.resize_or_log(ctx);
        }
        if ctx.env.edges.has_events() {
            self.route(ctx);
        }
    }

    fn scene_graph_update(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        self.refresh_cache(ctx.graph, ctx.owner);
    }

    fn gui_render(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
        self.composite(ctx.graph, ctx.env);
    }
}

impl Component for Controller {
    fn type_name(&self) -> &'static str {
        "ui.controller"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SCRIPT
    }

    fn as_script(&mut self) -> Option<&mut dyn Script> {
        Some(self)
    }

    fn release(&mut self, gpu: &dyn GpuAllocator) {
        if let Some(target) = self.target.take() {
            gpu.release(target);
        }
    }
}
