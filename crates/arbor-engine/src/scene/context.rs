use crate::identity::ObjectId;
use crate::input::{InputFrame, InputState};
use crate::render::RenderList;

use super::component::{ComponentId, Script};
use super::graph::SceneGraph;

/// Lifecycle messages broadcast to [`Script`] components.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Message {
    Start,
    Update,
    FixedUpdate,
    LateUpdate,
    SceneGraphUpdate,
    GuiRender,
}

impl Message {
    pub(crate) fn deliver(self, script: &mut dyn Script, ctx: &mut ScriptCtx<'_, '_>) {
        match self {
            Message::Start => script.start(ctx),
            Message::Update => script.update(ctx),
            Message::FixedUpdate => script.fixed_update(ctx),
            Message::LateUpdate => script.late_update(ctx),
            Message::SceneGraphUpdate => script.scene_graph_update(ctx),
            Message::GuiRender => script.gui_render(ctx),
        }
    }
}

/// Timing for the message being delivered.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameInfo {
    /// Seconds covered by this message: the frame delta, or the fixed step
    /// during `FixedUpdate`.
    pub dt: f64,
    pub frame_index: u64,
}

/// Per-frame services shared by every handler in a broadcast.
pub struct FrameEnv<'e> {
    pub time: FrameInfo,
    pub input: &'e InputState,
    pub edges: &'e InputFrame,
    pub render: &'e mut RenderList,
}

/// What a script handler sees: the graph (its own component is checked out
/// while it runs), the frame services and its own location.
pub struct ScriptCtx<'a, 'e> {
    pub graph: &'a mut SceneGraph,
    pub env: &'a mut FrameEnv<'e>,
    /// Node owning the running component.
    pub owner: ObjectId,
    /// The running component.
    pub this: ComponentId,
}

impl ScriptCtx<'_, '_> {
    #[inline]
    pub fn dt(&self) -> f64 {
        self.env.time.dt
    }

    #[inline]
    pub fn input(&self) -> &InputState {
        self.env.input
    }

    #[inline]
    pub fn edges(&self) -> &InputFrame {
        self.env.edges
    }

    #[inline]
    pub fn render(&mut self) -> &mut RenderList {
        self.env.render
    }
}
