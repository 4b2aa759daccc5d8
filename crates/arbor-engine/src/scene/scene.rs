use log::debug;

use super::context::{FrameEnv, Message};
use super::graph::SceneGraph;

/// A named scene graph together with its per-tick broadcast schedule.
#[derive(Debug)]
pub struct Scene {
    name: String,
    graph: SceneGraph,
}

impl Scene {
    pub fn new(name: impl Into<String>, graph: SceneGraph) -> Self {
        Self { name: name.into(), graph }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    #[inline]
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Logic tick: revalidate, `Start` for components that have not started,
    /// then `Update` and `LateUpdate`.
    pub fn update(&mut self, env: &mut FrameEnv<'_>) {
        self.refresh(env);
        let started = self.graph.broadcast(Message::Start, env);
        if started > 0 {
            debug!("Scene '{}': started {started} component(s)", self.name);
        }
        self.graph.broadcast(Message::Update, env);
        self.graph.broadcast(Message::LateUpdate, env);
    }

    pub fn fixed_update(&mut self, env: &mut FrameEnv<'_>) {
        self.graph.broadcast(Message::FixedUpdate, env);
    }

    /// Render tick: revalidate, then `GuiRender`.
    pub fn render(&mut self, env: &mut FrameEnv<'_>) {
        self.refresh(env);
        self.graph.broadcast(Message::GuiRender, env);
    }

    /// Rebuilds dirty traversal orders and, if topology changed since the
    /// last refresh, tells every started script through `SceneGraphUpdate`.
    fn refresh(&mut self, env: &mut FrameEnv<'_>) {
        self.graph.validate();
        if self.graph.take_changed() {
            self.graph.broadcast(Message::SceneGraphUpdate, env);
        }
    }
}
