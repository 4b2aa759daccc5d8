use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use super::app::{App, AppControl};
use super::config::EngineConfig;
use super::system::{SetupCtx, System, Systems};
use crate::coords::Viewport;
use crate::device::GpuAllocator;
use crate::error::Result;
use crate::identity::IdentityRegistry;
use crate::input::{InputEvent, InputFrame, InputState};
use crate::render::RenderList;
use crate::resource::{Mesh, Resource, ResourceRegistry, Resources, Texture};
use crate::scene::{ComponentBuilders, FrameEnv, FrameInfo, Scene, SceneGraph};
use crate::time::{FixedStep, FrameClock};

/// Shared stop switch for [`Engine::run`].
///
/// Cloning is cheap; any clone may stop the loop, from any thread.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// What one call to [`Engine::frame`] did.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub fixed_steps: u32,
}

/// The engine context.
///
/// Construction order is identity → GPU → resources → builders → scene;
/// [`shutdown`](Self::shutdown) (also run on drop) tears down in reverse.
pub struct Engine {
    config: EngineConfig,
    ids: Arc<IdentityRegistry>,
    gpu: Arc<dyn GpuAllocator>,
    resources: Resources,
    builders: ComponentBuilders,
    systems: Systems,
    scene: Option<Scene>,

    input: InputState,
    edges: InputFrame,
    fixed: FixedStep,
    render: RenderList,

    frame_index: u64,
    run: RunFlag,
    is_shut_down: bool,
}

impl Engine {
    pub fn new(config: EngineConfig, gpu: Arc<dyn GpuAllocator>) -> Result<Self> {
        config.validate()?;

        let ids = Arc::new(IdentityRegistry::new());
        let resources = Resources::new();
        resources.insert(Arc::new(ResourceRegistry::<Mesh>::new(ids.clone(), gpu.clone())))?;
        resources.insert(Arc::new(ResourceRegistry::<Texture>::new(ids.clone(), gpu.clone())))?;

        debug!(
            "Engine: created (fixed step {}s, catch-up {}, viewport {}x{})",
            config.fixed_step, config.max_catch_up, config.viewport.width, config.viewport.height
        );

        Ok(Self {
            input: InputState::new(config.viewport),
            edges: InputFrame::default(),
            fixed: FixedStep::new(config.fixed_step, config.max_catch_up),
            render: RenderList::new(),
            config,
            ids,
            gpu,
            resources,
            builders: ComponentBuilders::new(),
            systems: Systems::new(),
            scene: None,
            frame_index: 0,
            run: RunFlag::new(),
            is_shut_down: false,
        })
    }

    // ── services ──────────────────────────────────────────────────────────

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn ids(&self) -> &Arc<IdentityRegistry> {
        &self.ids
    }

    #[inline]
    pub fn gpu(&self) -> &Arc<dyn GpuAllocator> {
        &self.gpu
    }

    #[inline]
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn meshes(&self) -> Result<Arc<ResourceRegistry<Mesh>>> {
        self.resources.registry::<Mesh>(Mesh::KIND)
    }

    pub fn textures(&self) -> Result<Arc<ResourceRegistry<Texture>>> {
        self.resources.registry::<Texture>(Texture::KIND)
    }

    #[inline]
    pub fn builders(&self) -> &ComponentBuilders {
        &self.builders
    }

    #[inline]
    pub fn builders_mut(&mut self) -> &mut ComponentBuilders {
        &mut self.builders
    }

    #[inline]
    pub fn systems(&self) -> &Systems {
        &self.systems
    }

    /// Adds a system; it is set up by [`setup`](Self::setup). Duplicate names panic.
    pub fn register_system(&mut self, system: Box<dyn System>) {
        self.systems.register(system);
    }

    /// Sets up every registered system in registration order.
    pub fn setup(&mut self) -> Result<()> {
        let mut ctx = SetupCtx {
            ids: &self.ids,
            gpu: &self.gpu,
            resources: &self.resources,
            builders: &mut self.builders,
        };
        self.systems.setup_all(&mut ctx)
    }

    #[inline]
    pub fn run_flag(&self) -> RunFlag {
        self.run.clone()
    }

    // ── scene ─────────────────────────────────────────────────────────────

    /// An empty scene wired to this engine's registries.
    pub fn new_scene(&self, name: &str) -> Scene {
        Scene::new(name, SceneGraph::new(self.ids.clone(), self.gpu.clone()))
    }

    /// Builds a scene document and makes it active.
    ///
    /// On failure the active scene is left untouched.
    pub fn load_scene(&mut self, bytes: &[u8]) -> Result<()> {
        let scene = self.builders.build_scene(bytes, self.ids.clone(), self.gpu.clone())?;
        info!("Engine: loaded scene '{}'", scene.name());
        self.set_scene(scene);
        Ok(())
    }

    /// Activates `scene`, returning the previous one.
    pub fn set_scene(&mut self, scene: Scene) -> Option<Scene> {
        self.fixed.reset();
        self.scene.replace(scene)
    }

    pub fn take_scene(&mut self) -> Option<Scene> {
        self.scene.take()
    }

    #[inline]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    #[inline]
    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    // ── input ─────────────────────────────────────────────────────────────

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.apply_event(&mut self.edges, event);
    }

    #[inline]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.input.viewport
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Runs one frame: update phase, fixed phase, render phase.
    ///
    /// `dt` is clamped to `[0, max_frame_dt]`. Input edges pushed since the
    /// previous frame are visible to every handler and cleared afterwards.
    pub fn frame(&mut self, dt: f64) -> FrameStats {
        let dt = if dt.is_finite() { dt.clamp(0.0, self.config.max_frame_dt) } else { 0.0 };
        self.frame_index += 1;
        let mut stats = FrameStats { frame_index: self.frame_index, fixed_steps: 0 };

        if let Some(scene) = self.scene.as_mut() {
            let mut env = FrameEnv {
                time: FrameInfo { dt, frame_index: self.frame_index },
                input: &self.input,
                edges: &self.edges,
                render: &mut self.render,
            };

            scene.update(&mut env);

            let steps = self.fixed.advance(dt);
            env.time.dt = self.fixed.step();
            for _ in 0..steps {
                scene.fixed_update(&mut env);
            }
            stats.fixed_steps = steps;

            env.time.dt = dt;
            env.render.clear();
            scene.render(&mut env);
        } else {
            self.render.clear();
        }

        self.edges.clear();
        stats
    }

    /// Render commands recorded by the last frame.
    #[inline]
    pub fn render_list(&self) -> &RenderList {
        &self.render
    }

    /// Drives `app` until it asks to exit or the run flag is cleared.
    ///
    /// Returns the number of frames run.
    pub fn run<A: App>(&mut self, app: &mut A, clock: &mut FrameClock) -> Result<u64> {
        self.setup()?;
        app.setup(self)?;
        clock.reset();

        let mut frames = 0;
        while self.run.is_running() {
            if app.before_frame(self) == AppControl::Exit {
                break;
            }
            let time = clock.tick();
            let stats = self.frame(time.dt);
            frames += 1;
            if app.after_frame(self, stats) == AppControl::Exit {
                break;
            }
        }

        app.teardown(self);
        info!("Engine: ran {frames} frame(s)");
        Ok(frames)
    }

    /// Tears everything down in reverse construction order. Idempotent.
    pub fn shutdown(&mut self) {
        if self.is_shut_down {
            return;
        }
        self.is_shut_down = true;
        self.run.stop();

        if let Some(scene) = self.scene.take() {
            debug!("Engine: dropping scene '{}'", scene.name());
        }
        let mut ctx = SetupCtx {
            ids: &self.ids,
            gpu: &self.gpu,
            resources: &self.resources,
            builders: &mut self.builders,
        };
        self.systems.teardown_all(&mut ctx);
        self.resources.teardown();
        debug!("Engine: shut down ({} live gpu handles)", self.gpu.live());
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::coords::Vec2;
    use crate::device::HeadlessGpu;
    use crate::error::Error;
    use crate::input::{MouseButton, MouseButtonState};
    use crate::resource::ResourceSource;
    use crate::scene::{Capabilities, Component, Message, Script, ScriptCtx};

    type Log = Arc<Mutex<Vec<(Message, u64)>>>;

    struct Ticker {
        log: Log,
    }

    impl Ticker {
        fn note(&self, m: Message, ctx: &ScriptCtx<'_, '_>) {
            self.log.lock().unwrap().push((m, ctx.env.time.frame_index));
        }
    }

    impl Component for Ticker {
        fn type_name(&self) -> &'static str {
            "test.ticker"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::SCRIPT
        }

        fn as_script(&mut self) -> Option<&mut dyn Script> {
            Some(self)
        }
    }

    impl Script for Ticker {
        fn start(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
            self.note(Message::Start, ctx);
        }

        fn update(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
            assert_eq!(ctx.edges().primary_pressed(), ctx.env.time.frame_index == 1);
            self.note(Message::Update, ctx);
        }

        fn fixed_update(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
            assert_eq!(ctx.dt(), 0.05);
            self.note(Message::FixedUpdate, ctx);
        }

        fn gui_render(&mut self, ctx: &mut ScriptCtx<'_, '_>) {
            self.note(Message::GuiRender, ctx);
        }
    }

    fn engine(gpu: Arc<HeadlessGpu>) -> Engine {
        Engine::new(EngineConfig::default(), gpu).unwrap()
    }

    fn with_ticker(engine: &mut Engine, log: &Log) {
        let mut scene = engine.new_scene("test");
        let root = scene.graph_mut().spawn("root", None).unwrap();
        scene.graph_mut().add_component(root, Box::new(Ticker { log: log.clone() })).unwrap();
        engine.set_scene(scene);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = EngineConfig::default().with_fixed_step(-1.0);
        assert!(matches!(Engine::new(cfg, Arc::new(HeadlessGpu::new())), Err(Error::InvalidContent(_))));
    }

    #[test]
    fn mesh_and_texture_registries_are_preinstalled() {
        let e = engine(Arc::new(HeadlessGpu::new()));
        assert!(e.meshes().is_ok());
        assert!(e.textures().is_ok());
        assert!(matches!(e.resources().registry::<Mesh>("texture"), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn frame_runs_phases_and_clears_edges() {
        let mut e = engine(Arc::new(HeadlessGpu::new()));
        let log = Log::default();
        with_ticker(&mut e, &log);

        e.push_input(InputEvent::PointerMoved(Vec2::new(3.0, 4.0)));
        e.push_input(InputEvent::PointerButton { button: MouseButton::Left, state: MouseButtonState::Pressed });
        let first = e.frame(0.12);
        assert_eq!(first, FrameStats { frame_index: 1, fixed_steps: 2 });

        let second = e.frame(0.04);
        assert_eq!(second.fixed_steps, 1);

        let seen: Vec<_> = log.lock().unwrap().iter().map(|(m, _)| *m).collect();
        use Message::*;
        assert_eq!(
            seen,
            vec![Start, Update, FixedUpdate, FixedUpdate, GuiRender, Update, FixedUpdate, GuiRender]
        );
    }

    #[test]
    fn long_stall_is_capped() {
        let mut e = Engine::new(EngineConfig::default().with_max_frame_dt(10.0), Arc::new(HeadlessGpu::new())).unwrap();
        let log = Log::default();
        with_ticker(&mut e, &log);
        assert_eq!(e.frame(10.0).fixed_steps, 5);
        assert_eq!(e.frame(0.0).fixed_steps, 0);
    }

    #[test]
    fn failed_load_keeps_current_scene() {
        let mut e = engine(Arc::new(HeadlessGpu::new()));
        e.set_scene(e.new_scene("keep"));
        let doc = br#"{ "name": "bad", "objects": [ { "name": "x", "components": [ { "type": "nope" } ] } ] }"#;
        assert!(e.load_scene(doc).is_err());
        assert_eq!(e.scene().unwrap().name(), "keep");
    }

    struct StopAfter {
        frames: u64,
        flag: Option<RunFlag>,
    }

    impl App for StopAfter {
        fn setup(&mut self, engine: &mut Engine) -> Result<()> {
            self.flag = Some(engine.run_flag());
            Ok(())
        }

        fn after_frame(&mut self, _engine: &mut Engine, stats: FrameStats) -> AppControl {
            if stats.frame_index == self.frames {
                if let Some(flag) = &self.flag {
                    flag.stop();
                }
            }
            AppControl::Continue
        }
    }

    #[test]
    fn run_stops_when_flag_is_cleared() {
        let mut e = engine(Arc::new(HeadlessGpu::new()));
        let mut app = StopAfter { frames: 3, flag: None };
        assert_eq!(e.run(&mut app, &mut FrameClock::new()).unwrap(), 3);
    }

    #[test]
    fn shutdown_releases_resources() {
        let gpu = Arc::new(HeadlessGpu::new());
        let mut e = engine(gpu.clone());
        e.meshes()
            .unwrap()
            .register("quad", Mesh::quad("quad", Vec2::new(1.0, 1.0)))
            .unwrap();
        e.textures()
            .unwrap()
            .load(ResourceSource::from_bytes("bad.png", b"nope".to_vec()))
            .unwrap_err();
        assert_eq!(gpu.live(), 1);

        e.shutdown();
        assert_eq!(gpu.live(), 0);
        assert!(e.ids().is_empty());
        e.shutdown();
    }
}
