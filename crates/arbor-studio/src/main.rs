//! Arbor Studio: loads the menu scene on a headless device and plays a
//! scripted pointer session against it, logging what the UI reports.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context, Result};
use arbor_engine::coords::Vec2;
use arbor_engine::core::{App, AppControl, Engine, EngineConfig, FrameStats};
use arbor_engine::device::{HeadlessGpu, TextureFormat};
use arbor_engine::input::{InputEvent, MouseButton, MouseButtonState};
use arbor_engine::logging::{LoggingConfig, init_logging};
use arbor_engine::render::RenderCmd;
use arbor_engine::resource::Texture;
use arbor_engine::time::FrameClock;
use arbor_ui::actions::UiActions;
use arbor_ui::style::Styles;
use arbor_ui::UiSystem;
use log::{debug, info, warn};

const MENU: &[u8] = include_bytes!("../assets/menu.json");
const STYLE: &[u8] = include_bytes!("../assets/style.json");

const LOGO_W: u32 = 64;
const LOGO_H: u32 = 32;

// ── scripted input ───────────────────────────────────────────────────────

fn at(x: f32, y: f32) -> InputEvent {
    InputEvent::PointerMoved(Vec2::new(x, y))
}

fn left(state: MouseButtonState) -> InputEvent {
    InputEvent::PointerButton { button: MouseButton::Left, state }
}

/// One entry per frame.
fn session() -> VecDeque<Vec<InputEvent>> {
    use MouseButtonState::{Pressed, Released};
    VecDeque::from(vec![
        vec![],
        // click "play"
        vec![at(600.0, 300.0)],
        vec![left(Pressed)],
        vec![left(Released)],
        // the disabled entry swallows the click
        vec![at(600.0, 350.0), left(Pressed)],
        vec![left(Released)],
        // drag the logo 100px right and 40px down
        vec![at(60.0, 50.0), left(Pressed)],
        vec![at(110.0, 70.0)],
        vec![at(160.0, 90.0)],
        vec![left(Released)],
        // click "quit"
        vec![at(600.0, 400.0), left(Pressed)],
        vec![left(Released)],
        vec![],
    ])
}

// ── app ──────────────────────────────────────────────────────────────────

struct Studio {
    actions: UiActions,
    script: VecDeque<Vec<InputEvent>>,
}

impl App for Studio {
    fn setup(&mut self, engine: &mut Engine) -> arbor_engine::Result<()> {
        engine.load_scene(MENU)?;
        info!("studio: menu loaded");
        Ok(())
    }

    fn before_frame(&mut self, engine: &mut Engine) -> AppControl {
        let Some(events) = self.script.pop_front() else {
            info!("studio: script finished");
            return AppControl::Exit;
        };
        for event in events {
            engine.push_input(event);
        }
        AppControl::Continue
    }

    fn after_frame(&mut self, engine: &mut Engine, stats: FrameStats) -> AppControl {
        let commands = engine.render_list().commands();
        let quads = commands.iter().filter(|c| matches!(c, RenderCmd::Quad { .. })).count();
        debug!("studio: frame {} drew {quads} quad(s) in {} command(s)", stats.frame_index, commands.len());

        let mut control = AppControl::Continue;
        for action in self.actions.drain() {
            info!("studio: action '{action}'");
            if action == "quit" {
                control = AppControl::Exit;
            }
        }
        control
    }

    fn teardown(&mut self, engine: &mut Engine) {
        let Some(scene) = engine.scene() else {
            return;
        };
        let graph = scene.graph();
        match graph.find("logo").map(|logo| graph.world_frame(logo, engine.viewport().rect())) {
            Some(frame) => info!("studio: logo ended at ({}, {})", frame.origin.x, frame.origin.y),
            None => warn!("studio: logo is gone"),
        }
    }
}

/// Two-tone checkerboard standing in for a decoded image.
fn logo() -> Result<Texture> {
    let mut pixels = Vec::with_capacity((LOGO_W * LOGO_H * 4) as usize);
    for y in 0..LOGO_H {
        for x in 0..LOGO_W {
            let lit = (x / 8 + y / 8) % 2 == 0;
            pixels.extend_from_slice(if lit { &[240, 240, 240, 255] } else { &[30, 110, 200, 255] });
        }
    }
    Texture::from_pixels("logo", LOGO_W, LOGO_H, TextureFormat::Rgba8, pixels).context("building logo texture")
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default().with_filters("arbor_ui=debug"));

    let mut engine = Engine::new(EngineConfig::default(), Arc::new(HeadlessGpu::new())).context("creating engine")?;
    engine.textures()?.register("logo", logo()?).context("registering logo")?;

    let styles = Arc::new(Styles::default());
    styles.load(STYLE).context("loading style")?;

    let actions = UiActions::new();
    engine.register_system(Box::new(UiSystem::new(styles, actions.clone())));

    let mut app = Studio { actions, script: session() };
    let frames = engine.run(&mut app, &mut FrameClock::new()).context("running menu")?;
    engine.shutdown();

    info!("studio: done after {frames} frame(s)");
    Ok(())
}
