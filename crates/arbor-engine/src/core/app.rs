use super::engine::{Engine, FrameStats};
use crate::error::Result;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Engine::run`].
pub trait App {
    /// Called once after every registered system has been set up.
    fn setup(&mut self, engine: &mut Engine) -> Result<()> {
        let _ = engine;
        Ok(())
    }

    /// Called before each frame; the place to feed input events.
    fn before_frame(&mut self, engine: &mut Engine) -> AppControl {
        let _ = engine;
        AppControl::Continue
    }

    /// Called after each frame with its statistics and render list in place.
    fn after_frame(&mut self, engine: &mut Engine, stats: FrameStats) -> AppControl;

    /// Called once when the loop ends, before systems are torn down.
    fn teardown(&mut self, engine: &mut Engine) {
        let _ = engine;
    }
}
