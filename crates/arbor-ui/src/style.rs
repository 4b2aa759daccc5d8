use std::io::Read;
use std::sync::{PoisonError, RwLock};

use arbor_engine::Result;
use arbor_engine::paint::Color;
use log::debug;
use serde::{Deserialize, Serialize};

/// Colors and sizes shared by every widget.
///
/// Documents carry straight-alpha `[r, g, b, a]` arrays. Fields a document
/// leaves out keep their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSet {
    pub background_color: Color,

    pub text_color: Color,
    pub text_color_primary: Color,
    pub text_color_active: Color,
    pub text_color_disabled: Color,

    pub widget_color: Color,
    pub widget_color_primary: Color,
    pub widget_color_active: Color,
    pub widget_color_disabled: Color,

    pub text_size: u32,
}

impl Default for StyleSet {
    fn default() -> Self {
        Self {
            background_color: Color::from_straight(0.1, 0.1, 0.1, 0.9),
            text_color: Color::from_straight(1.0, 1.0, 1.0, 0.9),
            text_color_primary: Color::from_straight(0.0, 0.27, 0.68, 0.9),
            text_color_active: Color::from_straight(1.0, 1.0, 1.0, 0.9),
            text_color_disabled: Color::from_straight(0.5, 0.5, 0.5, 0.5),
            widget_color: Color::from_straight(0.15, 0.15, 0.15, 0.9),
            widget_color_primary: Color::from_straight(0.0, 0.27, 0.68, 0.9),
            widget_color_active: Color::from_straight(0.17, 0.17, 0.17, 1.0),
            widget_color_disabled: Color::from_straight(0.1, 0.1, 0.1, 0.5),
            text_size: 11,
        }
    }
}

/// Process-wide style table.
///
/// Widgets read it at draw time, so a reload is picked up on the next frame.
#[derive(Debug, Default)]
pub struct Styles {
    set: RwLock<StyleSet>,
}

impl Styles {
    pub fn new(set: StyleSet) -> Self {
        Self { set: RwLock::new(set) }
    }

    /// Snapshot of the current set.
    pub fn current(&self) -> StyleSet {
        self.set.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, set: StyleSet) {
        *self.set.write().unwrap_or_else(PoisonError::into_inner) = set;
    }

    /// Decodes a JSON style document and swaps it in.
    ///
    /// The table is untouched when reading or decoding fails.
    pub fn load(&self, mut reader: impl Read) -> Result<()> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let set: StyleSet = serde_json::from_slice(&bytes)?;
        debug!("Styles: loaded {} byte document", bytes.len());
        self.set(set);
        Ok(())
    }
}
