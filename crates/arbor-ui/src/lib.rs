//! Arbor UI: widgets, masks and the interaction controller on top of the
//! `arbor-engine` scene graph.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use arbor_ui::prelude::*;
//!
//! let actions = UiActions::new();
//! engine.register_system(Box::new(UiSystem::new(Arc::new(Styles::default()), actions.clone())));
//! engine.setup()?;
//! engine.load_scene(include_bytes!("menu.json"))?;
//!
//! // After each frame:
//! for action in actions.drain() {
//!     println!("clicked {action}");
//! }
//! ```
//!
//! # Scene documents
//!
//! | tag                 | data                                         |
//! |---------------------|----------------------------------------------|
//! | `ui.controller`     | none                                         |
//! | `ui.rect_transform` | `{ position, size, anchor, pivot }`          |
//! | `ui.mask`           | none                                         |
//! | `ui.panel`          | `{ color?, texture?, draggable }`            |
//! | `ui.button`         | `{ action, disabled }`                       |

pub mod actions;
pub mod builders;
pub mod controller;
pub mod mask;
pub mod prefabs;
pub mod rect_transform;
pub mod style;
pub mod widgets;

pub use builders::{UiEnv, UiSystem, register_builders};

/// Everything needed to assemble UI by hand or from documents.
pub mod prelude {
    pub use crate::actions::UiActions;
    pub use crate::builders::{UiEnv, UiSystem, register_builders};
    pub use crate::controller::Controller;
    pub use crate::mask::MaskComponent;
    pub use crate::prefabs;
    pub use crate::rect_transform::{AnchorPreset, PivotPreset, RectTransform};
    pub use crate::style::{StyleSet, Styles};
    pub use crate::widgets::{Button, Panel};

    pub use arbor_engine::coords::{Rect, Vec2};
    pub use arbor_engine::paint::Color;
    pub use std::sync::Arc;
}
