mod button;
mod panel;

pub use button::{Button, ButtonData};
pub use panel::{Panel, PanelData};
