use std::sync::Arc;

use arbor_engine::coords::{Rect, Vec2};
use arbor_engine::paint::Color;
use arbor_engine::render::RenderList;
use arbor_engine::resource::{ResourceLink, Texture};
use arbor_engine::scene::{Capabilities, Component, Widget, WidgetEvent, WidgetReply};
use serde::{Deserialize, Serialize};

/// A filled or textured rectangle covering its node's frame.
///
/// ```rust,ignore
/// let backdrop = Panel::new(styles.current().background_color);
/// let handle = Panel::textured(textures.link("logo")?).draggable(true);
/// ```
///
/// A textured panel whose texture has been evicted draws nothing.
#[derive(Debug)]
pub struct Panel {
    color: Color,
    texture: Option<ResourceLink<Texture>>,
    draggable: bool,
    dragging: bool,
    hovered: bool,
}

impl Panel {
    pub fn new(color: Color) -> Self {
        Self { color, texture: None, draggable: false, dragging: false, hovered: false }
    }

    /// Shows `texture` untinted.
    pub fn textured(texture: ResourceLink<Texture>) -> Self {
        Self { texture: Some(texture), ..Self::new(Color::WHITE) }
    }

    /// Lets the pointer drag the panel around.
    pub fn draggable(mut self, yes: bool) -> Self {
        self.draggable = yes;
        self
    }

    /// Multiplies the texture, or replaces the fill when there is none.
    pub fn tint(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    /// The linked texture, if it is still registered.
    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.texture.as_ref().and_then(ResourceLink::resolve)
    }

    #[inline]
    pub fn is_textured(&self) -> bool {
        self.texture.is_some()
    }

    #[inline]
    pub fn is_hovered(&self) -> bool {
        self.hovered
    }
}

impl Widget for Panel {
    /// Only draggable panels take the pointer; plain ones are decoration.
    fn hit_test(&self, frame: Rect, point: Vec2) -> bool {
        self.draggable && frame.contains(point)
    }

    fn on_event(&mut self, event: WidgetEvent) -> WidgetReply {
        match event {
            WidgetEvent::MouseEnter => self.hovered = true,
            WidgetEvent::MouseLeave => self.hovered = false,
            WidgetEvent::DragStart { .. } if self.draggable => self.dragging = true,
            WidgetEvent::Drag { delta, .. } if self.dragging => return WidgetReply::MoveBy(delta),
            WidgetEvent::DragEnd { .. } => self.dragging = false,
            _ => {}
        }
        WidgetReply::None
    }

    fn dragging(&self) -> bool {
        self.dragging
    }

    fn redraw(&mut self, frame: Rect, list: &mut RenderList) {
        let texture = match &self.texture {
            None => None,
            Some(link) => match link.resolve() {
                Some(texture) => texture.handle(),
                None => return,
            },
        };
        list.quad(frame, self.color, texture);
    }
}

impl Component for Panel {
    fn type_name(&self) -> &'static str {
        "ui.panel"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::WIDGET
    }

    fn as_widget(&mut self) -> Option<&mut dyn Widget> {
        Some(self)
    }
}

/// Serialized form used by the `ui.panel` builder.
///
/// `texture` names an entry of the texture registry. Without `color` a
/// textured panel is untinted and a plain one uses the style background.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelData {
    pub color: Option<Color>,
    pub texture: Option<String>,
    pub draggable: bool,
}
