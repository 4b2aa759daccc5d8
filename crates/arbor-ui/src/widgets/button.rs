use std::sync::Arc;

use arbor_engine::coords::Rect;
use arbor_engine::paint::Color;
use arbor_engine::render::RenderList;
use arbor_engine::scene::{Capabilities, Component, Widget, WidgetEvent, WidgetReply};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::actions::UiActions;
use crate::style::Styles;

/// A clickable rectangle that raises a named action.
///
/// Colors come from the style table on every redraw:
///
/// | state    | color                  |
/// |----------|------------------------|
/// | idle     | `widget_color`         |
/// | hovered  | `widget_color_primary` |
/// | pressed  | `widget_color_active`  |
/// | disabled | `widget_color_disabled`|
pub struct Button {
    action: String,
    styles: Arc<Styles>,
    actions: UiActions,
    hovered: bool,
    pressed: bool,
    disabled: bool,
}

impl Button {
    pub fn new(action: impl Into<String>, styles: Arc<Styles>, actions: UiActions) -> Self {
        Self { action: action.into(), styles, actions, hovered: false, pressed: false, disabled: false }
    }

    pub fn disabled(mut self, yes: bool) -> Self {
        self.disabled = yes;
        self
    }

    #[inline]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    fn fill(&self) -> Color {
        let style = self.styles.current();
        if self.disabled {
            style.widget_color_disabled
        } else if self.pressed {
            style.widget_color_active
        } else if self.hovered {
            style.widget_color_primary
        } else {
            style.widget_color
        }
    }
}

impl Widget for Button {
    fn on_event(&mut self, event: WidgetEvent) -> WidgetReply {
        match event {
            WidgetEvent::MouseEnter => self.hovered = true,
            WidgetEvent::MouseLeave => {
                self.hovered = false;
                self.pressed = false;
            }
            WidgetEvent::DragStart { .. } => self.pressed = !self.disabled,
            WidgetEvent::Deselect | WidgetEvent::DragEnd { .. } => self.pressed = false,
            WidgetEvent::Click { .. } => {
                self.pressed = false;
                if !self.disabled {
                    debug!("Button: '{}' clicked", self.action);
                    self.actions.push(self.action.clone());
                }
            }
            _ => {}
        }
        WidgetReply::None
    }

    fn redraw(&mut self, frame: Rect, list: &mut RenderList) {
        list.quad(frame, self.fill(), None);
    }
}

impl Component for Button {
    fn type_name(&self) -> &'static str {
        "ui.button"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::WIDGET
    }

    fn as_widget(&mut self) -> Option<&mut dyn Widget> {
        Some(self)
    }
}

/// Serialized form used by the `ui.button` builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonData {
    pub action: String,
    #[serde(default)]
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use arbor_engine::coords::Vec2;
    use arbor_engine::render::RenderCmd;

    use super::*;
    use crate::style::StyleSet;

    fn button(actions: &UiActions) -> Button {
        Button::new("play", Arc::new(Styles::default()), actions.clone())
    }

    fn drawn(b: &mut Button) -> Color {
        let mut list = RenderList::new();
        b.redraw(Rect::new(0.0, 0.0, 1.0, 1.0), &mut list);
        match list.commands()[0] {
            RenderCmd::Quad { color, .. } => color,
            ref other => panic!("expected Quad, got {other:?}"),
        }
    }

    #[test]
    fn click_pushes_action() {
        let actions = UiActions::new();
        let mut b = button(&actions);
        b.on_event(WidgetEvent::Click { pointer: Vec2::ZERO });
        assert_eq!(actions.drain(), vec!["play"]);
    }

    #[test]
    fn disabled_button_stays_quiet() {
        let actions = UiActions::new();
        let mut b = button(&actions).disabled(true);
        b.on_event(WidgetEvent::DragStart { pointer: Vec2::ZERO });
        b.on_event(WidgetEvent::Click { pointer: Vec2::ZERO });
        assert!(actions.is_empty());
        assert_eq!(drawn(&mut b), StyleSet::default().widget_color_disabled);
    }

    #[test]
    fn colors_follow_state() {
        let actions = UiActions::new();
        let mut b = button(&actions);
        let style = StyleSet::default();

        assert_eq!(drawn(&mut b), style.widget_color);
        b.on_event(WidgetEvent::MouseEnter);
        assert_eq!(drawn(&mut b), style.widget_color_primary);
        b.on_event(WidgetEvent::DragStart { pointer: Vec2::ZERO });
        assert!(b.is_pressed());
        assert_eq!(drawn(&mut b), style.widget_color_active);
        b.on_event(WidgetEvent::MouseLeave);
        assert_eq!(drawn(&mut b), style.widget_color);
    }
}
