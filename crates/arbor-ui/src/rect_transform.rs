use arbor_engine::coords::{Rect, Vec2};
use arbor_engine::scene::{Capabilities, Component, Transform};
use serde::{Deserialize, Serialize};

// ── presets ───────────────────────────────────────────────────────────────

/// Where a rect is attached inside its parent.
///
/// Point presets pin one spot of the parent. Stretch presets span the
/// parent on one or both axes.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPreset {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
    StretchHorizontal,
    StretchVertical,
    StretchAll,
}

impl AnchorPreset {
    /// Normalized `(anchor_min, anchor_max)` in parent space (+Y down).
    pub fn anchors(self) -> (Vec2, Vec2) {
        let point = |x: f32, y: f32| (Vec2::new(x, y), Vec2::new(x, y));
        match self {
            AnchorPreset::TopLeft => point(0.0, 0.0),
            AnchorPreset::TopCenter => point(0.5, 0.0),
            AnchorPreset::TopRight => point(1.0, 0.0),
            AnchorPreset::MiddleLeft => point(0.0, 0.5),
            AnchorPreset::MiddleCenter => point(0.5, 0.5),
            AnchorPreset::MiddleRight => point(1.0, 0.5),
            AnchorPreset::BottomLeft => point(0.0, 1.0),
            AnchorPreset::BottomCenter => point(0.5, 1.0),
            AnchorPreset::BottomRight => point(1.0, 1.0),
            AnchorPreset::StretchHorizontal => (Vec2::new(0.0, 0.5), Vec2::new(1.0, 0.5)),
            AnchorPreset::StretchVertical => (Vec2::new(0.5, 0.0), Vec2::new(0.5, 1.0)),
            AnchorPreset::StretchAll => (Vec2::ZERO, Vec2::ONE),
        }
    }
}

/// The point of the rect that `position` places.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotPreset {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl PivotPreset {
    pub fn pivot(self) -> Vec2 {
        match self {
            PivotPreset::TopLeft => Vec2::new(0.0, 0.0),
            PivotPreset::TopCenter => Vec2::new(0.5, 0.0),
            PivotPreset::TopRight => Vec2::new(1.0, 0.0),
            PivotPreset::MiddleLeft => Vec2::new(0.0, 0.5),
            PivotPreset::MiddleCenter => Vec2::new(0.5, 0.5),
            PivotPreset::MiddleRight => Vec2::new(1.0, 0.5),
            PivotPreset::BottomLeft => Vec2::new(0.0, 1.0),
            PivotPreset::BottomCenter => Vec2::new(0.5, 1.0),
            PivotPreset::BottomRight => Vec2::new(1.0, 1.0),
        }
    }
}

// ── RectTransform ─────────────────────────────────────────────────────────

/// Anchored layout rect.
///
/// | anchors on an axis | `size` on that axis          | `position`                     |
/// |--------------------|------------------------------|--------------------------------|
/// | equal (point)      | extent of the rect           | offset of the pivot from anchor |
/// | apart (stretch)    | added to the anchored span   | offset of the pivot             |
#[derive(Debug, Clone, PartialEq)]
pub struct RectTransform {
    position: Vec2,
    size: Vec2,
    anchor_min: Vec2,
    anchor_max: Vec2,
    pivot: Vec2,
}

impl Default for RectTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl RectTransform {
    pub fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            anchor_min: Vec2::ZERO,
            anchor_max: Vec2::ZERO,
            pivot: Vec2::ZERO,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    pub fn with_anchor(mut self, preset: AnchorPreset) -> Self {
        self.set_anchor_preset(preset);
        self
    }

    pub fn with_pivot(mut self, preset: PivotPreset) -> Self {
        self.set_pivot_preset(preset);
        self
    }

    pub fn set_anchor_preset(&mut self, preset: AnchorPreset) {
        (self.anchor_min, self.anchor_max) = preset.anchors();
    }

    pub fn set_pivot_preset(&mut self, preset: PivotPreset) {
        self.pivot = preset.pivot();
    }

    pub fn set_presets(&mut self, anchor: AnchorPreset, pivot: PivotPreset) {
        self.set_anchor_preset(anchor);
        self.set_pivot_preset(pivot);
    }

    #[inline]
    pub fn anchors(&self) -> (Vec2, Vec2) {
        (self.anchor_min, self.anchor_max)
    }

    #[inline]
    pub fn pivot(&self) -> Vec2 {
        self.pivot
    }
}

impl Transform for RectTransform {
    fn frame_in(&self, parent: Rect) -> Rect {
        let lo = parent.lerp(self.anchor_min);
        let hi = parent.lerp(self.anchor_max);
        let span = hi - lo;

        let size = Vec2::new((span.x + self.size.x).max(0.0), (span.y + self.size.y).max(0.0));
        let pivot_at = lo + span.scale(self.pivot) + self.position;
        Rect::from_origin_size(pivot_at - size.scale(self.pivot), size)
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }
}

impl Component for RectTransform {
    fn type_name(&self) -> &'static str {
        "ui.rect_transform"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TRANSFORM
    }

    fn as_transform(&self) -> Option<&dyn Transform> {
        Some(self)
    }

    fn as_transform_mut(&mut self) -> Option<&mut dyn Transform> {
        Some(self)
    }
}

/// Serialized form used by the `ui.rect_transform` builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RectTransformData {
    pub position: Vec2,
    pub size: Vec2,
    pub anchor: AnchorPreset,
    pub pivot: PivotPreset,
}

impl From<RectTransformData> for RectTransform {
    fn from(data: RectTransformData) -> Self {
        RectTransform::new()
            .with_position(data.position)
            .with_size(data.size)
            .with_anchor(data.anchor)
            .with_pivot(data.pivot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT: Rect = Rect::new(100.0, 50.0, 400.0, 200.0);

    #[test]
    fn top_left_is_offset_from_parent_origin() {
        let t = RectTransform::new().with_position(Vec2::new(10.0, 20.0)).with_size(Vec2::new(30.0, 40.0));
        assert_eq!(t.frame_in(PARENT), Rect::new(110.0, 70.0, 30.0, 40.0));
    }

    #[test]
    fn centered_anchor_and_pivot() {
        let t = RectTransform::new()
            .with_anchor(AnchorPreset::MiddleCenter)
            .with_pivot(PivotPreset::MiddleCenter)
            .with_size(Vec2::new(40.0, 20.0));
        assert_eq!(t.frame_in(PARENT), Rect::new(280.0, 140.0, 40.0, 20.0));
    }

    #[test]
    fn bottom_right_with_matching_pivot_hugs_the_corner() {
        let t = RectTransform::new()
            .with_anchor(AnchorPreset::BottomRight)
            .with_pivot(PivotPreset::BottomRight)
            .with_size(Vec2::new(10.0, 10.0));
        assert_eq!(t.frame_in(PARENT), Rect::new(490.0, 240.0, 10.0, 10.0));
    }

    #[test]
    fn stretch_all_treats_size_as_delta() {
        let fill = RectTransform::new().with_anchor(AnchorPreset::StretchAll);
        assert_eq!(fill.frame_in(PARENT), PARENT);

        let inset = RectTransform::new()
            .with_anchor(AnchorPreset::StretchAll)
            .with_pivot(PivotPreset::MiddleCenter)
            .with_size(Vec2::new(-20.0, -20.0));
        assert_eq!(inset.frame_in(PARENT), Rect::new(110.0, 60.0, 380.0, 180.0));
    }

    #[test]
    fn stretch_horizontal_keeps_height() {
        let bar = RectTransform::new()
            .with_anchor(AnchorPreset::StretchHorizontal)
            .with_pivot(PivotPreset::MiddleLeft)
            .with_size(Vec2::new(0.0, 16.0));
        assert_eq!(bar.frame_in(PARENT), Rect::new(100.0, 142.0, 400.0, 16.0));
    }

    #[test]
    fn decodes_presets_by_name() {
        let data: RectTransformData =
            serde_json::from_str(r#"{ "size": [8, 4], "anchor": "stretch_vertical", "pivot": "top_center" }"#).unwrap();
        let t = RectTransform::from(data);
        assert_eq!(t.anchors(), (Vec2::new(0.5, 0.0), Vec2::new(0.5, 1.0)));
        assert_eq!(t.pivot(), Vec2::new(0.5, 0.0));
        assert_eq!(t.size(), Vec2::new(8.0, 4.0));
    }
}
