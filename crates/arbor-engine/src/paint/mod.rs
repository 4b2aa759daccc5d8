//! Color model shared between widgets, styles and the render command stream.

pub mod color;

pub use color::Color;
