//! The top layer: transient drawing that is never part of the document.

use kurbo::Line;
use peniko::Color;

/// A segment drawn on the overlay, in screen coordinates.
#[derive(Debug, Clone, Copy)]
pub struct OverlayLine {
    pub line: Line,
    pub color: Color,
    pub width: f64,
}

/// Drawing surface above the scene, cleared before every render.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    lines: Vec<OverlayLine>,
}

impl Overlay {
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn draw_line(&mut self, line: Line, color: Color, width: f64) {
        self.lines.push(OverlayLine { line, color, width });
    }

    pub fn lines(&self) -> &[OverlayLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
