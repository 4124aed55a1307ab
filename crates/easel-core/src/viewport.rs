//! Pan and zoom of the canvas.
//!
//! Objects live in scene coordinates; pointer input arrives in screen
//! coordinates and the overlay is drawn in them.

use kurbo::{Affine, Point, Vec2};

/// Zoom range accepted by [`Viewport::set_zoom`].
pub const ZOOM_RANGE: (f64, f64) = (0.05, 20.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Screen offset of the scene origin.
    pub pan: Vec2,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene-to-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    pub fn screen_to_scene(&self, screen: Point) -> Point {
        ((screen - self.pan).to_vec2() / self.zoom).to_point()
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Zoom is kept inside [`ZOOM_RANGE`].
    pub fn set_zoom(&mut self, zoom: f64) {
        let (min, max) = ZOOM_RANGE;
        self.zoom = zoom.clamp(min, max);
    }

    /// Scene units covered by `pixels` on screen.
    pub fn screen_length(&self, pixels: f64) -> f64 {
        pixels / self.zoom
    }
}
