//! View transform between screen space and graph space

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Pan and zoom of the canvas
///
/// `screen = graph * scale + pan`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTransform {
    pub pan_x: f64,
    pub pan_y: f64,
    pub scale: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn pan(&self) -> Point {
        Point::new(self.pan_x, self.pan_y)
    }

    /// Map a graph-space point to the screen
    pub fn to_screen(&self, graph: Point) -> Point {
        graph * self.scale + self.pan()
    }

    /// Map a screen point into graph space
    pub fn to_graph(&self, screen: Point) -> Point {
        (screen - self.pan()) * (1.0 / self.scale)
    }

    /// Translate by a screen-space delta
    pub fn pan_by(&mut self, delta: Point) {
        self.pan_x += delta.x;
        self.pan_y += delta.y;
    }

    /// Multiply the scale by `factor`, keeping `cursor` fixed on screen
    ///
    /// The new scale is clamped to `[min, max]`. Returns whether the
    /// transform changed; a non-positive factor or an empty range changes
    /// nothing.
    pub fn zoom_about(&mut self, cursor: Point, factor: f64, min: f64, max: f64) -> bool {
        if !(factor.is_finite() && factor > 0.0 && min > 0.0 && min <= max) {
            return false;
        }
        let old = self.scale;
        let new = (old * factor).clamp(min, max);
        if new == old {
            return false;
        }

        let pan = cursor - (cursor - self.pan()) * (new / old);
        self.pan_x = pan.x;
        self.pan_y = pan.y;
        self.scale = new;
        true
    }
}
