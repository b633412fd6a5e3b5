use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{KeyboardLayout, PianoKey};

/// Share of the screen height occupied by the keyboard band.
pub const DEFAULT_BAND_FRACTION: f32 = 0.3;

/// Screen edge the keyboard band is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardPlacement {
    Top,
    #[default]
    Bottom,
}

/// Display-side axis flips. These are ergonomics settings, applied the
/// same way to hit-testing and to anything drawn over the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayTransform {
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl DisplayTransform {
    /// Map a detector-normalized point into display-normalized space.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let x = if self.flip_horizontal { 1.0 - x } else { x };
        let y = if self.flip_vertical { 1.0 - y } else { y };
        (x, y)
    }
}

/// Screen size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Maps screen-space fingertips onto keys.
#[derive(Debug, Clone)]
pub struct HitTester {
    layout: Arc<KeyboardLayout>,
    band_fraction: f32,
}

impl HitTester {
    pub fn new(layout: Arc<KeyboardLayout>) -> Self {
        Self {
            layout,
            band_fraction: DEFAULT_BAND_FRACTION,
        }
    }

    pub fn with_band_fraction(mut self, fraction: f32) -> Self {
        self.band_fraction = fraction.clamp(0.05, 1.0);
        self
    }

    pub fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    /// Vertical pixel span `(start, end)` of the keyboard band.
    pub fn band(&self, viewport: Viewport, placement: KeyboardPlacement) -> (f32, f32) {
        let band_height = viewport.height * self.band_fraction;
        let start = match placement {
            KeyboardPlacement::Top => 0.0,
            KeyboardPlacement::Bottom => viewport.height - band_height,
        };
        (start, start + band_height)
    }

    /// Key under a detector-normalized fingertip, if any.
    pub fn hit_test(
        &self,
        x: f32,
        y: f32,
        viewport: Viewport,
        transform: DisplayTransform,
        placement: KeyboardPlacement,
    ) -> Option<&PianoKey> {
        let (x, y) = transform.apply(x, y);
        let screen_x = x * viewport.width;
        let screen_y = y * viewport.height;

        let (band_start, band_end) = self.band(viewport, placement);
        if screen_y < band_start || screen_y > band_end {
            return None;
        }

        let scale_x = viewport.width / self.layout.width();
        let scale_y = (band_end - band_start) / self.layout.height();
        let local_x = screen_x / scale_x;
        let mut local_y = (screen_y - band_start) / scale_y;
        if placement == KeyboardPlacement::Bottom {
            // the bottom band is drawn mirrored so keys point at the player
            local_y = self.layout.height() - local_y;
        }

        self.layout.key_at(local_x, local_y)
    }
}
