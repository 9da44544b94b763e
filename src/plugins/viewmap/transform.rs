//! Pure world/screen transform about a center point.

use bevy::prelude::*;

/// Zoom values at or below this are treated as 1.0 to keep the inverse
/// transform finite.
pub const ZOOM_EPSILON: f32 = 1e-4;

fn effective_zoom(zoom: f32) -> f32 {
    if zoom <= ZOOM_EPSILON {
        1.0
    } else {
        zoom
    }
}

/// Project a world point to screen space: `C + (p - C) * z`.
pub fn world_to_screen(point: Vec2, center: Vec2, zoom: f32) -> Vec2 {
    center + (point - center) * effective_zoom(zoom)
}

/// Unproject a screen point back to world space: `C + (p - C) / z`.
pub fn screen_to_world(point: Vec2, center: Vec2, zoom: f32) -> Vec2 {
    center + (point - center) / effective_zoom(zoom)
}

// =============================================================================
// Tests
// =============================================================================
