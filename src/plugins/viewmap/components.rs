//! Shared components and pure styling helpers for the map view.

use bevy::prelude::*;

use crate::world::{FacilityClass, LinkStatus};

// =============================================================================
// Constants
// =============================================================================

/// Glyph/label screen scale stops growing past this zoom factor; position
/// keeps tracking the full zoom range.
pub const GLYPH_ZOOM_CAP: f32 = 3.0;

/// Glyph core diameter and ring radius in screen pixels at zoom 1.0.
pub const GLYPH_CORE_PX: f32 = 8.0;
pub const GLYPH_RING_PX: f32 = 7.0;
pub const SELECTION_RING_EXTRA_PX: f32 = 5.0;

/// Label visibility: hidden below the low threshold, linear fade up to the
/// high threshold, opaque above.
pub const LABEL_FADE_LOW: f32 = 0.8;
pub const LABEL_FADE_HIGH: f32 = 1.6;
pub const LABEL_FONT_PX: f32 = 13.0;

// =============================================================================
// Components
// =============================================================================

/// Core sprite for a chart system; `index` points into the snapshot list.
#[derive(Component)]
pub struct GlyphVisual {
    pub index: usize,
}

#[derive(Component)]
pub struct SystemLabel;

#[derive(Component)]
pub struct GridLine;

// =============================================================================
// Styling helpers
// =============================================================================

/// Glyph scale factor for a zoom level: follows zoom up to the cap, frozen
/// beyond it.
pub fn capped_glyph_zoom(zoom: f32) -> f32 {
    zoom.clamp(0.0, GLYPH_ZOOM_CAP)
}

/// Label alpha as a function of raw zoom: 0 below the low threshold, a
/// linear ramp between the thresholds, 1 above the high threshold.
pub fn label_alpha(zoom: f32) -> f32 {
    ((zoom - LABEL_FADE_LOW) / (LABEL_FADE_HIGH - LABEL_FADE_LOW)).clamp(0.0, 1.0)
}

pub fn class_color(class: FacilityClass) -> Color {
    match class {
        FacilityClass::Capital => Color::srgb(0.95, 0.8, 0.3),
        FacilityClass::Military => Color::srgb(0.85, 0.3, 0.25),
        FacilityClass::Trade => Color::srgb(0.25, 0.75, 0.65),
        FacilityClass::Standard => Color::srgb(0.45, 0.55, 0.75),
    }
}

/// Base link color: the higher-precedence endpoint class wins.
pub fn link_base_color(a: FacilityClass, b: FacilityClass) -> Color {
    if a.precedence() <= b.precedence() {
        class_color(a)
    } else {
        class_color(b)
    }
}

pub fn link_status_alpha(status: LinkStatus) -> f32 {
    match status {
        LinkStatus::Open => 0.9,
        LinkStatus::Restricted => 0.75,
        LinkStatus::Interdicted => 0.6,
        LinkStatus::Closed => 0.4,
    }
}

/// Dash/gap lengths in screen pixels; `None` draws solid.
pub fn link_dash_pattern(status: LinkStatus) -> Option<(f32, f32)> {
    match status {
        LinkStatus::Open => None,
        LinkStatus::Restricted => Some((12.0, 6.0)),
        LinkStatus::Interdicted => Some((6.0, 6.0)),
        LinkStatus::Closed => Some((3.0, 7.0)),
    }
}

/// Shorten a segment at both ends so link strokes stop at the glyph edge.
/// Returns `None` when the endpoints are too close for anything to remain.
pub fn trim_segment(start: Vec2, end: Vec2, trim: f32) -> Option<(Vec2, Vec2)> {
    let length = start.distance(end);
    if length <= trim * 2.0 {
        return None;
    }
    let dir = (end - start) / length;
    Some((start + dir * trim, end - dir * trim))
}

/// Split a segment into dashes of `dash` length separated by `gap`.
pub fn dash_segments(start: Vec2, end: Vec2, dash: f32, gap: f32) -> Vec<(Vec2, Vec2)> {
    let length = start.distance(end);
    if length <= f32::EPSILON || dash <= f32::EPSILON {
        return Vec::new();
    }

    let dir = (end - start) / length;
    let mut segments = Vec::new();
    let mut cursor = 0.0;
    while cursor < length {
        let dash_end = (cursor + dash).min(length);
        segments.push((start + dir * cursor, start + dir * dash_end));
        cursor += dash + gap.max(f32::EPSILON);
    }
    segments
}

// =============================================================================
// Tests
// =============================================================================
