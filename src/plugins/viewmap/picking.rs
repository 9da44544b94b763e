//! Screen-space hit testing and selection state.

use bevy::prelude::*;

use crate::plugins::core::EventLog;
use crate::plugins::input::{MapIntent, MapIntents};
use crate::world::{StarChart, StarSystem};

use super::viewport::Viewport;

// =============================================================================
// Constants
// =============================================================================

/// Clickable radius in screen pixels. Constant regardless of zoom: zooming in
/// does not enlarge the clickable area around a glyph.
pub const HIT_RADIUS: f32 = 12.0;

// =============================================================================
// Resources
// =============================================================================

#[derive(Resource, Default)]
pub struct SelectedSystem {
    pub id: Option<String>,
}

// =============================================================================
// Hit testing
// =============================================================================

/// Find the system under a screen point.
///
/// Returns the *first* system in list iteration order whose projected anchor
/// lies within `HIT_RADIUS`, not the nearest one. Snapshot lists keep their
/// load order, so picks are deterministic even where glyphs overlap.
pub fn hit_test<'a>(
    systems: &'a [StarSystem],
    viewport: &Viewport,
    screen: Vec2,
) -> Option<&'a StarSystem> {
    let radius_sq = HIT_RADIUS * HIT_RADIUS;
    systems.iter().find(|system| {
        viewport
            .screen_from_chart(system.anchor_chart())
            .distance_squared(screen)
            <= radius_sq
    })
}

// =============================================================================
// Systems
// =============================================================================

/// Consume selection intents left in the queue by the input decoder.
pub fn apply_selection_intents(
    mut intents: ResMut<MapIntents>,
    chart: Res<StarChart>,
    viewport: Res<Viewport>,
    mut selected: ResMut<SelectedSystem>,
    mut log: ResMut<EventLog>,
) {
    for intent in intents.take() {
        match intent {
            MapIntent::Select { screen } => {
                let hit = hit_test(&chart.systems, &viewport, screen);
                match hit {
                    Some(system) => {
                        log.push(format!("Selected {}", system.display_name()));
                        selected.id = Some(system.id.clone());
                    }
                    None => {
                        selected.id = None;
                    }
                }
            }
            MapIntent::ClearSelection => {
                selected.id = None;
            }
            other => intents.push(other),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn system_at(id: &str, anchor: IVec2) -> StarSystem {
        StarSystem {
            id: id.to_string(),
            name: String::new(),
            alt_name: String::new(),
            pos: Vec3::new(anchor.x as f32, anchor.y as f32, 0.0),
            anchor,
            ring_color: Color::srgb(1.0, 0.0, 0.0),
            core_color: Color::WHITE,
            faction: None,
            has_gate: false,
        }
    }

    fn viewport() -> Viewport {
        Viewport::default()
    }

    #[test]
    fn click_on_projected_anchor_hits() {
        let systems = vec![system_at("A", IVec2::new(0, 0)), system_at("B", IVec2::new(500, 500))];
        let viewport = viewport();

        let screen = viewport.screen_from_chart(systems[0].anchor_chart());
        let hit = hit_test(&systems, &viewport, screen);
        assert_eq!(hit.map(|s| s.id.as_str()), Some("A"));
    }

    #[test]
    fn click_far_away_misses() {
        let systems = vec![system_at("A", IVec2::new(0, 0))];
        let viewport = viewport();

        let screen = viewport.screen_from_chart(systems[0].anchor_chart());
        let miss = hit_test(&systems, &viewport, screen + Vec2::new(1000.0, 0.0));
        assert!(miss.is_none());
    }

    #[test]
    fn click_just_inside_radius_hits() {
        let systems = vec![system_at("A", IVec2::new(0, 0))];
        let viewport = viewport();

        let screen = viewport.screen_from_chart(systems[0].anchor_chart());
        let hit = hit_test(&systems, &viewport, screen + Vec2::new(HIT_RADIUS - 0.5, 0.0));
        assert!(hit.is_some());
    }

    #[test]
    fn click_just_outside_radius_misses() {
        let systems = vec![system_at("A", IVec2::new(0, 0))];
        let viewport = viewport();

        let screen = viewport.screen_from_chart(systems[0].anchor_chart());
        let miss = hit_test(&systems, &viewport, screen + Vec2::new(HIT_RADIUS + 0.5, 0.0));
        assert!(miss.is_none());
    }

    #[test]
    fn overlapping_glyphs_first_in_list_order_wins() {
        // Two anchors four pixels apart: both inside the radius; the contract
        // is first-in-iteration-order, not nearest.
        let systems = vec![system_at("A", IVec2::new(0, 0)), system_at("B", IVec2::new(4, 0))];
        let viewport = viewport();

        // Click exactly on B; A is still within radius and listed first.
        let screen = viewport.screen_from_chart(systems[1].anchor_chart());
        let hit = hit_test(&systems, &viewport, screen);
        assert_eq!(hit.map(|s| s.id.as_str()), Some("A"));
    }

    #[test]
    fn hit_radius_does_not_scale_with_zoom() {
        let systems = vec![system_at("A", IVec2::new(0, 0))];
        let mut viewport = viewport();
        for _ in 0..20 {
            viewport.zoom_at_cursor(viewport.viewport_size() * 0.5, 1);
        }

        let screen = viewport.screen_from_chart(systems[0].anchor_chart());
        assert!(hit_test(&systems, &viewport, screen + Vec2::new(HIT_RADIUS - 1.0, 0.0)).is_some());
        assert!(hit_test(&systems, &viewport, screen + Vec2::new(HIT_RADIUS + 1.0, 0.0)).is_none());
    }

    #[test]
    fn hit_test_uses_anchor_not_real_position() {
        // Anchor and real position deliberately diverge; the anchor wins.
        let mut sys = system_at("A", IVec2::new(100, 100));
        sys.pos = Vec3::new(-900.0, -900.0, 50.0);
        let systems = vec![sys];
        let viewport = viewport();

        let screen = viewport.screen_from_chart(Vec2::new(100.0, 100.0));
        assert!(hit_test(&systems, &viewport, screen).is_some());
    }

    #[test]
    fn empty_list_never_hits() {
        let systems: Vec<StarSystem> = Vec::new();
        let viewport = viewport();
        assert!(hit_test(&systems, &viewport, Vec2::new(400.0, 300.0)).is_none());
    }
}
