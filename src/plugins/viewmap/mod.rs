//! Map view plugin: viewport control, scene rendering, backdrop, picking.

pub mod backdrop;
pub mod components;
pub mod picking;
pub mod scene;
pub mod transform;
pub mod viewport;

use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::*;

use crate::plugins::core::{AppState, DebugWindow};
use crate::plugins::input;

// Re-export the types external callers reach for.
pub use picking::{hit_test, SelectedSystem, HIT_RADIUS};
pub use scene::RenderToggles;
pub use viewport::{Viewport, ZOOM_MAX, ZOOM_MIN, ZOOM_STEP};

// =============================================================================
// Plugin
// =============================================================================

pub struct MapViewPlugin;

impl Plugin for MapViewPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Viewport>()
            .init_resource::<viewport::PanThrottle>()
            .init_resource::<SelectedSystem>()
            .init_resource::<RenderToggles>()
            .init_resource::<scene::GlyphSpawnState>()
            .add_systems(Startup, viewport::setup_camera)
            .add_systems(OnEnter(AppState::InGame), (scene::spawn_grid, backdrop::spawn_backdrop))
            .add_systems(
                Update,
                (
                    viewport::sync_viewport_size,
                    input::decode_map_input,
                    viewport::apply_view_intents,
                    picking::apply_selection_intents,
                    viewport::sync_camera_from_viewport,
                )
                    .chain()
                    .run_if(in_state(AppState::InGame)),
            )
            .add_systems(
                Update,
                (
                    backdrop::update_backdrop,
                    scene::toggle_grid_visibility,
                    scene::spawn_glyph_visuals,
                    scene::sync_glyph_visuals,
                    scene::draw_links,
                    scene::draw_glyph_rings,
                    scene::draw_selection_ring,
                    scene::update_system_labels,
                )
                    .chain()
                    .after(viewport::sync_camera_from_viewport)
                    .run_if(in_state(AppState::InGame)),
            )
            .add_systems(
                Update,
                scene::handle_render_toggles
                    .run_if(in_state(AppState::InGame))
                    .run_if(debug_window_open),
            );
    }
}

// =============================================================================
// Run Conditions
// =============================================================================

pub fn debug_window_open(debug_window: Res<DebugWindow>) -> bool {
    debug_window.open
}
