//! Map scene rendering: world grid, gate-link overlay, system glyphs,
//! selection ring, and labels.
//!
//! Back-to-front order: backdrop tiles, grid, links, glyphs, selection,
//! labels. Backdrop and grid live in chart space and scale with the camera;
//! glyphs, links, the selection ring and labels are screen-capped. Link
//! strokes are trimmed at the glyph edge so glyphs always sit visually on
//! top.

use bevy::prelude::*;
use bevy::ui::Node as UiNode;
use std::path::Path;

use crate::compat::{SpriteBundle, TextBundle, TextStyle};
use crate::plugins::core::InputBindings;
use crate::world::{ChartRevision, StarChart};

use super::components::{
    capped_glyph_zoom, dash_segments, label_alpha, link_base_color, link_dash_pattern,
    link_status_alpha, trim_segment, GlyphVisual, GridLine, SystemLabel, GLYPH_CORE_PX,
    GLYPH_RING_PX, LABEL_FONT_PX, SELECTION_RING_EXTRA_PX,
};
use super::picking::SelectedSystem;
use super::viewport::{chart_to_world, Viewport, CHART_EXTENT};

// =============================================================================
// Constants
// =============================================================================

const GRID_STEP: f32 = 250.0;
const GRID_LINE_WIDTH: f32 = 1.0;
const AXIS_LINE_WIDTH: f32 = 2.0;
const GRID_Z: f32 = -5.0;
const GLYPH_Z: f32 = 1.0;

const LABEL_CULL_MARGIN: f32 = 120.0;

// =============================================================================
// Resources
// =============================================================================

#[derive(Resource)]
pub struct RenderToggles {
    pub show_backdrop: bool,
    pub show_grid: bool,
    pub show_links: bool,
    pub show_glyphs: bool,
    pub show_labels: bool,
    pub show_selection: bool,
}

impl Default for RenderToggles {
    fn default() -> Self {
        Self {
            show_backdrop: true,
            show_grid: true,
            show_links: true,
            show_glyphs: true,
            show_labels: true,
            show_selection: true,
        }
    }
}

/// Last chart revision the glyph spawner has seen.
#[derive(Resource, Default)]
pub struct GlyphSpawnState {
    pub seen_revision: Option<u64>,
}

// =============================================================================
// Systems
// =============================================================================

pub fn handle_render_toggles(
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut toggles: ResMut<RenderToggles>,
) {
    if input.just_pressed(bindings.toggle_backdrop) {
        toggles.show_backdrop = !toggles.show_backdrop;
        info!("Backdrop: {}", toggles.show_backdrop);
    }
    if input.just_pressed(bindings.toggle_grid) {
        toggles.show_grid = !toggles.show_grid;
        info!("Grid: {}", toggles.show_grid);
    }
    if input.just_pressed(bindings.toggle_links) {
        toggles.show_links = !toggles.show_links;
        info!("Links: {}", toggles.show_links);
    }
    if input.just_pressed(bindings.toggle_glyphs) {
        toggles.show_glyphs = !toggles.show_glyphs;
        info!("Glyphs: {}", toggles.show_glyphs);
    }
    if input.just_pressed(bindings.toggle_labels) {
        toggles.show_labels = !toggles.show_labels;
        info!("Labels: {}", toggles.show_labels);
    }
}

/// Spawn the static grid lines once. Grid geometry lives in chart space and
/// scales with the camera; the two origin axes get a distinguished color and
/// double weight.
pub fn spawn_grid(mut commands: Commands) {
    let half = CHART_EXTENT * 0.5;
    let line_color = Color::srgba(0.3, 0.38, 0.5, 0.35);
    let axis_color = Color::srgba(0.55, 0.68, 0.85, 0.7);

    let mut x = -half.x;
    while x <= half.x {
        let on_axis = x == 0.0;
        let (width, color) = if on_axis {
            (AXIS_LINE_WIDTH, axis_color)
        } else {
            (GRID_LINE_WIDTH, line_color)
        };
        commands.spawn((
            GridLine,
            SpriteBundle {
                sprite: Sprite {
                    color,
                    custom_size: Some(Vec2::new(width, CHART_EXTENT.y)),
                    ..default()
                },
                transform: Transform::from_xyz(x, 0.0, GRID_Z),
                ..default()
            },
            Name::new("GridLine-V"),
        ));
        x += GRID_STEP;
    }

    let mut y = -half.y;
    while y <= half.y {
        let on_axis = y == 0.0;
        let (width, color) = if on_axis {
            (AXIS_LINE_WIDTH, axis_color)
        } else {
            (GRID_LINE_WIDTH, line_color)
        };
        commands.spawn((
            GridLine,
            SpriteBundle {
                sprite: Sprite {
                    color,
                    custom_size: Some(Vec2::new(CHART_EXTENT.x, width)),
                    ..default()
                },
                transform: Transform::from_xyz(0.0, -y, GRID_Z),
                ..default()
            },
            Name::new("GridLine-H"),
        ));
        y += GRID_STEP;
    }

    info!("Grid spawned");
}

pub fn toggle_grid_visibility(
    toggles: Res<RenderToggles>,
    mut lines: Query<&mut Visibility, With<GridLine>>,
) {
    for mut visibility in lines.iter_mut() {
        *visibility = if toggles.show_grid {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
    }
}

/// Draw the gate-link overlay. Base color follows the higher-precedence
/// endpoint class; status picks stroke alpha and dash pattern. Dash lengths
/// are screen-constant.
pub fn draw_links(
    mut gizmos: Gizmos,
    chart: Res<StarChart>,
    toggles: Res<RenderToggles>,
    viewport: Res<Viewport>,
) {
    if !toggles.show_links {
        return;
    }

    let zoom = viewport.zoom();
    let trim = (GLYPH_RING_PX * capped_glyph_zoom(zoom) + 2.0) / zoom;

    for link in &chart.links {
        let from = match chart.find_system(&link.from_system) {
            Some(system) => chart_to_world(system.anchor_chart()),
            None => continue,
        };
        let to = match chart.find_system(&link.to_system) {
            Some(system) => chart_to_world(system.anchor_chart()),
            None => continue,
        };

        let (start, end) = match trim_segment(from, to, trim) {
            Some(trimmed) => trimmed,
            None => continue,
        };

        let base = link_base_color(link.from_class, link.to_class);
        let color = base.with_alpha(link_status_alpha(link.status));

        match link_dash_pattern(link.status) {
            None => gizmos.line_2d(start, end, color),
            Some((dash_px, gap_px)) => {
                for (a, b) in dash_segments(start, end, dash_px / zoom, gap_px / zoom) {
                    gizmos.line_2d(a, b, color);
                }
            }
        }
    }
}

/// Respawn glyph core sprites whenever the chart snapshot is swapped.
pub fn spawn_glyph_visuals(
    mut commands: Commands,
    chart: Res<StarChart>,
    revision: Res<ChartRevision>,
    mut state: ResMut<GlyphSpawnState>,
    existing: Query<Entity, With<GlyphVisual>>,
) {
    if state.seen_revision == Some(revision.counter) {
        return;
    }
    state.seen_revision = Some(revision.counter);

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    for (index, system) in chart.systems.iter().enumerate() {
        let world = chart_to_world(system.anchor_chart());
        commands.spawn((
            GlyphVisual { index },
            SpriteBundle {
                sprite: Sprite {
                    color: system.core_color,
                    custom_size: Some(Vec2::splat(GLYPH_CORE_PX)),
                    ..default()
                },
                transform: Transform::from_xyz(world.x, world.y, GLYPH_Z),
                ..default()
            },
            Name::new(format!("Glyph-{}", system.id)),
        ));
    }

    info!("Glyph visuals spawned for {} systems", chart.systems.len());
}

/// Keep glyph cores at their anchors with a screen-capped size.
pub fn sync_glyph_visuals(
    chart: Res<StarChart>,
    toggles: Res<RenderToggles>,
    viewport: Res<Viewport>,
    mut visuals: Query<(&GlyphVisual, &mut Sprite, &mut Transform, &mut Visibility)>,
) {
    let zoom = viewport.zoom();
    let size = GLYPH_CORE_PX * capped_glyph_zoom(zoom) / zoom;

    for (visual, mut sprite, mut transform, mut visibility) in visuals.iter_mut() {
        let system = match chart.systems.get(visual.index) {
            Some(system) => system,
            None => continue,
        };

        *visibility = if toggles.show_glyphs {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };

        let world = chart_to_world(system.anchor_chart());
        transform.translation.x = world.x;
        transform.translation.y = world.y;
        sprite.custom_size = Some(Vec2::splat(size));
        sprite.color = system.core_color;
    }
}

/// Ring strokes around each glyph, in the system's ring color.
pub fn draw_glyph_rings(
    mut gizmos: Gizmos,
    chart: Res<StarChart>,
    toggles: Res<RenderToggles>,
    viewport: Res<Viewport>,
) {
    if !toggles.show_glyphs {
        return;
    }

    let zoom = viewport.zoom();
    let radius = GLYPH_RING_PX * capped_glyph_zoom(zoom) / zoom;

    for system in &chart.systems {
        gizmos.circle_2d(chart_to_world(system.anchor_chart()), radius, system.ring_color);
    }
}

pub fn draw_selection_ring(
    mut gizmos: Gizmos,
    chart: Res<StarChart>,
    toggles: Res<RenderToggles>,
    viewport: Res<Viewport>,
    selected: Res<SelectedSystem>,
) {
    if !toggles.show_selection {
        return;
    }
    let id = match &selected.id {
        Some(id) => id,
        None => return,
    };
    let system = match chart.find_system(id) {
        Some(system) => system,
        None => return,
    };

    let zoom = viewport.zoom();
    let radius = (GLYPH_RING_PX * capped_glyph_zoom(zoom) + SELECTION_RING_EXTRA_PX) / zoom;
    let color = Color::srgba(0.95, 0.97, 1.0, 0.85);
    gizmos.circle_2d(chart_to_world(system.anchor_chart()), radius, color);
}

/// Labels are rebuilt every frame as absolutely positioned UI nodes. Alpha is
/// a pure function of zoom; off-screen labels are culled.
pub fn update_system_labels(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    chart: Res<StarChart>,
    toggles: Res<RenderToggles>,
    viewport: Res<Viewport>,
    labels: Query<Entity, With<SystemLabel>>,
) {
    for entity in labels.iter() {
        commands.entity(entity).despawn();
    }

    if !toggles.show_labels {
        return;
    }

    let zoom = viewport.zoom();
    let alpha = label_alpha(zoom);
    if alpha <= 0.0 {
        return;
    }

    let font_path = "fonts/SpaceMono-Regular.ttf";
    let font_on_disk = Path::new("assets").join(font_path);
    if !font_on_disk.exists() {
        return;
    }
    let font = asset_server.load(font_path);

    let capped = capped_glyph_zoom(zoom);
    let font_size = LABEL_FONT_PX * capped;
    let lift = GLYPH_RING_PX * capped + 8.0;
    let bounds = viewport.viewport_size() + Vec2::splat(LABEL_CULL_MARGIN);

    for system in &chart.systems {
        let screen = viewport.screen_from_chart(system.anchor_chart());
        if screen.x < -LABEL_CULL_MARGIN
            || screen.y < -LABEL_CULL_MARGIN
            || screen.x > bounds.x
            || screen.y > bounds.y
        {
            continue;
        }

        let position = Vec2::new(screen.x + 6.0, screen.y - lift - font_size);
        commands.spawn((
            SystemLabel,
            TextBundle::from_section(
                system.display_name().to_string(),
                TextStyle {
                    font: font.clone(),
                    font_size,
                    color: Color::srgba(0.82, 0.9, 0.96, alpha),
                },
            )
            .with_node(UiNode {
                position_type: PositionType::Absolute,
                left: Val::Px(position.x),
                top: Val::Px(position.y),
                padding: UiRect::all(Val::Px(2.0)),
                ..default()
            })
            .with_background_color(Color::srgba(0.05, 0.08, 0.12, 0.5 * alpha)),
        ));
    }
}

// =============================================================================
// Tests
// =============================================================================
