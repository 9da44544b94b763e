//! Backdrop tile field rendering.
//!
//! Adjacent tiles alternate horizontal/vertical mirroring so the texture
//! repeats without visible seams, and the whole field parallax-shifts
//! opposite to the scroll offset, wrapping modulo the tile size.

use bevy::prelude::*;
use std::path::Path;

use crate::compat::{SpatialBundle, SpriteBundle};

use super::scene::RenderToggles;
use super::viewport::{chart_to_world, Viewport};

// =============================================================================
// Constants
// =============================================================================

pub const TILE_SIZE: f32 = 512.0;
/// Fraction of the scroll offset the field moves by, in the opposite
/// direction.
pub const PARALLAX_RATE: f32 = 0.15;

/// Field half-extent in tiles, sized to cover the viewport at minimum zoom
/// with one tile of margin for the parallax shift.
const FIELD_HALF_X: i32 = 11;
const FIELD_HALF_Y: i32 = 7;

const BACKDROP_Z: f32 = -10.0;

// =============================================================================
// Components
// =============================================================================

#[derive(Component)]
pub struct BackdropRoot;

#[derive(Component)]
pub struct BackdropTile {
    pub col: i32,
    pub row: i32,
}

// =============================================================================
// Pure helpers
// =============================================================================

/// Wrap a value into `[0, tile)`.
pub fn wrap_offset(value: f32, tile: f32) -> f32 {
    value - (value / tile).floor() * tile
}

/// Checkerboard mirror parity for an absolute tile index.
pub fn mirror_flip(index: i64) -> bool {
    index.rem_euclid(2) == 1
}

// =============================================================================
// Systems
// =============================================================================

pub fn spawn_backdrop(mut commands: Commands, asset_server: Res<AssetServer>) {
    let texture_path = "textures/backdrop_tile.png";
    let texture = if Path::new("assets").join(texture_path).exists() {
        Some(asset_server.load(texture_path))
    } else {
        None
    };

    let tint = Color::srgba(0.45, 0.48, 0.6, 0.35);
    let mut tile_count = 0;

    commands
        .spawn((
            BackdropRoot,
            SpatialBundle::from_transform(Transform::from_xyz(0.0, 0.0, BACKDROP_Z)),
            Name::new("BackdropRoot"),
        ))
        .with_children(|parent| {
            for col in -FIELD_HALF_X..=FIELD_HALF_X {
                for row in -FIELD_HALF_Y..=FIELD_HALF_Y {
                    let mut sprite = Sprite {
                        color: tint,
                        custom_size: Some(Vec2::splat(TILE_SIZE)),
                        ..default()
                    };
                    if let Some(texture) = &texture {
                        sprite.image = texture.clone();
                    }

                    parent.spawn((
                        BackdropTile { col, row },
                        SpriteBundle {
                            sprite,
                            transform: Transform::from_xyz(
                                col as f32 * TILE_SIZE,
                                row as f32 * TILE_SIZE,
                                0.0,
                            ),
                            ..default()
                        },
                        Name::new("BackdropTile"),
                    ));
                    tile_count += 1;
                }
            }
        });

    info!("Backdrop spawned with {} tiles", tile_count);
}

/// Position the tile field each frame: follow the camera snapped to the tile
/// lattice, add the wrapped parallax offset, and keep each tile's mirror
/// parity anchored to its absolute lattice index.
pub fn update_backdrop(
    viewport: Res<Viewport>,
    toggles: Res<RenderToggles>,
    mut roots: Query<(&mut Transform, &mut Visibility), With<BackdropRoot>>,
    mut tiles: Query<(&BackdropTile, &mut Sprite)>,
) {
    let (mut root_transform, mut root_visibility) = match roots.single_mut() {
        Ok(root) => root,
        Err(_) => return,
    };

    *root_visibility = if toggles.show_backdrop {
        Visibility::Visible
    } else {
        Visibility::Hidden
    };
    if !toggles.show_backdrop {
        return;
    }

    let center = chart_to_world(viewport.view_center_chart());
    let snap_x = (center.x / TILE_SIZE).floor();
    let snap_y = (center.y / TILE_SIZE).floor();

    let scroll = viewport.scroll();
    let parallax_chart = Vec2::new(
        wrap_offset(-scroll.x * PARALLAX_RATE, TILE_SIZE),
        wrap_offset(-scroll.y * PARALLAX_RATE, TILE_SIZE),
    );
    let parallax = chart_to_world(parallax_chart);

    root_transform.translation.x = snap_x * TILE_SIZE + parallax.x;
    root_transform.translation.y = snap_y * TILE_SIZE + parallax.y;

    for (tile, mut sprite) in tiles.iter_mut() {
        let abs_col = snap_x as i64 + tile.col as i64;
        let abs_row = snap_y as i64 + tile.row as i64;
        sprite.flip_x = mirror_flip(abs_col);
        sprite.flip_y = mirror_flip(abs_row);
    }
}

// =============================================================================
// Tests
// =============================================================================
