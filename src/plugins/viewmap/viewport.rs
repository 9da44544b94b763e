//! Viewport state: clamped zoom and scroll, cursor-anchored zoom, panning.

use bevy::camera::{OrthographicProjection, Projection};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::compat::Camera2dBundle;
use crate::plugins::input::{MapIntent, MapIntents};

use super::transform;

// =============================================================================
// Constants
// =============================================================================

/// Zoom configuration for the map view.
pub const ZOOM_MIN: f32 = 0.2;
pub const ZOOM_MAX: f32 = 12.0;
pub const ZOOM_STEP: f32 = 0.2;
pub const ZOOM_DEFAULT: f32 = 1.0;

/// Chart extent in anchor pixels at zoom 1.0.
pub const CHART_EXTENT: Vec2 = Vec2::new(4000.0, 3000.0);

/// Minimum seconds between applied pan updates. Intermediate drag updates
/// under this interval are dropped; the settled position never is.
pub const PAN_MIN_INTERVAL: f64 = 0.01;

// =============================================================================
// Resources
// =============================================================================

/// Chart anchors are Y-down; Bevy world space is Y-up.
pub fn chart_to_world(point: Vec2) -> Vec2 {
    Vec2::new(point.x, -point.y)
}

/// Owns the authoritative view state. The sub-pixel `scroll` offset is the
/// single source of truth; the camera and the integer scrollbar position are
/// both read-only projections of it.
#[derive(Resource)]
pub struct Viewport {
    zoom: f32,
    scroll: Vec2,
    content_base: Vec2,
    viewport_size: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        let mut viewport = Self {
            zoom: ZOOM_DEFAULT,
            scroll: Vec2::ZERO,
            content_base: CHART_EXTENT,
            viewport_size: Vec2::new(1280.0, 720.0),
        };
        viewport.center_scroll();
        viewport
    }
}

impl Viewport {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn zoom_label(&self) -> String {
        format!("{:.2}", self.zoom)
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    /// Integer scrollbar position. Read-only projection of the sub-pixel
    /// offset; never written back.
    pub fn scrollbar_pos(&self) -> IVec2 {
        IVec2::new(self.scroll.x.round() as i32, self.scroll.y.round() as i32)
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport_size
    }

    /// Content size at the current zoom.
    pub fn content_size(&self) -> Vec2 {
        self.content_base * self.zoom
    }

    fn chart_min(&self) -> Vec2 {
        -self.content_base * 0.5
    }

    pub fn set_viewport_size(&mut self, size: Vec2) {
        if size != self.viewport_size && size.x > 0.0 && size.y > 0.0 {
            self.viewport_size = size;
            self.clamp_to_content();
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn set_content_base(&mut self, base: Vec2) {
        if base != self.content_base && base.x > 0.0 && base.y > 0.0 {
            self.content_base = base;
            self.clamp_to_content();
        }
    }

    pub fn center_scroll(&mut self) {
        self.scroll = ((self.content_size() - self.viewport_size) * 0.5).max(Vec2::ZERO);
        self.clamp_to_content();
    }

    // -- conversions ----------------------------------------------------------

    pub fn screen_from_chart(&self, point: Vec2) -> Vec2 {
        let origin = transform::world_to_screen(self.chart_min(), Vec2::ZERO, self.zoom);
        transform::world_to_screen(point, Vec2::ZERO, self.zoom) - origin - self.scroll
    }

    pub fn chart_from_screen(&self, point: Vec2) -> Vec2 {
        transform::screen_to_world(point + self.scroll, Vec2::ZERO, self.zoom) + self.chart_min()
    }

    /// Chart point currently at the viewport center.
    pub fn view_center_chart(&self) -> Vec2 {
        self.chart_from_screen(self.viewport_size * 0.5)
    }

    // -- operations -----------------------------------------------------------

    /// Step zoom by one notch in `direction`, keeping the chart point under
    /// `cursor` visually fixed. A step clamped back to the current zoom is a
    /// strict no-op and leaves the scroll offset untouched.
    pub fn zoom_at_cursor(&mut self, cursor: Vec2, direction: i32) {
        let anchor = self.chart_from_screen(cursor);
        let previous = self.zoom;
        let next = (previous + direction as f32 * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
        if (next - previous).abs() <= f32::EPSILON {
            return;
        }

        let before = self.screen_from_chart(anchor);
        self.zoom = next;
        let after = self.screen_from_chart(anchor);
        self.scroll += after - before;
        self.clamp_to_content();
    }

    /// Drag panning: the content follows the cursor from where the drag
    /// started. `start_scroll` is the offset captured at mouse-down.
    pub fn pan_drag(&mut self, start_scroll: Vec2, start_screen: Vec2, current_screen: Vec2) {
        self.scroll = start_scroll - (current_screen - start_screen);
        self.clamp_to_content();
    }

    /// Re-apply the scroll clamp. Idempotent; used after resizes and content
    /// swaps. Axes where content is smaller than the viewport clamp to zero.
    pub fn clamp_to_content(&mut self) {
        let max = (self.content_size() - self.viewport_size).max(Vec2::ZERO);
        self.scroll = self.scroll.clamp(Vec2::ZERO, max);
    }
}

/// Drops pan redraws that arrive faster than the minimum interval. The
/// settled update at drag end always passes.
#[derive(Resource)]
pub struct PanThrottle {
    min_interval: f64,
    last_applied: f64,
}

impl Default for PanThrottle {
    fn default() -> Self {
        Self {
            min_interval: PAN_MIN_INTERVAL,
            last_applied: f64::MIN,
        }
    }
}

impl PanThrottle {
    pub fn allow(&mut self, now: f64, settled: bool) -> bool {
        if settled || now - self.last_applied >= self.min_interval {
            self.last_applied = now;
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Systems
// =============================================================================

pub fn setup_camera(mut commands: Commands) {
    info!("Setting up map camera");

    commands.spawn((
        Camera2dBundle {
            projection: Projection::Orthographic(OrthographicProjection {
                scale: 1.0,
                ..OrthographicProjection::default_2d()
            }),
            camera: Camera {
                order: 0,
                ..default()
            },
            ..default()
        },
        Name::new("MapCamera"),
    ));
}

pub fn sync_viewport_size(
    windows: Query<&Window, With<PrimaryWindow>>,
    mut viewport: ResMut<Viewport>,
) {
    if let Ok(window) = windows.single() {
        viewport.set_viewport_size(Vec2::new(window.width(), window.height()));
    }
}

/// Consume view intents left in the queue by the input decoder. Pan intents
/// go through the throttle; settled ones always apply.
pub fn apply_view_intents(
    time: Res<Time>,
    mut intents: ResMut<MapIntents>,
    mut throttle: ResMut<PanThrottle>,
    mut viewport: ResMut<Viewport>,
) {
    for intent in intents.take() {
        match intent {
            MapIntent::ZoomAt { cursor, direction } => {
                viewport.zoom_at_cursor(cursor, direction);
                info!(
                    "Zoom {} scroll {:?}",
                    viewport.zoom_label(),
                    viewport.scrollbar_pos()
                );
            }
            MapIntent::Pan {
                start_scroll,
                start_screen,
                current_screen,
                settled,
            } => {
                if throttle.allow(time.elapsed_secs_f64(), settled) {
                    viewport.pan_drag(start_scroll, start_screen, current_screen);
                }
            }
            other => intents.push(other),
        }
    }
}

/// Write the camera from the viewport, never the reverse.
pub fn sync_camera_from_viewport(
    viewport: Res<Viewport>,
    mut projections: Query<&mut Projection, With<Camera2d>>,
    mut transforms: Query<&mut Transform, With<Camera2d>>,
) {
    let scale = 1.0 / viewport.zoom();
    for mut projection in projections.iter_mut() {
        if let Projection::Orthographic(orthographic) = &mut *projection {
            if orthographic.scale != scale {
                orthographic.scale = scale;
            }
        }
    }

    let center = chart_to_world(viewport.view_center_chart());
    for mut transform in transforms.iter_mut() {
        transform.translation.x = center.x;
        transform.translation.y = center.y;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        let diff = (a - b).abs();
        assert!(diff < 1e-2, "expected {} close to {}", a, b);
    }

    fn assert_vec_close(a: Vec2, b: Vec2) {
        assert_close(a.x, b.x);
        assert_close(a.y, b.y);
    }

    fn viewport_800x600() -> Viewport {
        let mut viewport = Viewport {
            zoom: 1.0,
            scroll: Vec2::ZERO,
            content_base: CHART_EXTENT,
            viewport_size: Vec2::new(800.0, 600.0),
        };
        viewport.center_scroll();
        viewport
    }

    #[test]
    fn default_zoom_is_one() {
        let viewport = Viewport::default();
        assert_close(viewport.zoom(), ZOOM_DEFAULT);
    }

    #[test]
    fn screen_chart_round_trip() {
        let viewport = viewport_800x600();
        let screen = Vec2::new(213.0, 417.0);
        let back = viewport.screen_from_chart(viewport.chart_from_screen(screen));
        assert_vec_close(back, screen);
    }

    #[test]
    fn chart_center_projects_to_viewport_center_when_centered() {
        let viewport = viewport_800x600();
        let projected = viewport.screen_from_chart(Vec2::ZERO);
        assert_vec_close(projected, viewport.viewport_size() * 0.5);
    }

    #[test]
    fn zoom_in_steps_by_fixed_amount() {
        let mut viewport = viewport_800x600();
        viewport.zoom_at_cursor(Vec2::new(400.0, 300.0), 1);
        assert_close(viewport.zoom(), 1.0 + ZOOM_STEP);
    }

    #[test]
    fn zoom_saturates_at_max_exactly() {
        let mut viewport = viewport_800x600();
        for _ in 0..120 {
            viewport.zoom_at_cursor(Vec2::new(400.0, 300.0), 1);
        }
        assert_eq!(viewport.zoom(), ZOOM_MAX);
    }

    #[test]
    fn zoom_saturates_at_min_exactly() {
        let mut viewport = viewport_800x600();
        for _ in 0..60 {
            viewport.zoom_at_cursor(Vec2::new(400.0, 300.0), -1);
        }
        assert_eq!(viewport.zoom(), ZOOM_MIN);
    }

    #[test]
    fn wheel_at_max_is_a_noop_for_scroll() {
        let mut viewport = viewport_800x600();
        for _ in 0..120 {
            viewport.zoom_at_cursor(Vec2::new(400.0, 300.0), 1);
        }
        let scroll_at_max = viewport.scroll();
        viewport.zoom_at_cursor(Vec2::new(17.0, 583.0), 1);
        assert_eq!(viewport.zoom(), ZOOM_MAX);
        assert_eq!(viewport.scroll(), scroll_at_max);
    }

    #[test]
    fn zoom_keeps_chart_point_under_cursor() {
        let mut viewport = viewport_800x600();
        let cursor = Vec2::new(250.0, 420.0);
        let before = viewport.chart_from_screen(cursor);
        viewport.zoom_at_cursor(cursor, 1);
        let after = viewport.chart_from_screen(cursor);
        assert_vec_close(before, after);
    }

    #[test]
    fn zoom_out_also_keeps_cursor_anchor() {
        let mut viewport = viewport_800x600();
        for _ in 0..5 {
            viewport.zoom_at_cursor(Vec2::new(400.0, 300.0), 1);
        }
        let cursor = Vec2::new(520.0, 180.0);
        let before = viewport.chart_from_screen(cursor);
        viewport.zoom_at_cursor(cursor, -1);
        let after = viewport.chart_from_screen(cursor);
        assert_vec_close(before, after);
    }

    #[test]
    fn clamp_is_idempotent() {
        let mut viewport = viewport_800x600();
        viewport.scroll = Vec2::new(1e6, -500.0);
        viewport.clamp_to_content();
        let once = viewport.scroll();
        viewport.clamp_to_content();
        assert_eq!(viewport.scroll(), once);
    }

    #[test]
    fn clamp_saturates_to_content_bounds() {
        let mut viewport = viewport_800x600();
        viewport.scroll = Vec2::new(1e6, 1e6);
        viewport.clamp_to_content();
        let max = viewport.content_size() - viewport.viewport_size();
        assert_vec_close(viewport.scroll(), max);
    }

    #[test]
    fn content_smaller_than_viewport_clamps_to_zero() {
        let mut viewport = viewport_800x600();
        viewport.set_content_base(Vec2::new(300.0, 200.0));
        assert_eq!(viewport.scroll(), Vec2::ZERO);
        viewport.scroll = Vec2::new(50.0, 50.0);
        viewport.clamp_to_content();
        assert_eq!(viewport.scroll(), Vec2::ZERO);
    }

    #[test]
    fn pan_drag_moves_content_with_cursor() {
        let mut viewport = viewport_800x600();
        let start_scroll = viewport.scroll();
        let start = Vec2::new(400.0, 300.0);
        viewport.pan_drag(start_scroll, start, Vec2::new(430.0, 280.0));
        assert_vec_close(viewport.scroll(), start_scroll - Vec2::new(30.0, -20.0));
    }

    #[test]
    fn pan_drag_is_clamped() {
        let mut viewport = viewport_800x600();
        let start_scroll = viewport.scroll();
        viewport.pan_drag(start_scroll, Vec2::ZERO, Vec2::new(1e6, 1e6));
        assert_eq!(viewport.scroll(), Vec2::ZERO);
    }

    #[test]
    fn scrollbar_pos_rounds_the_subpixel_offset() {
        let mut viewport = viewport_800x600();
        viewport.scroll = Vec2::new(100.6, 99.4);
        assert_eq!(viewport.scrollbar_pos(), IVec2::new(101, 99));
        // The sub-pixel offset is untouched by reading the projection.
        assert_close(viewport.scroll().x, 100.6);
    }

    #[test]
    fn repeated_zoom_cycles_do_not_drift() {
        let mut viewport = viewport_800x600();
        let cursor = Vec2::new(400.0, 300.0);
        let initial = viewport.scroll();
        for _ in 0..50 {
            viewport.zoom_at_cursor(cursor, 1);
            viewport.zoom_at_cursor(cursor, -1);
        }
        assert_close(viewport.zoom(), 1.0);
        assert_vec_close(viewport.scroll(), initial);
    }

    #[test]
    fn resize_reclamps_scroll() {
        let mut viewport = viewport_800x600();
        viewport.scroll = viewport.content_size() - viewport.viewport_size();
        viewport.set_viewport_size(Vec2::new(3900.0, 2900.0));
        let max = (viewport.content_size() - viewport.viewport_size()).max(Vec2::ZERO);
        assert!(viewport.scroll().x <= max.x);
        assert!(viewport.scroll().y <= max.y);
    }

    #[test]
    fn chart_to_world_flips_y() {
        assert_eq!(chart_to_world(Vec2::new(10.0, 20.0)), Vec2::new(10.0, -20.0));
    }

    #[test]
    fn pan_throttle_drops_fast_updates() {
        let mut throttle = PanThrottle::default();
        assert!(throttle.allow(0.0, false));
        assert!(!throttle.allow(0.004, false));
        assert!(throttle.allow(0.02, false));
    }

    #[test]
    fn pan_throttle_never_drops_settled_update() {
        let mut throttle = PanThrottle::default();
        assert!(throttle.allow(0.0, false));
        assert!(throttle.allow(0.001, true));
    }

    #[test]
    fn zoom_label_formats_two_decimals() {
        let viewport = viewport_800x600();
        assert_eq!(viewport.zoom_label(), "1.00");
    }

    #[test]
    fn apply_view_intents_consumes_zoom_and_requeues_others() {
        use bevy::ecs::system::SystemState;

        let mut world = World::default();
        world.insert_resource(Time::<()>::default());
        world.insert_resource(MapIntents::default());
        world.insert_resource(PanThrottle::default());
        world.insert_resource(viewport_800x600());

        {
            let mut intents = world.resource_mut::<MapIntents>();
            intents.push(MapIntent::ZoomAt {
                cursor: Vec2::new(400.0, 300.0),
                direction: 1,
            });
            intents.push(MapIntent::ClearSelection);
        }

        let mut system_state: SystemState<(
            Res<Time>,
            ResMut<MapIntents>,
            ResMut<PanThrottle>,
            ResMut<Viewport>,
        )> = SystemState::new(&mut world);
        let (time, intents, throttle, viewport) = system_state.get_mut(&mut world);
        apply_view_intents(time, intents, throttle, viewport);
        system_state.apply(&mut world);

        assert_close(world.resource::<Viewport>().zoom(), 1.0 + ZOOM_STEP);
        let remaining = world.resource_mut::<MapIntents>().take();
        assert_eq!(remaining, vec![MapIntent::ClearSelection]);
    }

    #[test]
    fn apply_view_intents_settled_pan_bypasses_throttle() {
        use bevy::ecs::system::SystemState;

        let mut world = World::default();
        world.insert_resource(Time::<()>::default());
        world.insert_resource(MapIntents::default());
        world.insert_resource(PanThrottle::default());
        world.insert_resource(viewport_800x600());

        let start_scroll = world.resource::<Viewport>().scroll();
        {
            let mut intents = world.resource_mut::<MapIntents>();
            // Two updates in the same instant: the unsettled one is dropped by
            // the throttle after the first applies, the settled one is not.
            intents.push(MapIntent::Pan {
                start_scroll,
                start_screen: Vec2::ZERO,
                current_screen: Vec2::new(5.0, 0.0),
                settled: false,
            });
            intents.push(MapIntent::Pan {
                start_scroll,
                start_screen: Vec2::ZERO,
                current_screen: Vec2::new(9.0, 0.0),
                settled: false,
            });
            intents.push(MapIntent::Pan {
                start_scroll,
                start_screen: Vec2::ZERO,
                current_screen: Vec2::new(12.0, 0.0),
                settled: true,
            });
        }

        let mut system_state: SystemState<(
            Res<Time>,
            ResMut<MapIntents>,
            ResMut<PanThrottle>,
            ResMut<Viewport>,
        )> = SystemState::new(&mut world);
        let (time, intents, throttle, viewport) = system_state.get_mut(&mut world);
        apply_view_intents(time, intents, throttle, viewport);
        system_state.apply(&mut world);

        let viewport = world.resource::<Viewport>();
        assert_vec_close(viewport.scroll(), start_scroll - Vec2::new(12.0, 0.0));
    }
}
