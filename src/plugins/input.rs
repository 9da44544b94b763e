//! Map input decoding.
//!
//! Raw mouse/keyboard events are decoded by `MapInputState` into explicit
//! `MapIntent` values queued for the viewport and selection systems to apply.
//! The state machine itself is pure: it never touches the viewport or the
//! renderer.

use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::plugins::core::InputBindings;
use crate::plugins::viewmap::viewport::Viewport;

pub struct MapInputPlugin;

impl Plugin for MapInputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MapInputState>()
            .init_resource::<MapIntents>();
    }
}

// =============================================================================
// Intents
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum MapIntent {
    ZoomAt {
        cursor: Vec2,
        direction: i32,
    },
    Pan {
        start_scroll: Vec2,
        start_screen: Vec2,
        current_screen: Vec2,
        settled: bool,
    },
    Select {
        screen: Vec2,
    },
    ClearSelection,
}

/// Queue of decoded intents awaiting application this frame.
#[derive(Resource, Default)]
pub struct MapIntents {
    queue: Vec<MapIntent>,
}

impl MapIntents {
    pub fn push(&mut self, intent: MapIntent) {
        self.queue.push(intent);
    }

    pub fn extend(&mut self, intents: Vec<MapIntent>) {
        self.queue.extend(intents);
    }

    pub fn take(&mut self) -> Vec<MapIntent> {
        std::mem::take(&mut self.queue)
    }

    #[allow(dead_code)] // Used in tests
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Semantic mouse button role, resolved from the bindings by the decoder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MapButton {
    Pan,
    Select,
}

// =============================================================================
// Input state
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct DragState {
    start_screen: Vec2,
    start_scroll: Vec2,
    last_screen: Vec2,
}

#[derive(Resource, Default)]
pub struct MapInputState {
    drag: Option<DragState>,
}

impl MapInputState {
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn on_wheel(&mut self, cursor: Vec2, direction: i32) -> Vec<MapIntent> {
        if direction == 0 {
            return Vec::new();
        }
        vec![MapIntent::ZoomAt { cursor, direction }]
    }

    /// `scroll` is the viewport offset at press time, captured so the whole
    /// drag is relative to one fixed origin.
    pub fn on_mouse_down(&mut self, button: MapButton, screen: Vec2, scroll: Vec2) -> Vec<MapIntent> {
        match button {
            MapButton::Pan => {
                self.drag = Some(DragState {
                    start_screen: screen,
                    start_scroll: scroll,
                    last_screen: screen,
                });
                Vec::new()
            }
            MapButton::Select => vec![MapIntent::Select { screen }],
        }
    }

    pub fn on_mouse_move(&mut self, screen: Vec2) -> Vec<MapIntent> {
        match &mut self.drag {
            Some(drag) => {
                drag.last_screen = screen;
                vec![MapIntent::Pan {
                    start_scroll: drag.start_scroll,
                    start_screen: drag.start_screen,
                    current_screen: screen,
                    settled: false,
                }]
            }
            None => Vec::new(),
        }
    }

    pub fn on_mouse_up(&mut self, button: MapButton, screen: Vec2) -> Vec<MapIntent> {
        if button != MapButton::Pan {
            return Vec::new();
        }
        match self.drag.take() {
            Some(drag) => vec![MapIntent::Pan {
                start_scroll: drag.start_scroll,
                start_screen: drag.start_screen,
                current_screen: screen,
                settled: true,
            }],
            None => Vec::new(),
        }
    }

    /// Cursor left the window: settle the drag at its last known position.
    pub fn on_cursor_lost(&mut self) -> Vec<MapIntent> {
        match self.drag.take() {
            Some(drag) => vec![MapIntent::Pan {
                start_scroll: drag.start_scroll,
                start_screen: drag.start_screen,
                current_screen: drag.last_screen,
                settled: true,
            }],
            None => Vec::new(),
        }
    }

    pub fn on_clear_selection(&mut self) -> Vec<MapIntent> {
        vec![MapIntent::ClearSelection]
    }
}

// =============================================================================
// Systems
// =============================================================================

#[allow(deprecated)]
pub fn decode_map_input(
    mut wheel_events: EventReader<MouseWheel>,
    mouse: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    windows: Query<&Window, With<PrimaryWindow>>,
    viewport: Res<Viewport>,
    mut state: ResMut<MapInputState>,
    mut intents: ResMut<MapIntents>,
) {
    if keys.just_pressed(bindings.clear_selection) {
        let cleared = state.on_clear_selection();
        intents.extend(cleared);
    }

    let window = match windows.single() {
        Ok(window) => window,
        Err(_) => return,
    };

    let cursor = match window.cursor_position() {
        Some(cursor) => cursor,
        None => {
            wheel_events.clear();
            let settled = state.on_cursor_lost();
            intents.extend(settled);
            return;
        }
    };

    for event in wheel_events.read() {
        let direction = if event.y > 0.0 {
            1
        } else if event.y < 0.0 {
            -1
        } else {
            0
        };
        let zoomed = state.on_wheel(cursor, direction);
        intents.extend(zoomed);
    }

    if mouse.just_pressed(bindings.pan_button) {
        let scroll = viewport.scroll();
        let started = state.on_mouse_down(MapButton::Pan, cursor, scroll);
        intents.extend(started);
    } else if mouse.pressed(bindings.pan_button) && state.is_dragging() {
        let moved = state.on_mouse_move(cursor);
        intents.extend(moved);
    } else if mouse.just_released(bindings.pan_button) {
        let settled = state.on_mouse_up(MapButton::Pan, cursor);
        intents.extend(settled);
    }

    if mouse.just_pressed(bindings.select_button) {
        let selected = state.on_mouse_down(MapButton::Select, cursor, viewport.scroll());
        intents.extend(selected);
    }
}

// =============================================================================
// Tests
// =============================================================================
