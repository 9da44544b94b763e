use bevy::prelude::*;

use crate::compat::SpriteBundle;

pub struct CorePlugin;

#[derive(Resource, Debug)]
pub struct EventLog {
    entries: Vec<String>,
    max_entries: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: 8,
        }
    }
}

impl EventLog {
    pub fn push(&mut self, entry: String) {
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let overflow = self.entries.len() - self.max_entries;
            self.entries.drain(0..overflow);
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

#[derive(Resource, Debug, Default)]
pub struct DebugWindow {
    pub open: bool,
}

#[derive(Resource, Debug, Clone)]
pub struct InputBindings {
    pub pan_button: MouseButton,
    pub select_button: MouseButton,
    pub clear_selection: KeyCode,
    pub toggle_backdrop: KeyCode,
    pub toggle_grid: KeyCode,
    pub toggle_links: KeyCode,
    pub toggle_glyphs: KeyCode,
    pub toggle_labels: KeyCode,
    pub clear_links: KeyCode,
    pub save: KeyCode,
    pub load: KeyCode,
    pub toggle_debug: KeyCode,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            pan_button: MouseButton::Right,
            select_button: MouseButton::Left,
            clear_selection: KeyCode::Escape,
            toggle_backdrop: KeyCode::KeyB,
            toggle_grid: KeyCode::KeyG,
            toggle_links: KeyCode::KeyR,
            toggle_glyphs: KeyCode::KeyN,
            toggle_labels: KeyCode::KeyY,
            clear_links: KeyCode::KeyX,
            save: KeyCode::F5,
            load: KeyCode::F9,
            toggle_debug: KeyCode::F3,
        }
    }
}

#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    #[default]
    Boot,
    Loading,
    InGame,
}

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<AppState>()
            .insert_resource(InputBindings::default())
            .init_resource::<EventLog>()
            .init_resource::<DebugWindow>()
            .add_systems(OnEnter(AppState::Boot), (log_enter_boot, transition_to_loading))
            .add_systems(OnEnter(AppState::Loading), setup_loading_screen)
            .add_systems(OnExit(AppState::Loading), teardown_loading_screen)
            .add_systems(OnEnter(AppState::InGame), log_enter_ingame)
            .add_systems(Update, handle_debug_toggle)
            .add_systems(Update, tick_loading.run_if(in_state(AppState::Loading)));
    }
}

fn log_enter_boot(mut log: ResMut<EventLog>) {
    log.push("State: Boot".to_string());
    info!("State: Boot");
}

fn transition_to_loading(mut next_state: ResMut<NextState<AppState>>) {
    next_state.set(AppState::Loading);
}

fn log_enter_ingame(mut log: ResMut<EventLog>) {
    log.push("State: InGame".to_string());
    info!("State: InGame");
}

#[derive(Component)]
struct LoadingScreen;

#[derive(Resource)]
struct LoadingTimer {
    timer: Timer,
}

fn setup_loading_screen(mut commands: Commands) {
    let size = Vec2::new(4000.0, 2250.0);

    commands.spawn((
        LoadingScreen,
        SpriteBundle {
            sprite: Sprite {
                color: Color::srgb(0.02, 0.02, 0.04),
                custom_size: Some(size),
                ..default()
            },
            ..default()
        },
    ));

    commands.insert_resource(LoadingTimer {
        timer: Timer::from_seconds(0.35, TimerMode::Once),
    });
}

fn tick_loading(
    time: Res<Time>,
    mut timer: ResMut<LoadingTimer>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    timer.timer.tick(time.delta());

    if timer.timer.is_finished() {
        next_state.set(AppState::InGame);
    }
}

fn teardown_loading_screen(mut commands: Commands, screens: Query<Entity, With<LoadingScreen>>) {
    for entity in screens.iter() {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<LoadingTimer>();
}

fn handle_debug_toggle(
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut debug_window: ResMut<DebugWindow>,
) {
    if input.just_pressed(bindings.toggle_debug) {
        debug_window.open = !debug_window.open;
        info!(
            "Debug window: {}",
            if debug_window.open { "open" } else { "closed" }
        );
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::SystemState;

    #[test]
    fn event_log_push_trims_oldest_entries() {
        let mut log = EventLog::default();
        for index in 0..12 {
            log.push(format!("entry-{}", index));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 8);
        assert_eq!(entries.first().map(String::as_str), Some("entry-4"));
        assert_eq!(entries.last().map(String::as_str), Some("entry-11"));
    }

    #[test]
    fn event_log_keeps_everything_under_capacity() {
        let mut log = EventLog::default();
        log.push("one".to_string());
        log.push("two".to_string());
        assert_eq!(log.entries().len(), 2);
    }

    #[test]
    fn default_bindings_pan_on_right_select_on_left() {
        let bindings = InputBindings::default();
        assert_eq!(bindings.pan_button, MouseButton::Right);
        assert_eq!(bindings.select_button, MouseButton::Left);
    }

    #[test]
    fn handle_debug_toggle_flips_window() {
        let mut world = World::default();
        world.insert_resource(ButtonInput::<KeyCode>::default());
        world.insert_resource(InputBindings::default());
        world.insert_resource(DebugWindow::default());

        {
            let mut input = world.resource_mut::<ButtonInput<KeyCode>>();
            input.press(KeyCode::F3);
        }

        let mut system_state: SystemState<(
            Res<ButtonInput<KeyCode>>,
            Res<InputBindings>,
            ResMut<DebugWindow>,
        )> = SystemState::new(&mut world);
        let (input, bindings, debug_window) = system_state.get_mut(&mut world);
        handle_debug_toggle(input, bindings, debug_window);
        system_state.apply(&mut world);

        assert!(world.resource::<DebugWindow>().open);
    }
}
