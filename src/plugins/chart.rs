//! Chart loading, persistence, and the gate-store seam.
//!
//! The chart snapshot comes from a RON file, the embedded sample chart, or
//! the seeded demo generator. Whatever the source, loading always builds a
//! fresh `StarChart` + `GateGraphStore` pair and swaps both wholesale; the
//! link overlay is then rebuilt from the store whenever the store changes.

use bevy::prelude::*;

use std::fs;
use std::path::Path;

use crate::factions::FactionRegistry;
use crate::gates::{GateFacility, GateGraphStore, LinkDraft};
use crate::plugins::core::{AppState, DebugWindow, EventLog, InputBindings};
use crate::world::{
    link_distance, ChartRevision, FacilityClass, GateLink, LinkStatus, StarChart, StarSystem,
};

pub struct ChartPlugin;

impl Plugin for ChartPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StarChart>()
            .init_resource::<ChartRevision>()
            .init_resource::<GateGraphStore>()
            .insert_resource(FactionRegistry::with_core_factions())
            .add_systems(OnEnter(AppState::Boot), seed_chart)
            .add_systems(
                Update,
                (handle_save_request, handle_load_request, rebuild_link_overlay)
                    .run_if(in_state(AppState::InGame)),
            )
            .add_systems(
                Update,
                handle_clear_links_action
                    .run_if(in_state(AppState::InGame))
                    .run_if(debug_window_open),
            );
    }
}

fn debug_window_open(debug_window: Res<DebugWindow>) -> bool {
    debug_window.open
}

// =============================================================================
// Snapshot types
// =============================================================================

#[derive(serde::Serialize, serde::Deserialize)]
pub struct SaveChart {
    pub systems: Vec<SaveSystem>,
    #[serde(default)]
    pub links: Vec<SaveLink>,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct SaveSystem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alt_name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// Screen anchor, authoritative for placement.
    pub ax: i32,
    pub ay: i32,
    #[serde(default = "default_ring")]
    pub ring: (f32, f32, f32),
    #[serde(default = "default_core")]
    pub core: (f32, f32, f32),
    #[serde(default)]
    pub faction: String,
    /// Facility classification tag; blank defaults to standard.
    #[serde(default)]
    pub gate_class: String,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct SaveLink {
    pub from: String,
    pub to: String,
    /// Status tag; blank parses as open.
    #[serde(default)]
    pub status: String,
    #[serde(default = "default_true")]
    pub bidirectional: bool,
    #[serde(default)]
    pub transit_cost: Option<f32>,
    #[serde(default)]
    pub toll: Option<f32>,
    #[serde(default)]
    pub valid_from: Option<String>,
    #[serde(default)]
    pub valid_until: Option<String>,
    #[serde(default)]
    pub notes: String,
}

fn default_ring() -> (f32, f32, f32) {
    (0.55, 0.75, 0.95)
}

fn default_core() -> (f32, f32, f32) {
    (0.9, 0.92, 0.98)
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Chart assembly
// =============================================================================

pub struct LoadedChart {
    pub chart: StarChart,
    pub store: GateGraphStore,
    /// Links dropped because an endpoint system was unknown or had no
    /// resolvable governing faction.
    pub skipped_links: usize,
}

/// Build a fresh chart + store pair from a snapshot. Duplicate system ids
/// fail the whole load; bad links are skipped and counted.
pub fn apply_chart(save: &SaveChart, registry: &FactionRegistry) -> Result<LoadedChart, String> {
    let mut systems: Vec<StarSystem> = Vec::with_capacity(save.systems.len());
    for saved in &save.systems {
        if systems.iter().any(|existing| existing.id == saved.id) {
            return Err(format!("duplicate system id '{}'", saved.id));
        }
        systems.push(StarSystem {
            id: saved.id.clone(),
            name: saved.name.clone(),
            alt_name: saved.alt_name.clone(),
            pos: Vec3::new(saved.x, saved.y, saved.z),
            anchor: IVec2::new(saved.ax, saved.ay),
            ring_color: Color::srgb(saved.ring.0, saved.ring.1, saved.ring.2),
            core_color: Color::srgb(saved.core.0, saved.core.1, saved.core.2),
            faction: if saved.faction.trim().is_empty() {
                None
            } else {
                Some(saved.faction.clone())
            },
            has_gate: false,
        });
    }

    let mut store = GateGraphStore::default();
    let mut skipped = 0;

    for link in &save.links {
        let from_index = systems.iter().position(|s| s.id == link.from);
        let to_index = systems.iter().position(|s| s.id == link.to);
        let (from_index, to_index) = match (from_index, to_index) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                warn!("Skipping link {} - {}: unknown system", link.from, link.to);
                skipped += 1;
                continue;
            }
        };

        let from_facility = match store.ensure_facility(&mut systems[from_index], registry) {
            Ok(id) => id,
            Err(error) => {
                warn!("Skipping link {} - {}: {}", link.from, link.to, error);
                skipped += 1;
                continue;
            }
        };
        let to_facility = match store.ensure_facility(&mut systems[to_index], registry) {
            Ok(id) => id,
            Err(error) => {
                warn!("Skipping link {} - {}: {}", link.from, link.to, error);
                skipped += 1;
                continue;
            }
        };

        // Absent transit costs default to the straight-line distance over all
        // three coordinates.
        let transit_cost = link
            .transit_cost
            .or_else(|| Some(link_distance(&systems[from_index], &systems[to_index])));

        let draft = LinkDraft {
            from: from_facility,
            to: to_facility,
            status: LinkStatus::from_tag(&link.status),
            bidirectional: link.bidirectional,
            transit_cost,
            toll: link.toll,
            valid_from: link.valid_from.clone(),
            valid_until: link.valid_until.clone(),
            notes: link.notes.clone(),
        };
        if let Err(error) = store.upsert_link(draft) {
            warn!("Skipping link {} - {}: {}", link.from, link.to, error);
            skipped += 1;
        }
    }

    // Facility classes ride on the system rows; push non-default ones through
    // the upsert path once the facility exists.
    for saved in &save.systems {
        let class = FacilityClass::from_tag(&saved.gate_class);
        if class == FacilityClass::default() {
            continue;
        }
        if let Some(facility) = store.facility_for_system(&saved.id).cloned() {
            store
                .upsert_facility(GateFacility { class, ..facility })
                .map_err(|error| error.to_string())?;
        }
    }

    Ok(LoadedChart {
        chart: StarChart {
            systems,
            links: Vec::new(),
        },
        store,
        skipped_links: skipped,
    })
}

/// Project the store's canonical records into the overlay list, endpoints
/// resolved to system ids. Sorted by endpoint pair so render order is stable.
pub fn links_from_store(store: &GateGraphStore) -> Vec<GateLink> {
    let mut links: Vec<GateLink> = store
        .links()
        .filter_map(|record| {
            let from = store.facility(&record.from)?;
            let to = store.facility(&record.to)?;
            Some(GateLink {
                from_system: from.system_id.clone(),
                to_system: to.system_id.clone(),
                status: record.status,
                from_class: from.class,
                to_class: to.class,
            })
        })
        .collect();
    links.sort_by(|a, b| (&a.from_system, &a.to_system).cmp(&(&b.from_system, &b.to_system)));
    links
}

// =============================================================================
// Demo chart generation
// =============================================================================

const DEMO_SEED: u64 = 73;
const DEMO_COLS: usize = 8;
const DEMO_ROWS: usize = 6;

const DEMO_FACTIONS: [&str; 4] = [
    "terran-accord",
    "veyra-syndicate",
    "free-holds",
    "meridian-combine",
];

const NAME_HEADS: [&str; 8] = ["Ker", "Vel", "Ash", "Mor", "Tal", "Rho", "Zan", "Ilm"];
const NAME_TAILS: [&str; 8] = ["ion", "ara", "eth", "os", "una", "ir", "axa", "ene"];

/// Deterministic demo chart for first boot: a jittered grid of systems with
/// a chain of gate links plus a few cross links.
pub fn generate_demo_chart(seed: u64) -> SaveChart {
    let mut rng_state = seed.max(1);
    let mut next_random = move || -> f32 {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let value = (rng_state >> 33) as u32;
        (value as f32) / (u32::MAX as f32)
    };

    let cell = Vec2::new(3200.0 / DEMO_COLS as f32, 2400.0 / DEMO_ROWS as f32);
    let origin = Vec2::new(-1600.0, -1200.0) + cell * 0.5;

    let mut systems = Vec::new();
    for row in 0..DEMO_ROWS {
        for col in 0..DEMO_COLS {
            let index = row * DEMO_COLS + col;
            let jitter = Vec2::new(
                (next_random() - 0.5) * cell.x * 0.55,
                (next_random() - 0.5) * cell.y * 0.55,
            );
            let anchor = origin + Vec2::new(col as f32 * cell.x, row as f32 * cell.y) + jitter;

            let head = NAME_HEADS[(next_random() * NAME_HEADS.len() as f32) as usize % 8];
            let tail = NAME_TAILS[(next_random() * NAME_TAILS.len() as f32) as usize % 8];
            let faction = DEMO_FACTIONS[index % DEMO_FACTIONS.len()];

            let gate_class = match index {
                i if i % 7 == 0 => "capital",
                i if i % 5 == 0 => "military",
                i if i % 3 == 0 => "trade",
                _ => "",
            };

            let hue_shift = next_random() * 0.3;
            systems.push(SaveSystem {
                id: format!("SYS-{:03}", index + 1),
                name: format!("{}{}", head, tail),
                alt_name: format!("Sector {}-{}", col + 1, row + 1),
                x: anchor.x,
                y: anchor.y,
                z: (next_random() - 0.5) * 400.0,
                ax: anchor.x.round() as i32,
                ay: anchor.y.round() as i32,
                ring: (0.5 + hue_shift, 0.7, 0.95 - hue_shift),
                core: default_core(),
                faction: faction.to_string(),
                gate_class: gate_class.to_string(),
            });
        }
    }

    let statuses = ["", "", "restricted", "", "interdicted", "", "closed"];
    let mut links = Vec::new();
    for index in 1..systems.len() {
        let to = if index % 4 == 0 && index >= DEMO_COLS {
            index - DEMO_COLS
        } else {
            index - 1
        };
        links.push(SaveLink {
            from: systems[index].id.clone(),
            to: systems[to].id.clone(),
            status: statuses[index % statuses.len()].to_string(),
            bidirectional: true,
            transit_cost: Some(1.0 + next_random() * 9.0),
            toll: if index % 6 == 0 {
                Some((next_random() * 50.0).round())
            } else {
                None
            },
            valid_from: None,
            valid_until: None,
            notes: String::new(),
        });
    }

    SaveChart { systems, links }
}

// =============================================================================
// Persistence
// =============================================================================

const CHART_PATH: &str = "saves/chart.ron";

const SAMPLE_CHART_RON: &str = r#"
(
    systems: [
        (id: "SYS-001", name: "Kerion", alt_name: "Sector 1-1", x: -420.0, y: -180.0, z: 60.0,
         ax: -420, ay: -180, ring: (0.9, 0.3, 0.3), faction: "terran-accord", gate_class: "capital"),
        (id: "SYS-002", name: "Velara", x: 160.0, y: -240.0, z: -35.0,
         ax: 160, ay: -240, faction: "veyra-syndicate", gate_class: "trade"),
        (id: "SYS-003", alt_name: "Asheth Reach", x: 380.0, y: 220.0, z: 140.0,
         ax: 380, ay: 220, faction: "free-holds"),
        (id: "SYS-004", name: "Moros", x: -150.0, y: 310.0, z: 0.0,
         ax: -150, ay: 310, faction: "meridian-combine", gate_class: "military"),
    ],
    links: [
        (from: "SYS-001", to: "SYS-002", transit_cost: Some(4.5)),
        (from: "SYS-003", to: "SYS-002", status: "restricted", toll: Some(25.0)),
        (from: "SYS-003", to: "SYS-004", status: "interdicted"),
        (from: "SYS-004", to: "SYS-001", status: "closed",
         valid_from: Some("3107-01-04"), valid_until: Some("3107-06-30"),
         notes: "Blockade until accord review"),
    ],
)
"#;

fn load_chart_from_file() -> Result<Option<SaveChart>, String> {
    let path = Path::new(CHART_PATH);

    if !path.exists() {
        return Ok(None);
    }

    match fs::read_to_string(path) {
        Ok(contents) => match ron::de::from_str::<SaveChart>(&contents) {
            Ok(loaded) => Ok(Some(loaded)),
            Err(error) => Err(format!("RON parse error: {}", error)),
        },
        Err(error) => Err(format!("Read error: {}", error)),
    }
}

fn write_chart_file(contents: &str) -> Result<(), String> {
    let path = Path::new(CHART_PATH);
    let dir = path.parent().unwrap_or_else(|| Path::new("saves"));

    if let Err(error) = fs::create_dir_all(dir) {
        return Err(format!("Create dir error: {}", error));
    }

    match fs::write(path, contents) {
        Ok(_) => Ok(()),
        Err(error) => Err(format!("Write error: {}", error)),
    }
}

fn save_from_state(chart: &StarChart, store: &GateGraphStore) -> SaveChart {
    let systems = chart
        .systems
        .iter()
        .map(|system| {
            let ring = system.ring_color.to_srgba();
            let core = system.core_color.to_srgba();
            SaveSystem {
                id: system.id.clone(),
                name: system.name.clone(),
                alt_name: system.alt_name.clone(),
                x: system.pos.x,
                y: system.pos.y,
                z: system.pos.z,
                ax: system.anchor.x,
                ay: system.anchor.y,
                ring: (ring.red, ring.green, ring.blue),
                core: (core.red, core.green, core.blue),
                faction: system.faction.clone().unwrap_or_default(),
                gate_class: store
                    .facility_for_system(&system.id)
                    .map(|facility| facility.class.tag().to_string())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let mut links: Vec<SaveLink> = store
        .links()
        .filter_map(|record| {
            let from = store.facility(&record.from)?;
            let to = store.facility(&record.to)?;
            Some(SaveLink {
                from: from.system_id.clone(),
                to: to.system_id.clone(),
                status: record.status.tag().to_string(),
                bidirectional: record.bidirectional,
                transit_cost: record.transit_cost,
                toll: record.toll,
                valid_from: record.valid_from.clone(),
                valid_until: record.valid_until.clone(),
                notes: record.notes.clone(),
            })
        })
        .collect();
    links.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

    SaveChart { systems, links }
}

// =============================================================================
// Systems
// =============================================================================

fn swap_in(
    loaded: LoadedChart,
    chart: &mut StarChart,
    store: &mut GateGraphStore,
    revision: &mut ChartRevision,
    log: &mut EventLog,
    source: &str,
) {
    let system_count = loaded.chart.systems.len();
    let link_count = loaded.store.link_count();

    *chart = loaded.chart;
    *store = loaded.store;
    revision.bump();

    let mut message = format!(
        "Loaded {} ({} systems, {} links)",
        source, system_count, link_count
    );
    if loaded.skipped_links > 0 {
        message.push_str(&format!(", {} links skipped", loaded.skipped_links));
    }
    info!("{}", message);
    log.push(message);
}

pub fn seed_chart(
    registry: Res<FactionRegistry>,
    mut chart: ResMut<StarChart>,
    mut store: ResMut<GateGraphStore>,
    mut revision: ResMut<ChartRevision>,
    mut log: ResMut<EventLog>,
) {
    let (save, source) = match load_chart_from_file() {
        Ok(Some(loaded)) => (loaded, CHART_PATH.to_string()),
        Ok(None) => (generate_demo_chart(DEMO_SEED), "demo chart".to_string()),
        Err(error) => {
            error!("Chart load failed, falling back to demo: {}", error);
            log.push(format!("Chart load failed: {}", error));
            (generate_demo_chart(DEMO_SEED), "demo chart".to_string())
        }
    };

    match apply_chart(&save, &registry) {
        Ok(loaded) => swap_in(loaded, &mut chart, &mut store, &mut revision, &mut log, &source),
        Err(error) => {
            error!("Chart apply failed: {}", error);
            log.push(format!("Chart apply failed: {}", error));
        }
    }
}

pub fn handle_load_request(
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    registry: Res<FactionRegistry>,
    mut chart: ResMut<StarChart>,
    mut store: ResMut<GateGraphStore>,
    mut revision: ResMut<ChartRevision>,
    mut log: ResMut<EventLog>,
) {
    if !input.just_pressed(bindings.load) {
        return;
    }

    let (save, source) = match load_chart_from_file() {
        Ok(Some(loaded)) => (loaded, CHART_PATH.to_string()),
        Ok(None) => match ron::de::from_str::<SaveChart>(SAMPLE_CHART_RON) {
            Ok(loaded) => (loaded, "sample chart".to_string()),
            Err(error) => {
                error!("Load failed: {}", error);
                log.push(format!("Load failed: {}", error));
                return;
            }
        },
        Err(error) => {
            error!("Load failed: {}", error);
            log.push(format!("Load failed: {}", error));
            return;
        }
    };

    match apply_chart(&save, &registry) {
        Ok(loaded) => swap_in(loaded, &mut chart, &mut store, &mut revision, &mut log, &source),
        Err(error) => {
            error!("Load failed: {}", error);
            log.push(format!("Load failed: {}", error));
        }
    }
}

pub fn handle_save_request(
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    chart: Res<StarChart>,
    store: Res<GateGraphStore>,
    mut log: ResMut<EventLog>,
) {
    if !input.just_pressed(bindings.save) {
        return;
    }

    let payload = save_from_state(&chart, &store);
    let config = ron::ser::PrettyConfig::default();

    match ron::ser::to_string_pretty(&payload, config) {
        Ok(serialized) => {
            if let Err(error) = write_chart_file(&serialized) {
                error!("Save write failed: {}", error);
                log.push(format!("Save write failed: {}", error));
            } else {
                info!("Saved chart to {} ({} bytes)", CHART_PATH, serialized.len());
                log.push(format!("Saved chart to {}", CHART_PATH));
            }
        }
        Err(error) => {
            error!("Save failed: {}", error);
            log.push(format!("Save failed: {}", error));
        }
    }
}

/// Debug action: wipe every link touching the selected system's facility via
/// the store's atomic replace.
pub fn handle_clear_links_action(
    input: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    selected: Res<crate::plugins::viewmap::picking::SelectedSystem>,
    mut store: ResMut<GateGraphStore>,
    mut log: ResMut<EventLog>,
) {
    if !input.just_pressed(bindings.clear_links) {
        return;
    }
    let system_id = match &selected.id {
        Some(id) => id.clone(),
        None => {
            log.push("Clear links: nothing selected".to_string());
            return;
        }
    };

    let facility_id = match store.facility_for_system(&system_id) {
        Some(facility) => facility.id.clone(),
        None => {
            log.push(format!("Clear links: {} has no gate facility", system_id));
            return;
        }
    };

    match store.replace_links(&facility_id, Vec::new()) {
        Ok(_) => {
            log.push(format!("Cleared links touching {}", system_id));
        }
        Err(error) => {
            log.push(format!("Clear links failed: {}", error));
        }
    }
}

/// Re-project the overlay whenever the store changes.
pub fn rebuild_link_overlay(store: Res<GateGraphStore>, mut chart: ResMut<StarChart>) {
    if !store.is_changed() {
        return;
    }
    chart.links = links_from_store(&store);
}

// =============================================================================
// Tests
// =============================================================================
