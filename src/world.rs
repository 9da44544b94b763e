use bevy::prelude::*;

/// In-memory chart snapshot. Replaced wholesale on every load cycle; the
/// renderer and hit-tester only ever observe a complete snapshot.
#[derive(Resource, Default)]
pub struct StarChart {
    pub systems: Vec<StarSystem>,
    pub links: Vec<GateLink>,
}

impl StarChart {
    pub fn find_system(&self, id: &str) -> Option<&StarSystem> {
        self.systems.iter().find(|system| system.id == id)
    }
}

/// Bumped on every wholesale chart swap so visual-spawning systems know to
/// rebuild their entities.
#[derive(Resource, Default)]
pub struct ChartRevision {
    pub counter: u64,
}

impl ChartRevision {
    pub fn bump(&mut self) {
        self.counter = self.counter.wrapping_add(1);
    }
}

/// A positioned, renderable star-system record.
#[derive(Clone, Debug)]
pub struct StarSystem {
    pub id: String,
    pub name: String,
    pub alt_name: String,
    /// Real-valued world coordinates. Z is kept for distance computation only
    /// and never projected to screen.
    pub pos: Vec3,
    /// Precomputed screen-space anchor relative to the chart origin. This is
    /// the authoritative placement for rendering and hit-testing; it is
    /// allowed to diverge from `pos`.
    pub anchor: IVec2,
    pub ring_color: Color,
    pub core_color: Color,
    /// Governing-faction reference, resolved against the faction registry.
    pub faction: Option<String>,
    /// Mirror flag maintained by the gate store when a facility exists.
    pub has_gate: bool,
}

impl StarSystem {
    /// Display name precedence: primary name, then secondary name, then the
    /// identity key. Blank fields fall through.
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            &self.name
        } else if !self.alt_name.trim().is_empty() {
            &self.alt_name
        } else {
            &self.id
        }
    }

    pub fn anchor_chart(&self) -> Vec2 {
        Vec2::new(self.anchor.x as f32, self.anchor.y as f32)
    }
}

/// Straight-line distance between two systems over all three coordinates.
/// Routing stub; there is no pathfinding in this viewer.
pub fn link_distance(a: &StarSystem, b: &StarSystem) -> f32 {
    a.pos.distance(b.pos)
}

/// Gate link status. Absent or blank tags parse as `Open`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum LinkStatus {
    #[default]
    Open,
    Restricted,
    Interdicted,
    Closed,
}

impl LinkStatus {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "restricted" => LinkStatus::Restricted,
            "interdicted" => LinkStatus::Interdicted,
            "closed" => LinkStatus::Closed,
            _ => LinkStatus::Open,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            LinkStatus::Open => "open",
            LinkStatus::Restricted => "restricted",
            LinkStatus::Interdicted => "interdicted",
            LinkStatus::Closed => "closed",
        }
    }
}

/// Facility classification. Blank tags default to `Standard`. Precedence for
/// edge coloring: Capital > Military > Trade > Standard.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum FacilityClass {
    Capital,
    Military,
    Trade,
    #[default]
    Standard,
}

impl FacilityClass {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "capital" => FacilityClass::Capital,
            "military" => FacilityClass::Military,
            "trade" => FacilityClass::Trade,
            _ => FacilityClass::Standard,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            FacilityClass::Capital => "capital",
            FacilityClass::Military => "military",
            FacilityClass::Trade => "trade",
            FacilityClass::Standard => "standard",
        }
    }

    /// Lower value wins when picking an edge's base color.
    pub fn precedence(&self) -> u8 {
        match self {
            FacilityClass::Capital => 0,
            FacilityClass::Military => 1,
            FacilityClass::Trade => 2,
            FacilityClass::Standard => 3,
        }
    }
}

/// Overlay edge with endpoints resolved to system ids, rebuilt from the gate
/// store whenever it changes. Endpoint classes are carried for coloring.
#[derive(Clone, Debug)]
pub struct GateLink {
    pub from_system: String,
    pub to_system: String,
    pub status: LinkStatus,
    pub from_class: FacilityClass,
    pub to_class: FacilityClass,
}

// =============================================================================
// Tests
// =============================================================================
