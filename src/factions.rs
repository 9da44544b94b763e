//! Governing-faction registry for facility ownership.

use bevy::prelude::*;

/// A governing faction a star system can belong to. Facilities record the
/// owning system's faction at creation time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Faction {
    pub id: String,
    pub name: String,
}

/// Registry of known factions. Small and load-once; linear lookup is fine.
#[derive(Resource, Default)]
pub struct FactionRegistry {
    factions: Vec<Faction>,
}

impl FactionRegistry {
    /// The factions every demo chart ships with.
    pub fn with_core_factions() -> Self {
        let mut registry = Self::default();
        registry.insert("terran-accord", "Terran Accord");
        registry.insert("veyra-syndicate", "Veyra Syndicate");
        registry.insert("free-holds", "Free Holds");
        registry.insert("meridian-combine", "Meridian Combine");
        registry
    }

    pub fn insert(&mut self, id: &str, name: &str) {
        if let Some(existing) = self.factions.iter_mut().find(|f| f.id == id) {
            existing.name = name.to_string();
            return;
        }
        self.factions.push(Faction {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn resolve(&self, id: &str) -> Option<&Faction> {
        if id.trim().is_empty() {
            return None;
        }
        self.factions.iter().find(|faction| faction.id == id)
    }

    #[allow(dead_code)] // Used in tests
    pub fn len(&self) -> usize {
        self.factions.len()
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
