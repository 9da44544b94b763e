//! Canonical undirected storage for jump-gate facilities and links.
//!
//! Facilities and links live in owned collections inside the store instance
//! (held as a resource at runtime, built fresh per test), never in ambient
//! global state. A link between two facilities is stored exactly once no
//! matter which endpoint a caller names first.

use std::collections::HashMap;

use bevy::prelude::*;
use thiserror::Error;

use crate::factions::FactionRegistry;
use crate::world::{FacilityClass, LinkStatus, StarSystem};

// =============================================================================
// Constants
// =============================================================================

pub const FACILITY_ID_PREFIX: &str = "FAC|";
pub const LINK_ID_PREFIX: &str = "LNK|";
pub const LINK_ID_SEPARATOR: char = '|';

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug)]
pub enum GateStoreError {
    #[error("required field '{0}' is blank")]
    Validation(&'static str),

    #[error("system '{0}' has no resolvable governing faction")]
    MissingGovernmentReference(String),

    #[error("unknown facility '{0}'")]
    UnknownFacility(String),

    #[error("replace rejected, prior link set kept: {0}")]
    ReplaceRejected(String),
}

// =============================================================================
// Records
// =============================================================================

/// A gate facility, attached 1:1 to a star system.
#[derive(Clone, Debug, PartialEq)]
pub struct GateFacility {
    pub id: String,
    pub system_id: String,
    /// Governing-faction reference of the owning system. Required.
    pub faction: String,
    pub class: FacilityClass,
}

/// A stored gate link. Endpoints are facility ids in canonical order
/// (`from <= to` byte-wise); `id` is derived from the ordered pair.
#[derive(Clone, Debug, PartialEq)]
pub struct GateLinkRecord {
    pub id: String,
    pub from: String,
    pub to: String,
    pub status: LinkStatus,
    pub bidirectional: bool,
    pub transit_cost: Option<f32>,
    pub toll: Option<f32>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub notes: String,
}

/// Caller-supplied link input, endpoints in any order. Canonicalized on
/// insertion.
#[derive(Clone, Debug)]
pub struct LinkDraft {
    pub from: String,
    pub to: String,
    pub status: LinkStatus,
    pub bidirectional: bool,
    pub transit_cost: Option<f32>,
    pub toll: Option<f32>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub notes: String,
}

impl LinkDraft {
    pub fn between(from: &str, to: &str, status: LinkStatus) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            status,
            bidirectional: true,
            transit_cost: None,
            toll: None,
            valid_from: None,
            valid_until: None,
            notes: String::new(),
        }
    }
}

// =============================================================================
// Id construction
// =============================================================================

/// Order an endpoint pair deterministically: byte-wise string compare, swap
/// when `a > b`. Commutative over argument order.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Composite link id over an already-ordered pair.
pub fn link_id(lo: &str, hi: &str) -> String {
    format!("{}{}{}{}", LINK_ID_PREFIX, lo, LINK_ID_SEPARATOR, hi)
}

/// Deterministic facility id for a system.
pub fn facility_id(system_id: &str) -> String {
    format!("{}{}", FACILITY_ID_PREFIX, system_id)
}

// =============================================================================
// Store
// =============================================================================

#[derive(Resource, Default)]
pub struct GateGraphStore {
    facilities: HashMap<String, GateFacility>,
    links: HashMap<String, GateLinkRecord>,
}

impl GateGraphStore {
    // -- queries --------------------------------------------------------------

    pub fn facility(&self, id: &str) -> Option<&GateFacility> {
        self.facilities.get(id)
    }

    pub fn facility_for_system(&self, system_id: &str) -> Option<&GateFacility> {
        self.facilities.get(&facility_id(system_id))
    }

    pub fn facility_count(&self) -> usize {
        self.facilities.len()
    }

    /// Every stored link with either endpoint equal to `facility_id`, sorted
    /// by link id for deterministic output.
    pub fn links_touching(&self, facility_id: &str) -> Vec<&GateLinkRecord> {
        let mut touching: Vec<&GateLinkRecord> = self
            .links
            .values()
            .filter(|link| link.from == facility_id || link.to == facility_id)
            .collect();
        touching.sort_by(|a, b| a.id.cmp(&b.id));
        touching
    }

    pub fn links(&self) -> impl Iterator<Item = &GateLinkRecord> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    // -- mutations ------------------------------------------------------------

    /// Return the facility id for `system`, creating the facility if absent.
    ///
    /// The second call for the same system is a pure read: no write happens
    /// and the same id is returned. Creation requires the system's governing
    /// faction to resolve in `registry`; on success the system is flagged as
    /// having a gate.
    pub fn ensure_facility(
        &mut self,
        system: &mut StarSystem,
        registry: &FactionRegistry,
    ) -> Result<String, GateStoreError> {
        if let Some(existing) = self.facility_for_system(&system.id) {
            return Ok(existing.id.clone());
        }

        let faction = system
            .faction
            .as_deref()
            .filter(|&id| registry.resolve(id).is_some())
            .ok_or_else(|| GateStoreError::MissingGovernmentReference(system.id.clone()))?
            .to_string();

        let id = facility_id(&system.id);
        self.facilities.insert(
            id.clone(),
            GateFacility {
                id: id.clone(),
                system_id: system.id.clone(),
                faction,
                class: FacilityClass::default(),
            },
        );
        system.has_gate = true;
        Ok(id)
    }

    /// Full-row upsert keyed by facility id. Blank required fields fail
    /// validation before any mutation.
    pub fn upsert_facility(&mut self, facility: GateFacility) -> Result<(), GateStoreError> {
        if facility.id.trim().is_empty() {
            return Err(GateStoreError::Validation("facility id"));
        }
        if facility.system_id.trim().is_empty() {
            return Err(GateStoreError::Validation("owning system"));
        }
        if facility.faction.trim().is_empty() {
            return Err(GateStoreError::Validation("governing faction"));
        }

        self.facilities.insert(facility.id.clone(), facility);
        Ok(())
    }

    /// Upsert a single link. Drafts with a blank endpoint are skipped
    /// (`Ok(None)`); both endpoints must name known facilities. The stored
    /// record is canonical regardless of draft endpoint order.
    pub fn upsert_link(&mut self, draft: LinkDraft) -> Result<Option<String>, GateStoreError> {
        let record = match self.canonicalize(draft)? {
            Some(record) => record,
            None => return Ok(None),
        };
        let id = record.id.clone();
        self.links.insert(id.clone(), record);
        Ok(Some(id))
    }

    /// Atomically replace every link incident to `facility_id` with
    /// `new_links`.
    ///
    /// Drafts with a blank endpoint are silently skipped; duplicate pairs
    /// collapse last-write-wins on the canonical id. Any draft naming an
    /// unknown facility rejects the whole batch and the prior link set stays
    /// queryable unchanged. Returns the number of links inserted.
    pub fn replace_links(
        &mut self,
        facility_id: &str,
        new_links: Vec<LinkDraft>,
    ) -> Result<usize, GateStoreError> {
        if !self.facilities.contains_key(facility_id) {
            return Err(GateStoreError::UnknownFacility(facility_id.to_string()));
        }

        // Build the replacement map first; swap only after every draft
        // validated, so readers never observe partial state.
        let mut next: HashMap<String, GateLinkRecord> = self
            .links
            .iter()
            .filter(|(_, link)| link.from != facility_id && link.to != facility_id)
            .map(|(id, link)| (id.clone(), link.clone()))
            .collect();

        let mut inserted = 0;
        let mut rejections = Vec::new();
        for draft in new_links {
            match self.canonicalize(draft) {
                Ok(Some(record)) => {
                    if next.insert(record.id.clone(), record).is_none() {
                        inserted += 1;
                    }
                }
                Ok(None) => {}
                Err(error) => rejections.push(error.to_string()),
            }
        }

        if !rejections.is_empty() {
            return Err(GateStoreError::ReplaceRejected(rejections.join("; ")));
        }

        self.links = next;
        Ok(inserted)
    }

    fn canonicalize(&self, draft: LinkDraft) -> Result<Option<GateLinkRecord>, GateStoreError> {
        if draft.from.trim().is_empty() || draft.to.trim().is_empty() {
            return Ok(None);
        }
        for endpoint in [&draft.from, &draft.to] {
            if !self.facilities.contains_key(endpoint) {
                return Err(GateStoreError::UnknownFacility(endpoint.clone()));
            }
        }

        let (lo, hi) = canonical_pair(&draft.from, &draft.to);
        Ok(Some(GateLinkRecord {
            id: link_id(lo, hi),
            from: lo.to_string(),
            to: hi.to_string(),
            status: draft.status,
            bidirectional: draft.bidirectional,
            transit_cost: draft.transit_cost,
            toll: draft.toll,
            valid_from: draft.valid_from,
            valid_until: draft.valid_until,
            notes: draft.notes,
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::{IVec2, Vec3};

    fn system(id: &str, faction: Option<&str>) -> StarSystem {
        StarSystem {
            id: id.to_string(),
            name: String::new(),
            alt_name: String::new(),
            pos: Vec3::ZERO,
            anchor: IVec2::ZERO,
            ring_color: Color::WHITE,
            core_color: Color::WHITE,
            faction: faction.map(str::to_string),
            has_gate: false,
        }
    }

    fn store_with_facilities(ids: &[&str]) -> GateGraphStore {
        let mut store = GateGraphStore::default();
        let registry = FactionRegistry::with_core_factions();
        for id in ids {
            let mut sys = system(id, Some("terran-accord"));
            store.ensure_facility(&mut sys, &registry).unwrap();
        }
        store
    }

    #[test]
    fn canonical_pair_is_commutative() {
        assert_eq!(canonical_pair("G1", "G2"), canonical_pair("G2", "G1"));
    }

    #[test]
    fn canonical_pair_orders_byte_wise() {
        assert_eq!(canonical_pair("beta", "alpha"), ("alpha", "beta"));
        // Byte-wise compare, not lexicographic by locale: 'Z' < 'a'.
        assert_eq!(canonical_pair("alpha", "Zeta"), ("Zeta", "alpha"));
    }

    #[test]
    fn canonical_pair_equal_endpoints_unchanged() {
        assert_eq!(canonical_pair("G1", "G1"), ("G1", "G1"));
    }

    #[test]
    fn link_id_is_order_independent() {
        let (lo, hi) = canonical_pair("FAC|B", "FAC|A");
        let forward = link_id(lo, hi);
        let (lo, hi) = canonical_pair("FAC|A", "FAC|B");
        let reverse = link_id(lo, hi);
        assert_eq!(forward, reverse);
        assert_eq!(forward, "LNK|FAC|A|FAC|B");
    }

    #[test]
    fn facility_id_is_deterministic() {
        assert_eq!(facility_id("SYS-7"), "FAC|SYS-7");
        assert_eq!(facility_id("SYS-7"), facility_id("SYS-7"));
    }

    #[test]
    fn ensure_facility_creates_once() {
        let mut store = GateGraphStore::default();
        let registry = FactionRegistry::with_core_factions();
        let mut sys = system("SYS-1", Some("free-holds"));

        let first = store.ensure_facility(&mut sys, &registry).unwrap();
        let second = store.ensure_facility(&mut sys, &registry).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.facility_count(), 1);
        assert!(sys.has_gate);
    }

    #[test]
    fn ensure_facility_records_owner_and_faction() {
        let mut store = GateGraphStore::default();
        let registry = FactionRegistry::with_core_factions();
        let mut sys = system("SYS-1", Some("free-holds"));

        let id = store.ensure_facility(&mut sys, &registry).unwrap();
        let facility = store.facility(&id).unwrap();
        assert_eq!(facility.system_id, "SYS-1");
        assert_eq!(facility.faction, "free-holds");
        assert_eq!(facility.class, FacilityClass::Standard);
    }

    #[test]
    fn ensure_facility_without_faction_fails() {
        let mut store = GateGraphStore::default();
        let registry = FactionRegistry::with_core_factions();
        let mut sys = system("SYS-1", None);

        let result = store.ensure_facility(&mut sys, &registry);
        assert!(matches!(
            result,
            Err(GateStoreError::MissingGovernmentReference(id)) if id == "SYS-1"
        ));
        assert_eq!(store.facility_count(), 0);
        assert!(!sys.has_gate);
    }

    #[test]
    fn ensure_facility_with_unresolvable_faction_fails() {
        let mut store = GateGraphStore::default();
        let registry = FactionRegistry::with_core_factions();
        let mut sys = system("SYS-1", Some("outer-rim-cartel"));

        assert!(store.ensure_facility(&mut sys, &registry).is_err());
    }

    #[test]
    fn upsert_facility_rejects_blank_required_fields() {
        let mut store = GateGraphStore::default();

        let blank_id = GateFacility {
            id: "  ".to_string(),
            system_id: "SYS-1".to_string(),
            faction: "free-holds".to_string(),
            class: FacilityClass::Standard,
        };
        assert!(matches!(
            store.upsert_facility(blank_id),
            Err(GateStoreError::Validation("facility id"))
        ));

        let blank_faction = GateFacility {
            id: facility_id("SYS-1"),
            system_id: "SYS-1".to_string(),
            faction: String::new(),
            class: FacilityClass::Standard,
        };
        assert!(matches!(
            store.upsert_facility(blank_faction),
            Err(GateStoreError::Validation("governing faction"))
        ));

        assert_eq!(store.facility_count(), 0);
    }

    #[test]
    fn upsert_facility_replaces_full_row() {
        let mut store = store_with_facilities(&["SYS-1"]);
        let id = facility_id("SYS-1");

        store
            .upsert_facility(GateFacility {
                id: id.clone(),
                system_id: "SYS-1".to_string(),
                faction: "veyra-syndicate".to_string(),
                class: FacilityClass::Capital,
            })
            .unwrap();

        let facility = store.facility(&id).unwrap();
        assert_eq!(facility.faction, "veyra-syndicate");
        assert_eq!(facility.class, FacilityClass::Capital);
        assert_eq!(store.facility_count(), 1);
    }

    #[test]
    fn upsert_link_stores_canonical_endpoints() {
        let mut store = store_with_facilities(&["A", "B"]);
        let fa = facility_id("A");
        let fb = facility_id("B");

        let id = store
            .upsert_link(LinkDraft::between(&fb, &fa, LinkStatus::Open))
            .unwrap()
            .unwrap();

        let link = store.links_touching(&fa)[0];
        assert_eq!(link.id, id);
        assert_eq!(link.from, fa);
        assert_eq!(link.to, fb);
    }

    #[test]
    fn upsert_link_same_pair_either_order_is_one_row() {
        let mut store = store_with_facilities(&["A", "B"]);
        let fa = facility_id("A");
        let fb = facility_id("B");

        store
            .upsert_link(LinkDraft::between(&fa, &fb, LinkStatus::Open))
            .unwrap();
        store
            .upsert_link(LinkDraft::between(&fb, &fa, LinkStatus::Closed))
            .unwrap();

        assert_eq!(store.link_count(), 1);
        assert_eq!(store.links_touching(&fa)[0].status, LinkStatus::Closed);
    }

    #[test]
    fn upsert_link_blank_endpoint_is_skipped() {
        let mut store = store_with_facilities(&["A"]);
        let result = store
            .upsert_link(LinkDraft::between("", &facility_id("A"), LinkStatus::Open))
            .unwrap();
        assert!(result.is_none());
        assert_eq!(store.link_count(), 0);
    }

    #[test]
    fn upsert_link_unknown_facility_fails() {
        let mut store = store_with_facilities(&["A"]);
        let result =
            store.upsert_link(LinkDraft::between(&facility_id("A"), "FAC|Z", LinkStatus::Open));
        assert!(matches!(result, Err(GateStoreError::UnknownFacility(id)) if id == "FAC|Z"));
    }

    #[test]
    fn replace_links_removes_links_touching_either_endpoint() {
        let mut store = store_with_facilities(&["G1", "G2"]);
        let f1 = facility_id("G1");
        let f2 = facility_id("G2");
        store
            .upsert_link(LinkDraft::between(&f1, &f2, LinkStatus::Open))
            .unwrap();

        store.replace_links(&f1, Vec::new()).unwrap();

        assert!(store.links_touching(&f1).is_empty());
        assert!(store.links_touching(&f2).is_empty());
    }

    #[test]
    fn replace_links_keeps_unrelated_links() {
        let mut store = store_with_facilities(&["A", "B", "C"]);
        let fa = facility_id("A");
        let fb = facility_id("B");
        let fc = facility_id("C");
        store
            .upsert_link(LinkDraft::between(&fa, &fb, LinkStatus::Open))
            .unwrap();
        store
            .upsert_link(LinkDraft::between(&fb, &fc, LinkStatus::Open))
            .unwrap();

        store.replace_links(&fa, Vec::new()).unwrap();

        assert!(store.links_touching(&fa).is_empty());
        assert_eq!(store.links_touching(&fc).len(), 1);
    }

    #[test]
    fn replace_links_duplicate_pairs_collapse_last_write_wins() {
        let mut store = store_with_facilities(&["A", "B"]);
        let fa = facility_id("A");
        let fb = facility_id("B");

        let mut first = LinkDraft::between(&fa, &fb, LinkStatus::Open);
        first.toll = Some(10.0);
        let mut second = LinkDraft::between(&fb, &fa, LinkStatus::Restricted);
        second.toll = Some(25.0);

        store.replace_links(&fa, vec![first, second]).unwrap();

        let links = store.links_touching(&fa);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].status, LinkStatus::Restricted);
        assert_eq!(links[0].toll, Some(25.0));
    }

    #[test]
    fn replace_links_skips_blank_endpoints_silently() {
        let mut store = store_with_facilities(&["A", "B"]);
        let fa = facility_id("A");
        let fb = facility_id("B");

        let inserted = store
            .replace_links(
                &fa,
                vec![
                    LinkDraft::between(&fa, "", LinkStatus::Open),
                    LinkDraft::between(&fa, &fb, LinkStatus::Open),
                ],
            )
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(store.links_touching(&fa).len(), 1);
    }

    #[test]
    fn replace_links_unknown_target_facility_fails() {
        let mut store = store_with_facilities(&["A"]);
        assert!(matches!(
            store.replace_links("FAC|Z", Vec::new()),
            Err(GateStoreError::UnknownFacility(_))
        ));
    }

    #[test]
    fn replace_links_rejected_batch_leaves_prior_set_intact() {
        let mut store = store_with_facilities(&["A", "B", "C"]);
        let fa = facility_id("A");
        let fb = facility_id("B");
        let fc = facility_id("C");
        store
            .upsert_link(LinkDraft::between(&fa, &fb, LinkStatus::Open))
            .unwrap();
        store
            .upsert_link(LinkDraft::between(&fa, &fc, LinkStatus::Restricted))
            .unwrap();

        let before: Vec<GateLinkRecord> =
            store.links_touching(&fa).into_iter().cloned().collect();

        let result = store.replace_links(
            &fa,
            vec![
                LinkDraft::between(&fa, &fb, LinkStatus::Closed),
                LinkDraft::between(&fa, "FAC|GHOST", LinkStatus::Open),
            ],
        );

        assert!(matches!(result, Err(GateStoreError::ReplaceRejected(_))));
        let after: Vec<GateLinkRecord> =
            store.links_touching(&fa).into_iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn replace_links_returns_inserted_count() {
        let mut store = store_with_facilities(&["A", "B", "C"]);
        let fa = facility_id("A");

        let inserted = store
            .replace_links(
                &fa,
                vec![
                    LinkDraft::between(&fa, &facility_id("B"), LinkStatus::Open),
                    LinkDraft::between(&fa, &facility_id("C"), LinkStatus::Open),
                ],
            )
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(store.link_count(), 2);
    }

    #[test]
    fn links_touching_is_sorted_by_id() {
        let mut store = store_with_facilities(&["A", "B", "C"]);
        let fa = facility_id("A");
        store
            .upsert_link(LinkDraft::between(&fa, &facility_id("C"), LinkStatus::Open))
            .unwrap();
        store
            .upsert_link(LinkDraft::between(&fa, &facility_id("B"), LinkStatus::Open))
            .unwrap();

        let links = store.links_touching(&fa);
        assert_eq!(links.len(), 2);
        assert!(links[0].id < links[1].id);
    }

    #[test]
    fn validation_failure_message_names_field() {
        let error = GateStoreError::Validation("governing faction");
        assert!(error.to_string().contains("governing faction"));
    }
}
