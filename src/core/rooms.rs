//! Room registry and capacities
//!
//! The workbook has no room table: a room exists because someone sits in it,
//! because it has a capacity entry, or because a marker row (`STORAGE` or
//! `PLACEHOLDER`) keeps it alive while empty.

use crate::core::occupancy::compute_occupancy;
use crate::core::occupants::OccupantRegistry;
use crate::error::{AllocError, AllocResult};
use crate::types::{Occupant, OccupantStatus, RoomKey, RoomKind, RoomOccupancy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const STORAGE_MARKER: &str = "STORAGE";
pub const PLACEHOLDER_MARKER: &str = "PLACEHOLDER";

/// Room kind encoded by a marker row name, if the name is a marker
pub fn marker_kind(name: &str) -> Option<RoomKind> {
    let upper = name.to_uppercase();
    if upper.contains(STORAGE_MARKER) {
        Some(RoomKind::Storage)
    } else if upper.contains(PLACEHOLDER_MARKER) {
        Some(RoomKind::Regular)
    } else {
        None
    }
}

/// `Building:Office` → maximum occupants, as stored in the capacity file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capacities(BTreeMap<String, u32>);

impl Capacities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RoomKey) -> Option<u32> {
        self.0.get(&key.to_string()).copied()
    }

    pub fn set(&mut self, key: &RoomKey, capacity: u32) {
        self.0.insert(key.to_string(), capacity);
    }

    pub fn remove(&mut self, key: &RoomKey) -> Option<u32> {
        self.0.remove(&key.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rooms named by the capacity keys; malformed keys are skipped
    pub fn rooms(&self) -> impl Iterator<Item = RoomKey> + '_ {
        self.0.keys().filter_map(|k| match RoomKey::parse(k) {
            Ok(key) => Some(key),
            Err(_) => {
                tracing::warn!(key = %k, "ignoring malformed capacity key");
                None
            }
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u32)> {
        self.0.iter()
    }
}

impl FromIterator<(RoomKey, u32)> for Capacities {
    fn from_iter<I: IntoIterator<Item = (RoomKey, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Requested changes to a room
#[derive(Debug, Clone, Deserialize)]
pub struct RoomUpdate {
    pub building: String,
    pub office: String,
    pub capacity: u32,
    #[serde(default)]
    pub kind: RoomKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoomUpdateOutcome {
    /// Occupant records re-pointed at the new room key
    pub moved: usize,
    /// Current occupants whose location was cleared because the room became storage
    pub unassigned: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RoomManager {
    registered: BTreeMap<RoomKey, RoomKind>,
    capacities: Capacities,
    default_capacity: u32,
}

impl RoomManager {
    pub fn new(capacities: Capacities, default_capacity: u32) -> Self {
        Self {
            registered: BTreeMap::new(),
            capacities,
            default_capacity,
        }
    }

    /// Record a room seen through a marker row
    pub fn register(&mut self, key: RoomKey, kind: RoomKind) {
        let entry = self.registered.entry(key).or_insert(kind);
        if kind == RoomKind::Storage {
            *entry = RoomKind::Storage;
        }
    }

    pub fn capacities(&self) -> &Capacities {
        &self.capacities
    }

    pub fn default_capacity(&self) -> u32 {
        self.default_capacity
    }

    pub fn capacity(&self, key: &RoomKey) -> u32 {
        self.capacities.get(key).unwrap_or(self.default_capacity)
    }

    pub fn set_capacity(&mut self, key: &RoomKey, capacity: u32) {
        tracing::info!(room = %key, capacity, "capacity updated");
        self.capacities.set(key, capacity);
    }

    pub fn kind(&self, key: &RoomKey) -> RoomKind {
        self.registered.get(key).copied().unwrap_or_default()
    }

    pub fn is_storage(&self, key: &RoomKey) -> bool {
        self.kind(key) == RoomKind::Storage
    }

    /// Registered rooms ∪ capacity entries ∪ rooms of current occupants
    pub fn known_rooms(&self, occupants: &OccupantRegistry) -> BTreeSet<RoomKey> {
        let mut rooms: BTreeSet<RoomKey> = self.registered.keys().cloned().collect();
        rooms.extend(self.capacities.rooms());
        rooms.extend(
            occupants
                .occupants(OccupantStatus::Current)
                .into_iter()
                .filter_map(Occupant::room),
        );
        rooms
    }

    pub fn add_room(
        &mut self,
        key: RoomKey,
        capacity: u32,
        kind: RoomKind,
        occupants: &OccupantRegistry,
    ) -> AllocResult<()> {
        if key.building.is_empty() || key.office.is_empty() {
            return Err(AllocError::Validation(
                "Building and office are required".to_string(),
            ));
        }
        if self.known_rooms(occupants).contains(&key) {
            return Err(AllocError::Conflict(format!("Room {} already exists", key)));
        }
        tracing::info!(room = %key, capacity, ?kind, "room added");
        self.capacities.set(&key, capacity);
        self.registered.insert(key, kind);
        Ok(())
    }

    /// Delete a room together with every occupant record pointing at it
    pub fn delete_room(
        &mut self,
        key: &RoomKey,
        occupants: &mut OccupantRegistry,
    ) -> AllocResult<usize> {
        if !self.known_rooms(occupants).contains(key) {
            return Err(AllocError::NotFound(format!("Room {}", key)));
        }
        self.capacities.remove(key);
        self.registered.remove(key);
        let removed = occupants.remove_room(key);
        tracing::info!(room = %key, removed, "room deleted");
        Ok(removed)
    }

    /// Rename, resize or change the type of a room, carrying its occupants along
    pub fn update_room(
        &mut self,
        key: &RoomKey,
        update: RoomUpdate,
        occupants: &mut OccupantRegistry,
    ) -> AllocResult<RoomUpdateOutcome> {
        let known = self.known_rooms(occupants);
        if !known.contains(key) {
            return Err(AllocError::NotFound(format!("Room {}", key)));
        }
        let new_key = RoomKey::new(&update.building, &update.office);
        if new_key.building.is_empty() || new_key.office.is_empty() {
            return Err(AllocError::Validation(
                "Building and office are required".to_string(),
            ));
        }
        if new_key != *key && known.contains(&new_key) {
            return Err(AllocError::Conflict(format!("Room {} already exists", new_key)));
        }

        self.capacities.remove(key);
        self.capacities.set(&new_key, update.capacity);
        self.registered.remove(key);

        let mut outcome = RoomUpdateOutcome {
            moved: occupants.relocate(key, &new_key),
            unassigned: Vec::new(),
        };
        if update.kind == RoomKind::Storage {
            outcome.unassigned = occupants.clear_room(&new_key, OccupantStatus::Current);
        }
        self.registered.insert(new_key.clone(), update.kind);

        tracing::info!(
            from = %key,
            to = %new_key,
            moved = outcome.moved,
            unassigned = outcome.unassigned.len(),
            "room updated"
        );
        Ok(outcome)
    }

    /// Marker rows that keep empty and storage rooms alive in the workbook
    pub fn marker_rows(&self, occupants: &OccupantRegistry) -> Vec<Occupant> {
        self.registered
            .iter()
            .filter(|(key, kind)| {
                **kind == RoomKind::Storage
                    || occupants.in_room(key, OccupantStatus::Current).is_empty()
            })
            .map(|(key, kind)| {
                let name = match kind {
                    RoomKind::Storage => STORAGE_MARKER,
                    RoomKind::Regular => PLACEHOLDER_MARKER,
                };
                Occupant::new(name, OccupantStatus::Current).with_room(&key.building, &key.office)
            })
            .collect()
    }

    /// Seed capacities from current occupancy: storage gets 0, every other
    /// room the larger of its headcount and 2.
    pub fn initialize_capacities(&mut self, occupancy: &[RoomOccupancy]) -> usize {
        for room in occupancy {
            let capacity = if room.is_storage {
                0
            } else {
                room.occupants.max(crate::config::DEFAULT_ROOM_CAPACITY)
            };
            self.capacities.set(&room.key(), capacity);
        }
        tracing::info!(rooms = occupancy.len(), "initialized room capacities");
        occupancy.len()
    }

    pub fn occupancy(&self, occupants: &OccupantRegistry) -> Vec<RoomOccupancy> {
        compute_occupancy(self, occupants)
    }
}
