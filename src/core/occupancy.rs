//! Room occupancy computation
//!
//! Only *current* occupants count towards a room's headcount. Upcoming and
//! past occupants keep their room for reference but never fill it.

use crate::core::occupants::OccupantRegistry;
use crate::core::rooms::RoomManager;
use crate::error::{AllocError, AllocResult};
use crate::types::{round1, OccupancySummary, OccupantStatus, RoomKey, RoomOccupancy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Floor of an office number: the text before the first `.`
///
/// "3.17" is on floor "3"; an office without a dot is on floor "Unknown".
pub fn extract_floor(office: &str) -> String {
    match office.trim().split_once('.') {
        Some((floor, _)) => floor.to_string(),
        None => "Unknown".to_string(),
    }
}

/// One occupancy row per known room, sorted by building, floor, office
pub fn compute_occupancy(rooms: &RoomManager, occupants: &OccupantRegistry) -> Vec<RoomOccupancy> {
    let mut counts: BTreeMap<RoomKey, u32> = BTreeMap::new();
    for occupant in occupants.occupants(OccupantStatus::Current) {
        if let Some(key) = occupant.room() {
            *counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut rows: Vec<RoomOccupancy> = rooms
        .known_rooms(occupants)
        .into_iter()
        .map(|key| {
            let count = counts.get(&key).copied().unwrap_or(0);
            RoomOccupancy::new(&key, count, rooms.capacity(&key), rooms.is_storage(&key))
        })
        .collect();
    rows.sort_by(|a, b| {
        (&a.building, &a.floor, &a.office).cmp(&(&b.building, &b.floor, &b.office))
    });
    rows
}

pub fn find_room<'a>(rows: &'a [RoomOccupancy], key: &RoomKey) -> Option<&'a RoomOccupancy> {
    rows.iter()
        .find(|r| r.building == key.building && r.office == key.office)
}

fn summarize<'a>(
    building: &str,
    floor: Option<&str>,
    rows: impl Iterator<Item = &'a RoomOccupancy>,
) -> OccupancySummary {
    let mut summary = OccupancySummary {
        building: building.to_string(),
        floor: floor.map(str::to_string),
        room_count: 0,
        occupants: 0,
        max_capacity: 0,
        remaining: 0,
        occupancy_rate: 0.0,
    };
    for row in rows {
        summary.room_count += 1;
        summary.occupants += row.occupants;
        summary.max_capacity += row.max_capacity;
        summary.remaining += row.remaining;
    }
    if summary.max_capacity > 0 {
        summary.occupancy_rate =
            round1(summary.occupants as f64 / summary.max_capacity as f64 * 100.0);
    }
    summary
}

/// Totals per building
pub fn building_summary(rows: &[RoomOccupancy]) -> Vec<OccupancySummary> {
    let buildings: BTreeSet<&str> = rows.iter().map(|r| r.building.as_str()).collect();
    buildings
        .into_iter()
        .map(|b| summarize(b, None, rows.iter().filter(|r| r.building == b)))
        .collect()
}

/// Totals per building and floor, optionally limited to one building
pub fn floor_summary(rows: &[RoomOccupancy], building: Option<&str>) -> Vec<OccupancySummary> {
    let groups: BTreeSet<(&str, &str)> = rows
        .iter()
        .filter(|r| building.map_or(true, |b| b == "All" || r.building == b))
        .map(|r| (r.building.as_str(), r.floor.as_str()))
        .collect();
    groups
        .into_iter()
        .map(|(b, f)| {
            summarize(
                b,
                Some(f),
                rows.iter().filter(|r| r.building == b && r.floor == f),
            )
        })
        .collect()
}

//==============================================================================
// Filtering
//==============================================================================

/// Availability class used when browsing rooms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    Vacant,
    HasSpace,
    Full,
    Overfilled,
    Storage,
}

impl Availability {
    pub const ALL: [Availability; 5] = [
        Availability::Vacant,
        Availability::HasSpace,
        Availability::Full,
        Availability::Overfilled,
        Availability::Storage,
    ];

    /// Whether the room falls into this class. Only `Storage` matches storage rooms.
    pub fn matches(&self, room: &RoomOccupancy) -> bool {
        if room.is_storage {
            return *self == Availability::Storage;
        }
        match self {
            Availability::Vacant => room.occupants == 0,
            Availability::HasSpace => room.occupants > 0 && room.remaining > 0,
            Availability::Full => room.occupants > 0 && room.remaining == 0,
            Availability::Overfilled => room.remaining < 0,
            Availability::Storage => false,
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Availability::Vacant => "Vacant",
            Availability::HasSpace => "Has Space",
            Availability::Full => "Full",
            Availability::Overfilled => "Overfilled",
            Availability::Storage => "Storage",
        };
        f.write_str(name)
    }
}

impl FromStr for Availability {
    type Err = AllocError;

    fn from_str(s: &str) -> AllocResult<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "vacant" => Ok(Availability::Vacant),
            "hasspace" | "space" => Ok(Availability::HasSpace),
            "full" => Ok(Availability::Full),
            "overfilled" => Ok(Availability::Overfilled),
            "storage" => Ok(Availability::Storage),
            _ => Err(AllocError::Validation(format!(
                "Unknown availability '{}'. Expected one of: vacant, has-space, full, overfilled, storage",
                s
            ))),
        }
    }
}

/// Room browser filter. Availability classes are OR-combined and default to
/// vacant plus has-space.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoomFilter {
    pub building: Option<String>,
    pub floor: Option<String>,
    pub availability: Vec<Availability>,
}

impl Default for RoomFilter {
    fn default() -> Self {
        Self::assignable()
    }
}

impl RoomFilter {
    /// No availability classes given means the default pair
    pub fn new(
        building: Option<String>,
        floor: Option<String>,
        availability: Vec<Availability>,
    ) -> Self {
        let availability = if availability.is_empty() {
            Self::assignable().availability
        } else {
            availability
        };
        Self {
            building,
            floor,
            availability,
        }
    }

    /// Rooms a new occupant could move into: vacant or with space left
    pub fn assignable() -> Self {
        Self {
            building: None,
            floor: None,
            availability: vec![Availability::Vacant, Availability::HasSpace],
        }
    }

    pub fn everything() -> Self {
        Self {
            building: None,
            floor: None,
            availability: Availability::ALL.to_vec(),
        }
    }

    pub fn matches(&self, room: &RoomOccupancy) -> bool {
        let building_ok = match self.building.as_deref() {
            None | Some("All") => true,
            Some(b) => room.building == b,
        };
        let floor_ok = match self.floor.as_deref() {
            None | Some("All") => true,
            Some(f) => room.floor == f,
        };
        let availability_ok = self.availability.iter().any(|a| a.matches(room));
        building_ok && floor_ok && availability_ok
    }
}

/// Filtered rooms, ordered by building, floor, then most space left first
pub fn filter_rooms<'a>(rows: &'a [RoomOccupancy], filter: &RoomFilter) -> Vec<&'a RoomOccupancy> {
    let mut matched: Vec<&RoomOccupancy> = rows.iter().filter(|r| filter.matches(r)).collect();
    matched.sort_by(|a, b| {
        (&a.building, &a.floor)
            .cmp(&(&b.building, &b.floor))
            .then(b.remaining.cmp(&a.remaining))
    });
    matched
}

//==============================================================================
// Suggestions
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSuggestion {
    pub building: String,
    pub office: String,
    pub label: String,
    pub remaining: i64,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Rooms a new occupant could be placed in, best first.
///
/// Current occupants get the emptiest rooms by percentage; upcoming
/// occupants get the rooms with the most free places. Storage rooms are
/// never suggested, full and overfilled rooms still are.
pub fn suggest_rooms(rows: &[RoomOccupancy], status: OccupantStatus) -> Vec<RoomSuggestion> {
    let mut candidates: Vec<&RoomOccupancy> = rows.iter().filter(|r| !r.is_storage).collect();
    match status {
        OccupantStatus::Upcoming => candidates.sort_by(|a, b| b.remaining.cmp(&a.remaining)),
        _ => candidates.sort_by(|a, b| a.percentage.total_cmp(&b.percentage)),
    }

    candidates
        .into_iter()
        .map(|room| {
            let label = match status {
                OccupantStatus::Upcoming => upcoming_label(room),
                _ => current_label(room),
            };
            let warning = if room.percentage >= 100.0 || room.remaining < 0 {
                Some("This room is at or over capacity".to_string())
            } else if room.percentage >= 75.0 {
                Some(format!("This room is at {}% capacity", room.percentage))
            } else {
                None
            };
            RoomSuggestion {
                building: room.building.clone(),
                office: room.office.clone(),
                label: format!("{} - {} [{}]", room.building, room.office, label),
                remaining: room.remaining,
                percentage: room.percentage,
                warning,
            }
        })
        .collect()
}

fn current_label(room: &RoomOccupancy) -> String {
    if room.occupants == 0 {
        "Vacant".to_string()
    } else {
        format!(
            "{}/{} occupants ({}%)",
            room.occupants, room.max_capacity, room.percentage
        )
    }
}

fn upcoming_label(room: &RoomOccupancy) -> String {
    if room.remaining < 0 {
        format!(
            "Overfilled ({}/{}, {} over capacity)",
            room.occupants,
            room.max_capacity,
            room.remaining.abs()
        )
    } else if room.occupants == 0 {
        format!("Vacant (0/{})", room.max_capacity)
    } else {
        format!(
            "Occupied ({}/{}, {} available)",
            room.occupants, room.max_capacity, room.remaining
        )
    }
}

/// Status sentence shown on a room card
pub fn room_card_text(room: &RoomOccupancy) -> String {
    if room.is_storage {
        "Storage Room".to_string()
    } else if room.occupants == 0 {
        format!("Vacant ({} available)", room.max_capacity)
    } else if room.remaining < 0 {
        format!("Overfilled! ({} over capacity)", room.remaining.abs())
    } else if room.remaining > 0 {
        format!("Has Space ({} available)", room.remaining)
    } else {
        format!("Full ({}/{})", room.occupants, room.max_capacity)
    }
}
