use crate::error::{AllocError, AllocResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

//==============================================================================
// Occupants
//==============================================================================

/// Which sheet of the workbook an occupant lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OccupantStatus {
    Current,
    Upcoming,
    Past,
}

impl OccupantStatus {
    pub const ALL: [OccupantStatus; 3] = [
        OccupantStatus::Current,
        OccupantStatus::Upcoming,
        OccupantStatus::Past,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OccupantStatus::Current => "Current",
            OccupantStatus::Upcoming => "Upcoming",
            OccupantStatus::Past => "Past",
        }
    }

    /// Lowercase keyword used to recognise the sheet by name
    pub fn sheet_keyword(&self) -> &'static str {
        match self {
            OccupantStatus::Current => "current",
            OccupantStatus::Upcoming => "upcoming",
            OccupantStatus::Past => "past",
        }
    }
}

impl fmt::Display for OccupantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OccupantStatus {
    type Err = AllocError;

    fn from_str(s: &str) -> AllocResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "current" | "current occupants" => Ok(OccupantStatus::Current),
            "upcoming" | "upcoming occupants" => Ok(OccupantStatus::Upcoming),
            "past" | "past occupants" => Ok(OccupantStatus::Past),
            other => Err(AllocError::Validation(format!(
                "Unknown occupant status '{}'. Expected Current, Upcoming or Past",
                other
            ))),
        }
    }
}

/// A person on one of the three occupant lists.
///
/// Blank `building` or `office` means the occupant has no room yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occupant {
    pub name: String,
    pub status: OccupantStatus,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub office: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_arrival: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Spreadsheet columns this tool does not interpret, kept for round trips
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Occupant {
    pub fn new(name: impl Into<String>, status: OccupantStatus) -> Self {
        Self {
            name: name.into(),
            status,
            email: String::new(),
            position: String::new(),
            building: String::new(),
            office: String::new(),
            planned_arrival: None,
            end_date: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_room(mut self, building: impl Into<String>, office: impl Into<String>) -> Self {
        self.building = building.into().trim().to_string();
        self.office = office.into().trim().to_string();
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn is_assigned(&self) -> bool {
        !self.building.trim().is_empty() && !self.office.trim().is_empty()
    }

    /// The occupant's room, if both parts of the location are filled in
    pub fn room(&self) -> Option<RoomKey> {
        if self.is_assigned() {
            Some(RoomKey::new(&self.building, &self.office))
        } else {
            None
        }
    }

    pub fn is_in(&self, key: &RoomKey) -> bool {
        self.building.trim() == key.building && self.office.trim() == key.office
    }

    /// Case-insensitive match against name, position and email
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self.position.to_lowercase().contains(&term)
            || self.email.to_lowercase().contains(&term)
    }
}

//==============================================================================
// Rooms
//==============================================================================

/// Identifies a room by building and office number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomKey {
    pub building: String,
    pub office: String,
}

impl RoomKey {
    pub fn new(building: &str, office: &str) -> Self {
        Self {
            building: building.trim().to_string(),
            office: office.trim().to_string(),
        }
    }

    /// Parse the `Building:Office` form used as the capacity file key
    pub fn parse(key: &str) -> AllocResult<Self> {
        let (building, office) = key.split_once(':').ok_or_else(|| {
            AllocError::Validation(format!(
                "Invalid room key '{}'. Expected Building:Office",
                key
            ))
        })?;
        let key = Self::new(building, office);
        if key.building.is_empty() || key.office.is_empty() {
            return Err(AllocError::Validation(format!(
                "Invalid room key '{}': building and office are required",
                key
            )));
        }
        Ok(key)
    }

    pub fn floor(&self) -> String {
        crate::core::extract_floor(&self.office)
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.building, self.office)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    #[default]
    Regular,
    Storage,
}

impl FromStr for RoomKind {
    type Err = AllocError;

    fn from_str(s: &str) -> AllocResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "regular" | "office" => Ok(RoomKind::Regular),
            "storage" => Ok(RoomKind::Storage),
            other => Err(AllocError::Validation(format!(
                "Unknown room type '{}'. Expected Regular or Storage",
                other
            ))),
        }
    }
}

//==============================================================================
// Capacity status
//==============================================================================

/// Derived occupancy label of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityStatus {
    Vacant,
    Low,
    Medium,
    High,
    Full,
    Overfilled,
    Storage,
}

impl CapacityStatus {
    /// Display order used by utilization reports
    pub const ORDER: [CapacityStatus; 7] = [
        CapacityStatus::Vacant,
        CapacityStatus::Low,
        CapacityStatus::Medium,
        CapacityStatus::High,
        CapacityStatus::Full,
        CapacityStatus::Overfilled,
        CapacityStatus::Storage,
    ];

    /// Storage beats everything, then vacancy, then overfill, then the
    /// percentage bands 25/50/75.
    pub fn derive(is_storage: bool, occupants: u32, max_capacity: u32) -> Self {
        if is_storage {
            return CapacityStatus::Storage;
        }
        if occupants == 0 {
            return CapacityStatus::Vacant;
        }
        if occupants > max_capacity {
            return CapacityStatus::Overfilled;
        }
        let percentage = percentage(occupants, max_capacity);
        if percentage <= 25.0 {
            CapacityStatus::Low
        } else if percentage <= 50.0 {
            CapacityStatus::Medium
        } else if percentage <= 75.0 {
            CapacityStatus::High
        } else {
            CapacityStatus::Full
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityStatus::Vacant => "vacant",
            CapacityStatus::Low => "low",
            CapacityStatus::Medium => "medium",
            CapacityStatus::High => "high",
            CapacityStatus::Full => "full",
            CapacityStatus::Overfilled => "overfilled",
            CapacityStatus::Storage => "storage",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CapacityStatus::Vacant => "Vacant",
            CapacityStatus::Low => "Low (1-25%)",
            CapacityStatus::Medium => "Medium (26-50%)",
            CapacityStatus::High => "High (51-75%)",
            CapacityStatus::Full => "Full (76-100%)",
            CapacityStatus::Overfilled => "Overfilled (>100%)",
            CapacityStatus::Storage => "Storage",
        }
    }

    /// Background and border colours for room cards
    pub fn colors(&self) -> (&'static str, &'static str) {
        match self {
            CapacityStatus::Vacant => ("#d4edda", "#28a745"),
            CapacityStatus::Low => ("#e6f7e1", "#5cb85c"),
            CapacityStatus::Medium => ("#fff3cd", "#ffc107"),
            CapacityStatus::High => ("#ffe5d9", "#fd7e14"),
            CapacityStatus::Full => ("#f8d7da", "#dc3545"),
            CapacityStatus::Overfilled => ("#f5c6cb", "#b21f2d"),
            CapacityStatus::Storage => ("#e2e3e5", "#6c757d"),
        }
    }
}

impl fmt::Display for CapacityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapacityStatus {
    type Err = AllocError;

    fn from_str(s: &str) -> AllocResult<Self> {
        CapacityStatus::ORDER
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| AllocError::Validation(format!("Unknown capacity status '{}'", s)))
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Occupants as a percentage of capacity, one decimal; 0 for zero capacity
pub fn percentage(occupants: u32, max_capacity: u32) -> f64 {
    if max_capacity == 0 {
        return 0.0;
    }
    round1(occupants as f64 / max_capacity as f64 * 100.0)
}

//==============================================================================
// Occupancy rows
//==============================================================================

/// One row of the room occupancy table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomOccupancy {
    pub building: String,
    pub office: String,
    pub floor: String,
    pub occupants: u32,
    pub is_storage: bool,
    pub max_capacity: u32,
    /// Negative when the room is overfilled
    pub remaining: i64,
    pub percentage: f64,
    pub status: CapacityStatus,
}

impl RoomOccupancy {
    pub fn new(key: &RoomKey, occupants: u32, max_capacity: u32, is_storage: bool) -> Self {
        Self {
            building: key.building.clone(),
            office: key.office.clone(),
            floor: key.floor(),
            occupants,
            is_storage,
            max_capacity,
            remaining: max_capacity as i64 - occupants as i64,
            percentage: percentage(occupants, max_capacity),
            status: CapacityStatus::derive(is_storage, occupants, max_capacity),
        }
    }

    pub fn key(&self) -> RoomKey {
        RoomKey::new(&self.building, &self.office)
    }
}

/// Aggregated occupancy of a building or of one floor of a building
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancySummary {
    pub building: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    pub room_count: usize,
    pub occupants: u32,
    pub max_capacity: u32,
    pub remaining: i64,
    pub occupancy_rate: f64,
}
