//! Occupancy and occupant reports
//!
//! Every report is computed from the occupant registry plus the occupancy
//! table. Marker rows never reach this module: they are room registrations,
//! not occupants.

pub mod export;

use crate::core::occupancy::{building_summary, floor_summary};
use crate::core::OccupantRegistry;
use crate::error::{AllocError, AllocResult};
use crate::types::{
    CapacityStatus, OccupancySummary, Occupant, OccupantStatus, RoomKey, RoomOccupancy,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub use export::{export_csv, export_excel_report, CsvExport, ExcelReport};

/// Positions shown individually before the rest is grouped as "Other"
const MAX_POSITIONS: usize = 8;

pub const NOT_SPECIFIED: &str = "Not Specified";

/// `"x.y%"`, or `"0%"` when there is no capacity
pub fn format_rate(occupants: u32, capacity: u32) -> String {
    if capacity == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", occupants as f64 / capacity as f64 * 100.0)
}

//==============================================================================
// Summary
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_buildings: usize,
    pub total_rooms: usize,
    pub current_occupants: usize,
    pub upcoming_occupants: usize,
    pub past_occupants: usize,
    pub total_capacity: u32,
    pub currently_occupied: u32,
    pub available_spaces: i64,
    pub occupancy_rate: String,
}

impl SummaryMetrics {
    pub fn compute(occupants: &OccupantRegistry, occupancy: &[RoomOccupancy]) -> Self {
        let mut buildings: BTreeSet<String> = occupants.unique_buildings().into_iter().collect();
        buildings.extend(occupancy.iter().map(|r| r.building.clone()));

        let total_capacity: u32 = occupancy.iter().map(|r| r.max_capacity).sum();
        let currently_occupied: u32 = occupancy.iter().map(|r| r.occupants).sum();
        Self {
            total_buildings: buildings.len(),
            total_rooms: occupancy.len(),
            current_occupants: occupants.count(OccupantStatus::Current),
            upcoming_occupants: occupants.count(OccupantStatus::Upcoming),
            past_occupants: occupants.count(OccupantStatus::Past),
            total_capacity,
            currently_occupied,
            available_spaces: occupancy.iter().map(|r| r.remaining).sum(),
            occupancy_rate: format_rate(currently_occupied, total_capacity),
        }
    }

    /// Label / value pairs in display order
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Buildings", self.total_buildings.to_string()),
            ("Total Rooms", self.total_rooms.to_string()),
            ("Current Occupants", self.current_occupants.to_string()),
            ("Upcoming Occupants", self.upcoming_occupants.to_string()),
            ("Past Occupants", self.past_occupants.to_string()),
            ("Total Capacity", self.total_capacity.to_string()),
            ("Currently Occupied", self.currently_occupied.to_string()),
            ("Available Spaces", self.available_spaces.to_string()),
            ("Occupancy Rate", self.occupancy_rate.clone()),
        ]
    }
}

/// Number of occupants on each list, in status order
pub fn status_distribution(occupants: &OccupantRegistry) -> Vec<CountEntry> {
    OccupantStatus::ALL
        .iter()
        .map(|s| CountEntry {
            name: s.to_string(),
            count: occupants.count(*s),
        })
        .collect()
}

//==============================================================================
// Building report
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountEntry {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingReport {
    pub summary: OccupancySummary,
    pub occupancy_rate: String,
    /// Numeric floors ascending, then the rest
    pub floors: Vec<OccupancySummary>,
    pub rooms: Vec<RoomOccupancy>,
    /// Current occupants sorted by office, then name
    pub occupants: Vec<Occupant>,
    pub positions: Vec<CountEntry>,
    pub upcoming_count: usize,
}

pub fn building_report(
    occupants: &OccupantRegistry,
    occupancy: &[RoomOccupancy],
    building: &str,
) -> AllocResult<BuildingReport> {
    let rooms: Vec<RoomOccupancy> = occupancy
        .iter()
        .filter(|r| r.building == building)
        .cloned()
        .collect();
    let summary = building_summary(&rooms)
        .into_iter()
        .next()
        .ok_or_else(|| AllocError::NotFound(format!("No rooms in building '{}'", building)))?;

    let mut floors = floor_summary(&rooms, Some(building));
    floors.sort_by(|a, b| floor_order(a.floor.as_deref()).total_cmp(&floor_order(b.floor.as_deref())));

    let mut current: Vec<Occupant> = occupants
        .filter_by_building(OccupantStatus::Current, Some(building))
        .into_iter()
        .cloned()
        .collect();
    current.sort_by(|a, b| (&a.office, &a.name).cmp(&(&b.office, &b.name)));

    Ok(BuildingReport {
        occupancy_rate: format_rate(summary.occupants, summary.max_capacity),
        summary,
        floors,
        rooms,
        positions: position_counts(current.iter()),
        occupants: current,
        upcoming_count: occupants
            .filter_by_building(OccupantStatus::Upcoming, Some(building))
            .len(),
    })
}

fn floor_order(floor: Option<&str>) -> f64 {
    floor
        .and_then(|f| f.parse::<f64>().ok())
        .unwrap_or(f64::INFINITY)
}

//==============================================================================
// Utilization report
//==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: CapacityStatus,
    pub label: &'static str,
    pub count: usize,
}

/// A room together with the people in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomDetail {
    pub room: RoomOccupancy,
    /// "Name (Position)"
    pub occupants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationReport {
    pub status_counts: Vec<StatusCount>,
    pub overfilled: Vec<RoomDetail>,
    pub full: Vec<RoomDetail>,
    pub vacant: Vec<RoomOccupancy>,
    pub vacant_by_building: Vec<CountEntry>,
    pub rooms: Vec<RoomOccupancy>,
}

pub fn utilization_report(
    occupants: &OccupantRegistry,
    occupancy: &[RoomOccupancy],
) -> UtilizationReport {
    let with_status = |status: CapacityStatus| {
        occupancy
            .iter()
            .filter(move |r| r.status == status)
            .cloned()
    };
    let detail = |room: RoomOccupancy| {
        let key = RoomKey::new(&room.building, &room.office);
        let names = occupants
            .in_room(&key, OccupantStatus::Current)
            .into_iter()
            .map(|o| {
                let position = if o.position.trim().is_empty() {
                    "No position"
                } else {
                    o.position.as_str()
                };
                format!("{} ({})", o.name, position)
            })
            .collect();
        RoomDetail {
            room,
            occupants: names,
        }
    };

    let vacant: Vec<RoomOccupancy> = with_status(CapacityStatus::Vacant).collect();
    let vacant_by_building = count_by(vacant.iter().map(|r| r.building.as_str()));

    UtilizationReport {
        status_counts: CapacityStatus::ORDER
            .iter()
            .map(|s| StatusCount {
                status: *s,
                label: s.label(),
                count: occupancy.iter().filter(|r| r.status == *s).count(),
            })
            .filter(|c| c.count > 0)
            .collect(),
        overfilled: with_status(CapacityStatus::Overfilled).map(detail).collect(),
        full: with_status(CapacityStatus::Full).map(detail).collect(),
        vacant,
        vacant_by_building,
        rooms: occupancy.to_vec(),
    }
}

//==============================================================================
// Occupant report
//==============================================================================

/// Building × position head counts of current occupants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crosstab {
    pub positions: Vec<String>,
    pub rows: Vec<CrosstabRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosstabRow {
    pub building: String,
    pub counts: Vec<usize>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupantReport {
    pub status_distribution: Vec<CountEntry>,
    pub current_by_building: Vec<CountEntry>,
    pub upcoming: Vec<Occupant>,
    pub upcoming_by_building: Vec<CountEntry>,
    pub past_count: usize,
    /// `YYYY-MM` → departures, ascending
    pub departures_by_month: Vec<CountEntry>,
    pub positions: Vec<CountEntry>,
    pub crosstab: Crosstab,
}

pub fn occupant_report(occupants: &OccupantRegistry) -> OccupantReport {
    let current = occupants.occupants(OccupantStatus::Current);
    let mut upcoming: Vec<Occupant> = occupants
        .occupants(OccupantStatus::Upcoming)
        .into_iter()
        .cloned()
        .collect();
    upcoming.sort_by(|a, b| {
        (a.planned_arrival, &a.name).cmp(&(b.planned_arrival, &b.name))
    });
    let past = occupants.occupants(OccupantStatus::Past);

    let mut departures: BTreeMap<String, usize> = BTreeMap::new();
    for occupant in &past {
        if let Some(end) = occupant.end_date {
            *departures.entry(end.format("%Y-%m").to_string()).or_insert(0) += 1;
        }
    }

    OccupantReport {
        status_distribution: status_distribution(occupants),
        current_by_building: count_by(current.iter().map(|o| building_label(o))),
        upcoming_by_building: count_by(upcoming.iter().map(building_label)),
        upcoming,
        past_count: past.len(),
        departures_by_month: departures
            .into_iter()
            .map(|(name, count)| CountEntry { name, count })
            .collect(),
        positions: position_counts(current.iter().copied()),
        crosstab: crosstab(&current),
    }
}

fn building_label(occupant: &Occupant) -> &str {
    if occupant.building.trim().is_empty() {
        "Unassigned"
    } else {
        occupant.building.as_str()
    }
}

fn position_label(occupant: &Occupant) -> &str {
    if occupant.position.trim().is_empty() {
        NOT_SPECIFIED
    } else {
        occupant.position.trim()
    }
}

/// Counts sorted by name
fn count_by<'a>(values: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(name, count)| CountEntry {
            name: name.to_string(),
            count,
        })
        .collect()
}

/// Position counts, largest first; beyond eight positions the tail is
/// folded into "Other"
pub fn position_counts<'a>(occupants: impl Iterator<Item = &'a Occupant>) -> Vec<CountEntry> {
    let mut counts = count_by(occupants.map(position_label));
    counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));
    if counts.len() > MAX_POSITIONS {
        let other: usize = counts[MAX_POSITIONS - 1..].iter().map(|c| c.count).sum();
        counts.truncate(MAX_POSITIONS - 1);
        counts.push(CountEntry {
            name: "Other".to_string(),
            count: other,
        });
    }
    counts
}

fn crosstab(current: &[&Occupant]) -> Crosstab {
    let positions: Vec<String> = current
        .iter()
        .map(|o| position_label(o).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let buildings: BTreeSet<&str> = current.iter().map(|o| building_label(o)).collect();

    let rows = buildings
        .into_iter()
        .map(|building| {
            let counts: Vec<usize> = positions
                .iter()
                .map(|p| {
                    current
                        .iter()
                        .filter(|o| building_label(o) == building && position_label(o) == p)
                        .count()
                })
                .collect();
            CrosstabRow {
                building: building.to_string(),
                total: counts.iter().sum(),
                counts,
            }
        })
        .collect();
    Crosstab { positions, rows }
}
