//! CSV and Excel report exports

use crate::core::occupancy::building_summary;
use crate::core::OccupantRegistry;
use crate::error::{AllocError, AllocResult};
use crate::excel::{CellValue, Sheet, WorkbookExporter};
use crate::reports::{building_report, SummaryMetrics};
use crate::types::{CapacityStatus, OccupancySummary, Occupant, OccupantStatus, RoomOccupancy};
use chrono::Local;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const ROOM_COLUMNS: &[&str] = &[
    "Building",
    "Office",
    "Floor",
    "Occupants",
    "IsStorage",
    "Max_Capacity",
    "Remaining",
    "Percentage",
    "Status",
];

const BUILDING_SUMMARY_COLUMNS: &[&str] = &[
    "Building",
    "Room Count",
    "Occupants",
    "Max_Capacity",
    "Remaining",
    "Occupancy Rate",
];

/// Data sets available as CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvExport {
    Current,
    Upcoming,
    Past,
    RoomUtilization,
    BuildingSummary,
}

impl CsvExport {
    pub const ALL: [CsvExport; 5] = [
        CsvExport::Current,
        CsvExport::Upcoming,
        CsvExport::Past,
        CsvExport::RoomUtilization,
        CsvExport::BuildingSummary,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            CsvExport::Current => "current_occupants.csv",
            CsvExport::Upcoming => "upcoming_occupants.csv",
            CsvExport::Past => "past_occupants.csv",
            CsvExport::RoomUtilization => "room_utilization.csv",
            CsvExport::BuildingSummary => "building_summary.csv",
        }
    }
}

impl FromStr for CsvExport {
    type Err = AllocError;

    fn from_str(s: &str) -> AllocResult<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "current" | "current_occupants" => Ok(CsvExport::Current),
            "upcoming" | "upcoming_occupants" => Ok(CsvExport::Upcoming),
            "past" | "past_occupants" => Ok(CsvExport::Past),
            "rooms" | "room_utilization" | "utilization" => Ok(CsvExport::RoomUtilization),
            "buildings" | "building_summary" => Ok(CsvExport::BuildingSummary),
            other => Err(AllocError::Validation(format!(
                "Unknown CSV export '{}'. Expected current, upcoming, past, rooms or buildings",
                other
            ))),
        }
    }
}

/// Excel report flavours
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcelReport {
    Full,
    Building(String),
    Utilization,
}

impl fmt::Display for ExcelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcelReport::Full => f.write_str("Full Office Allocation Report"),
            ExcelReport::Building(b) => write!(f, "{} Building Report", b),
            ExcelReport::Utilization => f.write_str("Utilization Summary"),
        }
    }
}

/// Write the selected data sets into `<export_dir>/export_<timestamp>/`.
/// Empty occupant lists are skipped; returns the files written.
pub fn export_csv(
    occupants: &OccupantRegistry,
    occupancy: &[RoomOccupancy],
    export_dir: &Path,
    selection: &[CsvExport],
) -> AllocResult<Vec<PathBuf>> {
    let target = export_dir.join(format!("export_{}", timestamp()));
    fs::create_dir_all(&target)?;

    let mut written = Vec::new();
    for export in selection {
        let sheet = match export {
            CsvExport::Current => occupant_sheet(occupants, OccupantStatus::Current),
            CsvExport::Upcoming => occupant_sheet(occupants, OccupantStatus::Upcoming),
            CsvExport::Past => occupant_sheet(occupants, OccupantStatus::Past),
            CsvExport::RoomUtilization => room_sheet("Room Utilization", occupancy.iter()),
            CsvExport::BuildingSummary => building_summary_sheet(&building_summary(occupancy)),
        };
        if sheet.rows.is_empty() {
            tracing::debug!(export = ?export, "nothing to export");
            continue;
        }
        let path = target.join(export.file_name());
        write_sheet_csv(&sheet, &path)?;
        written.push(path);
    }
    tracing::info!(dir = %target.display(), files = written.len(), "CSV export finished");
    Ok(written)
}

/// Write an Excel report into `export_dir`; returns the file written
pub fn export_excel_report(
    report: &ExcelReport,
    occupants: &OccupantRegistry,
    occupancy: &[RoomOccupancy],
    export_dir: &Path,
) -> AllocResult<PathBuf> {
    fs::create_dir_all(export_dir)?;
    let stamp = timestamp();
    let mut exporter = WorkbookExporter::new();

    let file_name = match report {
        ExcelReport::Full => {
            for status in [OccupantStatus::Current, OccupantStatus::Upcoming] {
                let sheet = occupant_sheet(occupants, status);
                if !sheet.rows.is_empty() {
                    exporter.add_sheet(sheet);
                }
            }
            if !occupancy.is_empty() {
                exporter.add_sheet(room_sheet("Room Utilization", occupancy.iter()));
            }
            let metrics = SummaryMetrics::compute(occupants, occupancy);
            let rows = metrics
                .rows()
                .into_iter()
                .map(|(label, value)| (label.to_string(), value))
                .collect();
            exporter.add_sheet(summary_sheet(&report.to_string(), rows));
            format!("Full_Office_Report_{}.xlsx", stamp)
        }
        ExcelReport::Building(building) => {
            let details = building_report(occupants, occupancy, building)?;
            let current: Vec<Occupant> = details.occupants.clone();
            let upcoming: Vec<Occupant> = occupants
                .filter_by_building(OccupantStatus::Upcoming, Some(building))
                .into_iter()
                .cloned()
                .collect();
            for (name, list) in [("Current Occupants", &current), ("Upcoming Occupants", &upcoming)] {
                if !list.is_empty() {
                    exporter.add_sheet(Sheet::from_occupants(name, list, &[]));
                }
            }
            exporter.add_sheet(room_sheet("Rooms", details.rooms.iter()));
            let summary = &details.summary;
            let rows = vec![
                ("Total Rooms".to_string(), summary.room_count.to_string()),
                ("Total Capacity".to_string(), summary.max_capacity.to_string()),
                ("Current Occupants".to_string(), summary.occupants.to_string()),
                ("Available Spaces".to_string(), summary.remaining.to_string()),
                ("Occupancy Rate".to_string(), details.occupancy_rate.clone()),
                ("Upcoming Occupants".to_string(), details.upcoming_count.to_string()),
            ];
            exporter.add_sheet(summary_sheet(&report.to_string(), rows));
            format!("{}_Report_{}.xlsx", file_safe(building), stamp)
        }
        ExcelReport::Utilization => {
            if occupancy.is_empty() {
                return Err(AllocError::Validation(
                    "No room data available to generate utilization report".to_string(),
                ));
            }
            exporter.add_sheet(room_sheet("All Rooms", occupancy.iter()));
            for (name, status) in [
                ("Full Rooms", CapacityStatus::Full),
                ("Overfilled Rooms", CapacityStatus::Overfilled),
                ("Vacant Rooms", CapacityStatus::Vacant),
            ] {
                let sheet = room_sheet(name, occupancy.iter().filter(|r| r.status == status));
                if !sheet.rows.is_empty() {
                    exporter.add_sheet(sheet);
                }
            }
            exporter.add_sheet(building_summary_sheet(&building_summary(occupancy)));
            format!("Utilization_Summary_{}.xlsx", stamp)
        }
    };

    let path = export_dir.join(file_name);
    exporter.export(&path)?;
    tracing::info!(report = %report, path = %path.display(), "Excel report written");
    Ok(path)
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn occupant_sheet(occupants: &OccupantRegistry, status: OccupantStatus) -> Sheet {
    let list: Vec<Occupant> = occupants.occupants(status).into_iter().cloned().collect();
    Sheet::from_occupants(&format!("{} Occupants", status), &list, &[])
}

fn room_sheet<'a>(name: &str, rooms: impl Iterator<Item = &'a RoomOccupancy>) -> Sheet {
    let mut sheet = Sheet::new(name, ROOM_COLUMNS);
    for room in rooms {
        sheet.push_row(vec![
            CellValue::from(room.building.as_str()),
            CellValue::from(room.office.as_str()),
            CellValue::from(room.floor.as_str()),
            CellValue::from(room.occupants),
            CellValue::from(if room.is_storage { "True" } else { "False" }),
            CellValue::from(room.max_capacity),
            CellValue::from(room.remaining),
            CellValue::from(room.percentage),
            CellValue::from(room.status.as_str()),
        ]);
    }
    sheet
}

fn building_summary_sheet(summaries: &[OccupancySummary]) -> Sheet {
    let mut sheet = Sheet::new("Building Summary", BUILDING_SUMMARY_COLUMNS);
    for s in summaries {
        sheet.push_row(vec![
            CellValue::from(s.building.as_str()),
            CellValue::from(s.room_count),
            CellValue::from(s.occupants),
            CellValue::from(s.max_capacity),
            CellValue::from(s.remaining),
            CellValue::from(s.occupancy_rate),
        ]);
    }
    sheet
}

fn summary_sheet(title: &str, metrics: Vec<(String, String)>) -> Sheet {
    let mut sheet = Sheet::new("Summary", &["Metric", "Value"]);
    sheet.push_row(vec![CellValue::from("Report"), CellValue::from(title)]);
    sheet.push_row(vec![
        CellValue::from("Generated on"),
        CellValue::from(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
    ]);
    for (label, value) in metrics {
        sheet.push_row(vec![CellValue::from(label), CellValue::from(value)]);
    }
    sheet
}

fn cell_string(value: &CellValue) -> String {
    match value {
        CellValue::Text(s) => s.clone(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Empty => String::new(),
    }
}

fn write_sheet_csv(sheet: &Sheet, path: &Path) -> AllocResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        writer.write_record(row.iter().map(cell_string))?;
    }
    writer.flush()?;
    Ok(())
}
