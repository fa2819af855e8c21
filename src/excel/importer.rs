//! Excel importer - allocation workbook (.xlsx) → occupant records

use crate::config::{canonical_column, STANDARD_COLUMNS};
use crate::error::{AllocError, AllocResult};
use crate::types::{Occupant, OccupantStatus};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Occupant rows of a workbook, split by list, marker rows included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookData {
    pub current: Vec<Occupant>,
    pub upcoming: Vec<Occupant>,
    pub past: Vec<Occupant>,
    /// Columns outside the standard set, in first-seen order
    pub extra_columns: Vec<String>,
}

impl WorkbookData {
    pub fn records(&self, status: OccupantStatus) -> &[Occupant] {
        match status {
            OccupantStatus::Current => &self.current,
            OccupantStatus::Upcoming => &self.upcoming,
            OccupantStatus::Past => &self.past,
        }
    }

    pub fn len(&self) -> usize {
        self.current.len() + self.upcoming.len() + self.past.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_records(self) -> impl Iterator<Item = Occupant> {
        self.current
            .into_iter()
            .chain(self.upcoming)
            .chain(self.past)
    }
}

/// Reads the Current / Upcoming / Past sheets of an allocation workbook
pub struct WorkbookImporter {
    path: PathBuf,
}

impl WorkbookImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn import(&self) -> AllocResult<WorkbookData> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path).map_err(|e| {
            AllocError::Import(format!(
                "Failed to open workbook {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let sheet_names = workbook.sheet_names().to_vec();
        let mut data = WorkbookData::default();

        for status in OccupantStatus::ALL {
            let Some(sheet_name) = select_sheet(&sheet_names, status) else {
                tracing::debug!(status = %status, "no sheet for occupant list");
                continue;
            };
            let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
                AllocError::Import(format!("Failed to read sheet '{}': {}", sheet_name, e))
            })?;
            let records = read_sheet(&range, status, &mut data.extra_columns);
            tracing::debug!(sheet = %sheet_name, rows = records.len(), "sheet imported");
            match status {
                OccupantStatus::Current => data.current.extend(records),
                OccupantStatus::Upcoming => data.upcoming.extend(records),
                OccupantStatus::Past => data.past.extend(records),
            }
        }

        Ok(data)
    }
}

/// Sheet holding the given list: the first whose name contains the list
/// keyword, case-insensitively. The current list falls back to the first
/// sheet that is not claimed by another list.
fn select_sheet(sheet_names: &[String], status: OccupantStatus) -> Option<String> {
    let keyword_match = |status: OccupantStatus| {
        sheet_names
            .iter()
            .find(|name| name.to_lowercase().contains(status.sheet_keyword()))
    };
    if let Some(name) = keyword_match(status) {
        return Some(name.clone());
    }
    if status != OccupantStatus::Current {
        return None;
    }
    let claimed: Vec<&String> = [OccupantStatus::Upcoming, OccupantStatus::Past]
        .into_iter()
        .filter_map(keyword_match)
        .collect();
    sheet_names.iter().find(|name| !claimed.contains(name)).cloned()
}

fn read_sheet(
    range: &Range<Data>,
    sheet_status: OccupantStatus,
    extra_columns: &mut Vec<String>,
) -> Vec<Occupant> {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| canonical_column(&cell_text(cell)))
        .collect();
    for header in &headers {
        if !header.is_empty()
            && !STANDARD_COLUMNS.contains(&header.as_str())
            && !extra_columns.contains(header)
        {
            extra_columns.push(header.clone());
        }
    }

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let mut fields: BTreeMap<&str, &Data> = BTreeMap::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if !header.is_empty() {
                fields.entry(header.as_str()).or_insert(cell);
            }
        }
        let text = |column: &str| fields.get(column).map(|c| cell_text(c)).unwrap_or_default();

        let name = text("Name").trim().to_string();
        if name.is_empty() {
            tracing::warn!(sheet_status = %sheet_status, "skipping row without a name");
            continue;
        }

        let status = match text("Status").trim() {
            "" => sheet_status,
            raw => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(name = %name, status = raw, "unknown status, using sheet status");
                sheet_status
            }),
        };

        let mut occupant = Occupant::new(name, status)
            .with_room(text("Building"), text("Office"))
            .with_email(text("Email address").trim())
            .with_position(text("Position").trim());
        occupant.planned_arrival = fields.get("Planned Arrival").and_then(|c| cell_date(c));
        occupant.end_date = fields.get("End Date").and_then(|c| cell_date(c));
        for (column, cell) in &fields {
            if !STANDARD_COLUMNS.contains(column) {
                let value = cell_text(cell);
                if !value.is_empty() {
                    occupant.extra.insert(column.to_string(), value);
                }
            }
        }
        records.push(occupant);
    }
    records
}

/// Cell rendered as text; whole numbers lose their `.0`
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::Float(f) => excel_serial_to_date(*f),
        Data::Int(i) => excel_serial_to_date(*i as f64),
        Data::String(s) | Data::DateTimeIso(s) => parse_date_text(s),
        _ => None,
    }
}

/// 9999-12-31
const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

/// Excel serial day number (1900 system) → date
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// `YYYY-MM-DD`, optionally followed by a time part
pub(crate) fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
