//! Excel exporter - occupant lists and report tables → .xlsx

use crate::config::STANDARD_COLUMNS;
use crate::error::{AllocError, AllocResult};
use crate::excel::{sanitize_sheet_name, WorkbookData};
use crate::types::{Occupant, OccupantStatus};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

/// One cell of an exported table
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::from(s.as_str())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<usize> for CellValue {
    fn from(n: usize) -> Self {
        CellValue::Number(n as f64)
    }
}

/// A worksheet: header row plus data rows
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    /// Sheet of occupant rows in the standard column layout
    pub fn from_occupants(name: &str, occupants: &[Occupant], extra_columns: &[String]) -> Self {
        let mut headers: Vec<&str> = STANDARD_COLUMNS.to_vec();
        headers.extend(extra_columns.iter().map(String::as_str));
        let mut sheet = Sheet::new(name, &headers);
        for occupant in occupants {
            sheet.push_row(occupant_row(occupant, extra_columns));
        }
        sheet
    }
}

fn occupant_row(occupant: &Occupant, extra_columns: &[String]) -> Vec<CellValue> {
    let date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| CellValue::Text(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(CellValue::Empty)
    };
    let mut row = vec![
        CellValue::from(occupant.name.as_str()),
        CellValue::from(occupant.status.as_str()),
        CellValue::from(occupant.email.as_str()),
        CellValue::from(occupant.position.as_str()),
        CellValue::from(occupant.office.as_str()),
        CellValue::from(occupant.building.as_str()),
        date(occupant.planned_arrival),
        date(occupant.end_date),
    ];
    for column in extra_columns {
        row.push(
            occupant
                .extra
                .get(column)
                .map(|v| CellValue::from(v.as_str()))
                .unwrap_or(CellValue::Empty),
        );
    }
    row
}

/// Writes a list of sheets to an .xlsx file
#[derive(Debug, Default)]
pub struct WorkbookExporter {
    sheets: Vec<Sheet>,
}

impl WorkbookExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The allocation workbook layout: `Current`, `Upcoming`, `Past`
    pub fn from_workbook_data(data: &WorkbookData) -> Self {
        let mut exporter = Self::new();
        for status in OccupantStatus::ALL {
            exporter.add_sheet(Sheet::from_occupants(
                status.as_str(),
                data.records(status),
                &data.extra_columns,
            ));
        }
        exporter
    }

    pub fn add_sheet(&mut self, sheet: Sheet) -> &mut Self {
        self.sheets.push(sheet);
        self
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn export(&self, output_path: &Path) -> AllocResult<()> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(sanitize_sheet_name(&sheet.name))
                .map_err(|e| AllocError::Export(format!("Failed to set worksheet name: {}", e)))?;
            Self::write_sheet(worksheet, sheet, &header_format)?;
        }

        if self.sheets.is_empty() {
            // A workbook needs at least one sheet
            workbook.add_worksheet();
        }

        workbook.save(output_path).map_err(|e| {
            AllocError::Export(format!(
                "Failed to save workbook {}: {}",
                output_path.display(),
                e
            ))
        })?;
        tracing::debug!(path = %output_path.display(), sheets = self.sheets.len(), "workbook written");
        Ok(())
    }

    fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet, header_format: &Format) -> AllocResult<()> {
        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, header, header_format)
                .map_err(|e| AllocError::Export(format!("Failed to write header: {}", e)))?;
        }

        for (idx, row) in sheet.rows.iter().enumerate() {
            let excel_row = (idx + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                match value {
                    CellValue::Text(text) => {
                        worksheet.write_string(excel_row, col as u16, text)?;
                    }
                    CellValue::Number(n) => {
                        worksheet.write_number(excel_row, col as u16, *n)?;
                    }
                    CellValue::Empty => {}
                }
            }
        }

        if !sheet.headers.is_empty() {
            worksheet.autofit();
        }
        Ok(())
    }
}
