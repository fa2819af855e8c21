//! Excel workbook reading and writing
//!
//! - Import: allocation workbook (.xlsx) → occupant records
//! - Export: occupant records or report tables → .xlsx

mod exporter;
mod importer;

pub use exporter::{CellValue, Sheet, WorkbookExporter};
pub use importer::{WorkbookData, WorkbookImporter};

/// Excel sheet names are limited to 31 characters and a few forbidden symbols
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    let trimmed = cleaned.trim_matches('\'');
    let name: String = trimmed.chars().take(31).collect();
    if name.is_empty() {
        "Sheet".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Hanna Neumann"), "Hanna Neumann");
        assert_eq!(sanitize_sheet_name("A/B:C"), "A_B_C");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(sanitize_sheet_name("''"), "Sheet");
    }
}
