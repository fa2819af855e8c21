//! Record validation before save, and capacity file validation

use crate::core::occupants::OccupantRegistry;
use crate::error::{AllocError, AllocResult};
use crate::types::OccupantStatus;
use jsonschema::JSONSchema;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> AllocResult<&'static Regex> {
    if let Some(re) = EMAIL_RE.get() {
        return Ok(re);
    }
    let re = Regex::new(EMAIL_PATTERN)
        .map_err(|e| AllocError::Validation(format!("Regex error: {}", e)))?;
    Ok(EMAIL_RE.get_or_init(|| re))
}

pub fn require_name(name: &str) -> AllocResult<()> {
    if name.trim().is_empty() {
        return Err(AllocError::Validation("Name is required".to_string()));
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> AllocResult<bool> {
    Ok(email_regex()?.is_match(email.trim()))
}

/// Findings of a pre-save check.
///
/// Blocking findings refuse the save unless warnings are ignored; advisory
/// findings are only reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub blocking: Vec<String>,
    pub advisory: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.blocking.is_empty() && self.advisory.is_empty()
    }

    pub fn has_blocking(&self) -> bool {
        !self.blocking.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &String> {
        self.blocking.iter().chain(self.advisory.iter())
    }
}

pub fn validate_for_save(occupants: &OccupantRegistry) -> ValidationReport {
    let mut report = ValidationReport::default();

    let missing = occupants.unassigned(OccupantStatus::Current).len();
    if missing > 0 {
        report.blocking.push(format!(
            "{} current occupants are missing Building or Office assignment.",
            missing
        ));
    }

    let mut check_emails = true;
    for occupant in occupants.all() {
        if occupant.name.trim().is_empty() {
            report.blocking.push(format!(
                "A {} occupant has no name.",
                occupant.status.sheet_keyword()
            ));
        }
        if !check_emails || occupant.email.trim().is_empty() {
            continue;
        }
        match is_valid_email(&occupant.email) {
            Ok(true) => {}
            Ok(false) => report.advisory.push(format!(
                "{} has an invalid email address '{}'.",
                occupant.name, occupant.email
            )),
            Err(e) => {
                tracing::error!(error = %e, "email check unavailable");
                report.advisory.push(format!("Email addresses were not checked: {}", e));
                check_emails = false;
            }
        }
    }
    report
}

/// Check capacity file JSON against the embedded schema
pub fn validate_capacities_json(value: &serde_json::Value) -> AllocResult<()> {
    let schema_str = include_str!("../../schema/room-capacities.schema.json");
    let schema_value: serde_json::Value = serde_json::from_str(schema_str)
        .map_err(|e| AllocError::Validation(format!("Failed to parse schema: {}", e)))?;

    let compiled_schema = JSONSchema::compile(&schema_value)
        .map_err(|e| AllocError::Validation(format!("Failed to compile schema: {}", e)))?;

    if let Err(errors) = compiled_schema.validate(value) {
        let error_messages: Vec<String> = errors.map(|e| format!("  - {}", e)).collect();
        return Err(AllocError::Validation(format!(
            "Capacity file validation failed:\n{}",
            error_messages.join("\n")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Occupant;
    use serde_json::json;

    #[test]
    fn test_require_name() {
        assert!(require_name("Smith, John").is_ok());
        assert!(require_name("  ").is_err());
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("john.smith@anu.edu.au").unwrap());
        assert!(is_valid_email("  john.smith@anu.edu.au ").unwrap());
        assert!(!is_valid_email("john.smith").unwrap());
        assert!(!is_valid_email("a b@c.d").unwrap());
        assert!(Regex::new(EMAIL_PATTERN).is_ok());
    }

    #[test]
    fn test_missing_location_blocks_save() {
        let registry = OccupantRegistry::from_records(vec![
            Occupant::new("A", OccupantStatus::Current),
            Occupant::new("B", OccupantStatus::Current).with_room("HN", ""),
            Occupant::new("C", OccupantStatus::Current).with_room("HN", "1.01"),
            Occupant::new("D", OccupantStatus::Upcoming),
        ]);
        let report = validate_for_save(&registry);
        assert_eq!(
            report.blocking,
            vec!["2 current occupants are missing Building or Office assignment.".to_string()]
        );
        assert!(report.has_blocking());
    }

    #[test]
    fn test_bad_email_is_advisory() {
        let registry = OccupantRegistry::from_records(vec![Occupant::new(
            "A",
            OccupantStatus::Current,
        )
        .with_room("HN", "1.01")
        .with_email("not-an-email")]);
        let report = validate_for_save(&registry);
        assert!(!report.has_blocking());
        assert_eq!(report.advisory.len(), 1);
    }

    #[test]
    fn test_capacity_schema() {
        assert!(validate_capacities_json(&json!({"HN:3.17": 2, "JD:G12": 0})).is_ok());
        assert!(validate_capacities_json(&json!({"HN:3.17": -1})).is_err());
        assert!(validate_capacities_json(&json!({"HN:3.17": "two"})).is_err());
        assert!(validate_capacities_json(&json!({"no-colon": 2})).is_err());
        assert!(validate_capacities_json(&json!([1, 2])).is_err());
    }
}
