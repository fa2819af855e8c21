//! Workbook round-trip tests
//!
//! Legacy workbooks written with rust_xlsxwriter, read back through the
//! workspace, saved, and read again.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use room_allocation::config::Settings;
use room_allocation::core::Workspace;
use room_allocation::types::{CapacityStatus, OccupantStatus, RoomKey, RoomKind};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tempfile::TempDir;

fn write_legacy_workbook(path: &Path) {
    let mut workbook = Workbook::new();

    let current = workbook.add_worksheet();
    current.set_name("Current Occupants").unwrap();
    let headers = ["Name", "Email", "Position", "Room", "Location", "Desk Phone"];
    for (col, header) in headers.iter().enumerate() {
        current.write_string(0, col as u16, *header).unwrap();
    }
    let rows = [
        ["Smith, Ann Dr", "ann.smith@anu.edu.au", "Lecturer", "3.17", "HN", "x1234"],
        ["Jones, Bob", "bob.jones", "Professor", "3.17", "HN", ""],
        ["Brown, Cy", "cy.brown@anu.edu.au", "PhD Student", "3.17", "HN", ""],
        ["STORAGE", "", "", "0.05", "HN", ""],
        ["PLACEHOLDER", "", "", "2.01", "HN", ""],
        ["", "", "", "", "", ""],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                current.write_string(r as u32 + 1, c as u16, *value).unwrap();
            }
        }
    }

    let upcoming = workbook.add_worksheet();
    upcoming.set_name("Upcoming Occupants").unwrap();
    for (col, header) in ["Name", "Position", "Planned Arrival"].iter().enumerate() {
        upcoming.write_string(0, col as u16, *header).unwrap();
    }
    upcoming.write_string(1, 0, "Park, Jin").unwrap();
    upcoming.write_string(1, 1, "Postdoc").unwrap();
    // 2024-02-01 as an Excel serial day number
    upcoming.write_number(1, 2, 45323.0).unwrap();

    let past = workbook.add_worksheet();
    past.set_name("Past Occupants").unwrap();
    for (col, header) in ["Name", "Office", "Building", "End Date"].iter().enumerate() {
        past.write_string(0, col as u16, *header).unwrap();
    }
    past.write_string(1, 0, "Old, Timer").unwrap();
    past.write_string(1, 1, "3.17").unwrap();
    past.write_string(1, 2, "HN").unwrap();
    past.write_string(1, 3, "2023-06-30 00:00:00").unwrap();

    workbook.save(path).unwrap();
}

fn open(dir: &TempDir) -> (Settings, Workspace) {
    let settings = Settings::default().with_data_file(dir.path().join("legacy.xlsx"));
    let workspace = Workspace::open(&settings).unwrap();
    (settings, workspace)
}

#[test]
fn test_legacy_workbook_import() {
    let dir = TempDir::new().unwrap();
    write_legacy_workbook(&dir.path().join("legacy.xlsx"));
    let (_, workspace) = open(&dir);
    let occupants = workspace.occupants();

    // markers are rooms, not people
    assert_eq!(occupants.count(OccupantStatus::Current), 3);
    assert_eq!(occupants.count(OccupantStatus::Upcoming), 1);
    assert_eq!(occupants.count(OccupantStatus::Past), 1);

    let ann = occupants.find("Smith, Ann Dr", OccupantStatus::Current).unwrap();
    assert_eq!(ann.building, "HN");
    assert_eq!(ann.office, "3.17");
    assert_eq!(ann.email, "ann.smith@anu.edu.au");
    assert_eq!(ann.extra.get("Desk Phone").map(String::as_str), Some("x1234"));

    let jin = occupants.find("Park, Jin", OccupantStatus::Upcoming).unwrap();
    assert_eq!(jin.planned_arrival, NaiveDate::from_ymd_opt(2024, 2, 1));

    let old = occupants.find("Old, Timer", OccupantStatus::Past).unwrap();
    assert_eq!(old.end_date, NaiveDate::from_ymd_opt(2023, 6, 30));
}

#[test]
fn test_capacities_seeded_on_first_open() {
    let dir = TempDir::new().unwrap();
    write_legacy_workbook(&dir.path().join("legacy.xlsx"));
    let (settings, workspace) = open(&dir);
    assert!(settings.capacity_file.exists());

    let rooms = workspace.rooms();
    // occupied rooms hold at least their current occupants
    assert_eq!(rooms.capacity(&RoomKey::new("HN", "3.17")), 3);
    assert_eq!(rooms.capacity(&RoomKey::new("HN", "0.05")), 0);
    assert_eq!(rooms.kind(&RoomKey::new("HN", "0.05")), RoomKind::Storage);

    let occupancy = workspace.occupancy();
    let offices: Vec<&str> = occupancy.iter().map(|r| r.office.as_str()).collect();
    assert_eq!(offices, vec!["0.05", "2.01", "3.17"]);
    assert_eq!(occupancy[0].status, CapacityStatus::Storage);
    assert_eq!(occupancy[1].status, CapacityStatus::Vacant);
    assert_eq!(occupancy[2].status, CapacityStatus::Full);
}

#[test]
fn test_save_round_trip_keeps_markers_and_extras() {
    let dir = TempDir::new().unwrap();
    write_legacy_workbook(&dir.path().join("legacy.xlsx"));
    let (settings, mut workspace) = open(&dir);

    let outcome = workspace.save(false).unwrap();
    assert!(outcome.backup.is_some());
    // Jones has an email without a domain
    assert_eq!(outcome.warnings.len(), 1);

    let reopened = Workspace::open(&settings).unwrap();
    assert_eq!(reopened.occupants().count(OccupantStatus::Current), 3);
    assert!(reopened.rooms().is_storage(&RoomKey::new("HN", "0.05")));
    assert!(reopened.room_exists(&RoomKey::new("HN", "2.01")));
    let ann = reopened
        .occupants()
        .find("Smith, Ann Dr", OccupantStatus::Current)
        .unwrap();
    assert_eq!(ann.extra.get("Desk Phone").map(String::as_str), Some("x1234"));
    let jin = reopened
        .occupants()
        .find("Park, Jin", OccupantStatus::Upcoming)
        .unwrap();
    assert_eq!(jin.planned_arrival, NaiveDate::from_ymd_opt(2024, 2, 1));
}

#[test]
fn test_delete_room_removes_occupants_from_every_list() {
    let dir = TempDir::new().unwrap();
    write_legacy_workbook(&dir.path().join("legacy.xlsx"));
    let (_, mut workspace) = open(&dir);

    let removed = workspace.delete_room(&RoomKey::new("HN", "3.17")).unwrap();
    assert_eq!(removed, 4);
    assert_eq!(workspace.occupants().count(OccupantStatus::Current), 0);
    assert_eq!(workspace.occupants().count(OccupantStatus::Past), 0);
    assert_eq!(workspace.occupants().count(OccupantStatus::Upcoming), 1);
    assert!(!workspace.room_exists(&RoomKey::new("HN", "3.17")));
}

#[test]
fn test_restore_backup_brings_back_deleted_occupant() {
    let dir = TempDir::new().unwrap();
    write_legacy_workbook(&dir.path().join("legacy.xlsx"));
    let (_, mut workspace) = open(&dir);

    let backup = workspace.create_backup().unwrap();
    workspace
        .occupants_mut()
        .delete("Brown, Cy", OccupantStatus::Current)
        .unwrap();
    workspace.save(false).unwrap();
    assert_eq!(workspace.occupants().count(OccupantStatus::Current), 2);

    let name = backup.file_name().unwrap().to_string_lossy().to_string();
    let safety = workspace.restore_backup(&name).unwrap();
    assert!(safety.is_some());
    assert_eq!(workspace.occupants().count(OccupantStatus::Current), 3);
}
