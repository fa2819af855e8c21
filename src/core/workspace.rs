//! In-memory working copy of the allocation data
//!
//! Edits only touch memory; nothing reaches the workbook until `save`.

use crate::config::Settings;
use crate::core::occupants::{OccupantPatch, OccupantRegistry};
use crate::core::rooms::{marker_kind, RoomManager, RoomUpdate, RoomUpdateOutcome};
use crate::core::validation::{validate_for_save, ValidationReport};
use crate::error::{AllocError, AllocResult};
use crate::excel::WorkbookData;
use crate::store::Store;
use crate::types::{Occupant, OccupantStatus, RoomKey, RoomKind, RoomOccupancy};
use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveOutcome {
    /// Copy of the workbook as it was before this save
    pub backup: Option<PathBuf>,
    /// Warnings that were reported (and ignored, if blocking)
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct Workspace {
    occupants: OccupantRegistry,
    rooms: RoomManager,
    store: Store,
    extra_columns: Vec<String>,
    last_save: Option<DateTime<Local>>,
}

impl Workspace {
    pub fn open(settings: &Settings) -> AllocResult<Self> {
        Self::from_store(Store::from_settings(settings), settings.default_capacity)
    }

    /// Load workbook and capacities. Marker rows become room registrations;
    /// capacities are seeded from current occupancy when none are stored.
    pub fn from_store(store: Store, default_capacity: u32) -> AllocResult<Self> {
        let data = store.load()?;
        let extra_columns = data.extra_columns.clone();
        let mut rooms = RoomManager::new(store.load_capacities(), default_capacity);

        let mut records = Vec::with_capacity(data.len());
        for record in data.into_records() {
            match marker_kind(&record.name) {
                Some(kind) => match record.room() {
                    Some(key) => rooms.register(key, kind),
                    None => tracing::warn!(name = %record.name, "marker row without a room, dropped"),
                },
                None => records.push(record),
            }
        }

        let mut workspace = Self {
            occupants: OccupantRegistry::from_records(records),
            rooms,
            store,
            extra_columns,
            last_save: None,
        };

        if workspace.rooms.capacities().is_empty() {
            let occupancy = workspace.occupancy();
            if !occupancy.is_empty() {
                workspace.rooms.initialize_capacities(&occupancy);
                workspace.store.save_capacities(workspace.rooms.capacities())?;
            }
        }
        Ok(workspace)
    }

    /// Re-read everything from disk, dropping unsaved edits
    pub fn reload(&mut self) -> AllocResult<()> {
        let default_capacity = self.rooms.default_capacity();
        let last_save = self.last_save;
        *self = Self::from_store(self.store.clone(), default_capacity)?;
        self.last_save = last_save;
        Ok(())
    }

    pub fn occupants(&self) -> &OccupantRegistry {
        &self.occupants
    }

    pub fn occupants_mut(&mut self) -> &mut OccupantRegistry {
        &mut self.occupants
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn last_save(&self) -> Option<DateTime<Local>> {
        self.last_save
    }

    pub fn occupancy(&self) -> Vec<RoomOccupancy> {
        self.rooms.occupancy(&self.occupants)
    }

    pub fn validate(&self) -> ValidationReport {
        validate_for_save(&self.occupants)
    }

    /// Workbook contents: occupants sorted by name, then marker rows on the
    /// current sheet
    pub fn workbook_data(&self) -> WorkbookData {
        let cloned = |status: OccupantStatus| -> Vec<Occupant> {
            self.occupants
                .occupants(status)
                .into_iter()
                .cloned()
                .collect()
        };
        let mut current = cloned(OccupantStatus::Current);
        current.extend(self.rooms.marker_rows(&self.occupants));
        WorkbookData {
            current,
            upcoming: cloned(OccupantStatus::Upcoming),
            past: cloned(OccupantStatus::Past),
            extra_columns: self.extra_columns.clone(),
        }
    }

    /// Validate, back up the existing workbook, then write workbook and capacities
    pub fn save(&mut self, ignore_warnings: bool) -> AllocResult<SaveOutcome> {
        let report = self.validate();
        if report.has_blocking() && !ignore_warnings {
            tracing::warn!(warnings = ?report.blocking, "save refused");
            return Err(AllocError::Validation(report.blocking.join(" ")));
        }
        for message in report.messages() {
            tracing::warn!("{}", message);
        }

        let backup = self.store.save(&self.workbook_data())?;
        self.store.save_capacities(self.rooms.capacities())?;
        self.last_save = Some(Local::now());
        Ok(SaveOutcome {
            backup,
            warnings: report.messages().cloned().collect(),
        })
    }

    /// Write the in-memory state to a new backup workbook
    pub fn create_backup(&self) -> AllocResult<PathBuf> {
        self.store.write_backup(&self.workbook_data())
    }

    /// Restore a backup over the workbook and reload from it
    pub fn restore_backup(&mut self, name: &str) -> AllocResult<Option<PathBuf>> {
        let safety = self.store.restore_backup(name)?;
        self.reload()?;
        Ok(safety)
    }

    pub fn room_exists(&self, key: &RoomKey) -> bool {
        self.rooms.known_rooms(&self.occupants).contains(key)
    }

    pub fn add_room(&mut self, key: RoomKey, capacity: u32, kind: RoomKind) -> AllocResult<()> {
        self.rooms.add_room(key, capacity, kind, &self.occupants)
    }

    pub fn delete_room(&mut self, key: &RoomKey) -> AllocResult<usize> {
        self.rooms.delete_room(key, &mut self.occupants)
    }

    pub fn update_room(&mut self, key: &RoomKey, update: RoomUpdate) -> AllocResult<RoomUpdateOutcome> {
        self.rooms.update_room(key, update, &mut self.occupants)
    }

    pub fn set_capacity(&mut self, key: &RoomKey, capacity: u32) -> AllocResult<()> {
        if !self.room_exists(key) {
            return Err(AllocError::NotFound(format!("Room {}", key)));
        }
        self.rooms.set_capacity(key, capacity);
        Ok(())
    }

    /// Storage rooms take no current or upcoming occupants
    fn check_room(&self, occupant: &Occupant) -> AllocResult<()> {
        if occupant.status == OccupantStatus::Past {
            return Ok(());
        }
        match occupant.room() {
            Some(key) if self.rooms.is_storage(&key) => Err(AllocError::Validation(format!(
                "Room {} is a storage room",
                key
            ))),
            _ => Ok(()),
        }
    }

    pub fn add_occupant(&mut self, occupant: Occupant) -> AllocResult<()> {
        self.check_room(&occupant)?;
        self.occupants.add(occupant)
    }

    /// Apply a patch, checking the room the occupant ends up in
    pub fn update_occupant(
        &mut self,
        name: &str,
        status: OccupantStatus,
        patch: OccupantPatch,
    ) -> AllocResult<Occupant> {
        let mut result = self.occupants.get(name, status)?.clone();
        if let Some(building) = &patch.building {
            result.building = building.clone();
        }
        if let Some(office) = &patch.office {
            result.office = office.clone();
        }
        self.check_room(&result)?;
        Ok(self.occupants.update(name, status, patch)?.clone())
    }

    /// Move an occupant between lists, optionally recording an end date
    pub fn move_occupant(
        &mut self,
        name: &str,
        from: OccupantStatus,
        to: OccupantStatus,
        end_date: Option<NaiveDate>,
    ) -> AllocResult<Occupant> {
        let mut result = self.occupants.get(name, from)?.clone();
        result.status = to;
        self.check_room(&result)?;

        self.occupants.set_status(name, from, to)?;
        let patch = OccupantPatch {
            end_date,
            ..OccupantPatch::default()
        };
        Ok(self.occupants.update(name, to, patch)?.clone())
    }

    /// Assign an occupant to a room; storage rooms take no occupants
    pub fn assign(&mut self, name: &str, key: &RoomKey, status: OccupantStatus) -> AllocResult<()> {
        if self.rooms.is_storage(key) {
            return Err(AllocError::Validation(format!(
                "Room {} is a storage room",
                key
            )));
        }
        self.occupants.assign(name, key, status)
    }
}
