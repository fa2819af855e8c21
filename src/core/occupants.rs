//! The three occupant lists (current, upcoming, past)

use crate::core::rooms::marker_kind;
use crate::core::validation;
use crate::error::{AllocError, AllocResult};
use crate::types::{Occupant, OccupantStatus, RoomKey};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Field changes for a single occupant; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccupantPatch {
    pub email: Option<String>,
    pub position: Option<String>,
    pub building: Option<String>,
    pub office: Option<String>,
    pub planned_arrival: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct OccupantRegistry {
    current: Vec<Occupant>,
    upcoming: Vec<Occupant>,
    past: Vec<Occupant>,
}

impl OccupantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry, routing each record by its own status
    pub fn from_records(records: impl IntoIterator<Item = Occupant>) -> Self {
        let mut registry = Self::new();
        for record in records {
            registry.list_mut(record.status).push(record);
        }
        registry
    }

    fn list(&self, status: OccupantStatus) -> &Vec<Occupant> {
        match status {
            OccupantStatus::Current => &self.current,
            OccupantStatus::Upcoming => &self.upcoming,
            OccupantStatus::Past => &self.past,
        }
    }

    fn list_mut(&mut self, status: OccupantStatus) -> &mut Vec<Occupant> {
        match status {
            OccupantStatus::Current => &mut self.current,
            OccupantStatus::Upcoming => &mut self.upcoming,
            OccupantStatus::Past => &mut self.past,
        }
    }

    /// Occupants with the given status, sorted by name
    pub fn occupants(&self, status: OccupantStatus) -> Vec<&Occupant> {
        let mut list: Vec<&Occupant> = self.list(status).iter().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn all(&self) -> impl Iterator<Item = &Occupant> {
        self.current
            .iter()
            .chain(self.upcoming.iter())
            .chain(self.past.iter())
    }

    pub fn count(&self, status: OccupantStatus) -> usize {
        self.list(status).len()
    }

    pub fn find(&self, name: &str, status: OccupantStatus) -> Option<&Occupant> {
        self.list(status).iter().find(|o| o.name == name)
    }

    pub fn get(&self, name: &str, status: OccupantStatus) -> AllocResult<&Occupant> {
        let idx = self.position_of(name, status)?;
        Ok(&self.list(status)[idx])
    }

    fn position_of(&self, name: &str, status: OccupantStatus) -> AllocResult<usize> {
        self.list(status)
            .iter()
            .position(|o| o.name == name)
            .ok_or_else(|| {
                AllocError::NotFound(format!("{} occupant '{}'", status.as_str(), name))
            })
    }

    /// Add an occupant to the list matching its status
    pub fn add(&mut self, mut occupant: Occupant) -> AllocResult<()> {
        validation::require_name(&occupant.name)?;
        if marker_kind(&occupant.name).is_some() {
            return Err(AllocError::Validation(format!(
                "'{}' is reserved for room markers",
                occupant.name
            )));
        }
        occupant.name = occupant.name.trim().to_string();
        occupant.building = occupant.building.trim().to_string();
        occupant.office = occupant.office.trim().to_string();
        tracing::debug!(name = %occupant.name, status = %occupant.status, "adding occupant");
        self.list_mut(occupant.status).push(occupant);
        Ok(())
    }

    pub fn delete(&mut self, name: &str, status: OccupantStatus) -> AllocResult<Occupant> {
        let idx = self.position_of(name, status)?;
        Ok(self.list_mut(status).remove(idx))
    }

    /// Move an occupant to another list, e.g. an upcoming arrival becoming current
    pub fn set_status(
        &mut self,
        name: &str,
        from: OccupantStatus,
        to: OccupantStatus,
    ) -> AllocResult<()> {
        if from == to {
            self.position_of(name, from)?;
            return Ok(());
        }
        let mut occupant = self.delete(name, from)?;
        occupant.status = to;
        self.list_mut(to).push(occupant);
        Ok(())
    }

    pub fn update(
        &mut self,
        name: &str,
        status: OccupantStatus,
        patch: OccupantPatch,
    ) -> AllocResult<&Occupant> {
        let idx = self.position_of(name, status)?;
        let occupant = &mut self.list_mut(status)[idx];
        if let Some(email) = patch.email {
            occupant.email = email;
        }
        if let Some(position) = patch.position {
            occupant.position = position;
        }
        if let Some(building) = patch.building {
            occupant.building = building.trim().to_string();
        }
        if let Some(office) = patch.office {
            occupant.office = office.trim().to_string();
        }
        if patch.planned_arrival.is_some() {
            occupant.planned_arrival = patch.planned_arrival;
        }
        if patch.end_date.is_some() {
            occupant.end_date = patch.end_date;
        }
        Ok(&self.list(status)[idx])
    }

    /// Assign a current or upcoming occupant to a room (exact name match)
    pub fn assign(&mut self, name: &str, key: &RoomKey, status: OccupantStatus) -> AllocResult<()> {
        if status == OccupantStatus::Past {
            return Err(AllocError::Validation(
                "Only current or upcoming occupants can be assigned to a room".to_string(),
            ));
        }
        let idx = self.position_of(name, status)?;
        let occupant = &mut self.list_mut(status)[idx];
        occupant.building = key.building.clone();
        occupant.office = key.office.clone();
        tracing::info!(name, room = %key, "occupant assigned");
        Ok(())
    }

    pub fn unassigned(&self, status: OccupantStatus) -> Vec<&Occupant> {
        self.occupants(status)
            .into_iter()
            .filter(|o| !o.is_assigned())
            .collect()
    }

    pub fn in_room(&self, key: &RoomKey, status: OccupantStatus) -> Vec<&Occupant> {
        self.occupants(status)
            .into_iter()
            .filter(|o| o.is_in(key))
            .collect()
    }

    /// `None` or `"All"` means no filtering
    pub fn filter_by_building(
        &self,
        status: OccupantStatus,
        building: Option<&str>,
    ) -> Vec<&Occupant> {
        match building {
            None | Some("All") => self.occupants(status),
            Some(b) => self
                .occupants(status)
                .into_iter()
                .filter(|o| o.building == b)
                .collect(),
        }
    }

    pub fn search(&self, status: OccupantStatus, term: &str) -> Vec<&Occupant> {
        self.occupants(status)
            .into_iter()
            .filter(|o| o.matches(term))
            .collect()
    }

    pub fn unique_buildings(&self) -> Vec<String> {
        self.unique_by(|o| &o.building)
    }

    pub fn unique_offices(&self) -> Vec<String> {
        self.unique_by(|o| &o.office)
    }

    fn unique_by(&self, field: impl Fn(&Occupant) -> &String) -> Vec<String> {
        self.all()
            .map(|o| field(o).trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Drop every occupant of the room from all lists
    pub(crate) fn remove_room(&mut self, key: &RoomKey) -> usize {
        let mut removed = 0;
        for status in OccupantStatus::ALL {
            let list = self.list_mut(status);
            let before = list.len();
            list.retain(|o| !o.is_in(key));
            removed += before - list.len();
        }
        removed
    }

    /// Point every occupant of `from` at `to`, in all lists
    pub(crate) fn relocate(&mut self, from: &RoomKey, to: &RoomKey) -> usize {
        let mut moved = 0;
        for status in OccupantStatus::ALL {
            for occupant in self.list_mut(status).iter_mut().filter(|o| o.is_in(from)) {
                occupant.building = to.building.clone();
                occupant.office = to.office.clone();
                moved += 1;
            }
        }
        moved
    }

    /// Clear the location of the room's occupants with the given status
    pub(crate) fn clear_room(&mut self, key: &RoomKey, status: OccupantStatus) -> Vec<String> {
        let mut cleared = Vec::new();
        for occupant in self.list_mut(status).iter_mut().filter(|o| o.is_in(key)) {
            occupant.building.clear();
            occupant.office.clear();
            cleared.push(occupant.name.clone());
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> OccupantRegistry {
        OccupantRegistry::from_records(vec![
            Occupant::new("Zhang, Wei", OccupantStatus::Current).with_room("HN", "3.17"),
            Occupant::new("Adams, Kim", OccupantStatus::Current).with_room("HN", "3.17"),
            Occupant::new("Brown, Lee", OccupantStatus::Upcoming).with_room("JD", "1.01"),
            Occupant::new("Cole, Max", OccupantStatus::Past).with_room("HN", "3.17"),
            Occupant::new("Diaz, Ana", OccupantStatus::Current),
        ])
    }

    #[test]
    fn test_occupants_sorted_by_name() {
        let reg = registry();
        let names: Vec<&str> = reg
            .occupants(OccupantStatus::Current)
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["Adams, Kim", "Diaz, Ana", "Zhang, Wei"]);
    }

    #[test]
    fn test_add_requires_name() {
        let mut reg = OccupantRegistry::new();
        let err = reg
            .add(Occupant::new("   ", OccupantStatus::Current))
            .unwrap_err();
        assert!(matches!(err, AllocError::Validation(_)));
        assert_eq!(reg.count(OccupantStatus::Current), 0);
    }

    #[test]
    fn test_add_rejects_marker_names() {
        let mut reg = OccupantRegistry::new();
        assert!(reg
            .add(Occupant::new("Storage", OccupantStatus::Current))
            .is_err());
    }

    #[test]
    fn test_set_status_moves_between_lists() {
        let mut reg = registry();
        reg.set_status("Brown, Lee", OccupantStatus::Upcoming, OccupantStatus::Current)
            .unwrap();
        assert_eq!(reg.count(OccupantStatus::Upcoming), 0);
        let moved = reg.find("Brown, Lee", OccupantStatus::Current).unwrap();
        assert_eq!(moved.status, OccupantStatus::Current);
    }

    #[test]
    fn test_assign_rejects_past() {
        let mut reg = registry();
        let key = RoomKey::new("JD", "1.01");
        assert!(reg.assign("Cole, Max", &key, OccupantStatus::Past).is_err());
        assert!(reg.assign("Nobody", &key, OccupantStatus::Current).is_err());
        reg.assign("Diaz, Ana", &key, OccupantStatus::Current).unwrap();
        assert!(reg.unassigned(OccupantStatus::Current).is_empty());
    }

    #[test]
    fn test_unique_buildings_skip_blank() {
        let reg = registry();
        assert_eq!(reg.unique_buildings(), vec!["HN", "JD"]);
        assert_eq!(reg.unique_offices(), vec!["1.01", "3.17"]);
    }

    #[test]
    fn test_remove_room_hits_all_lists() {
        let mut reg = registry();
        let removed = reg.remove_room(&RoomKey::new("HN", "3.17"));
        assert_eq!(removed, 3);
        assert_eq!(reg.count(OccupantStatus::Past), 0);
    }

    #[test]
    fn test_update_patch() {
        let mut reg = registry();
        let patch = OccupantPatch {
            position: Some("Lecturer".to_string()),
            office: Some(" 2.04 ".to_string()),
            ..OccupantPatch::default()
        };
        let updated = reg.update("Zhang, Wei", OccupantStatus::Current, patch).unwrap();
        assert_eq!(updated.position, "Lecturer");
        assert_eq!(updated.office, "2.04");
        assert_eq!(updated.building, "HN");
    }
}
