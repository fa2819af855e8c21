//! Workbook-backed record store
//!
//! The allocation workbook is the system of record. Every save first copies
//! the existing workbook into the backup directory, so a bad save can be
//! rolled back with `restore_backup`. Room capacities live next to it in a
//! small JSON file.

use crate::config::Settings;
use crate::core::validation::validate_capacities_json;
use crate::core::Capacities;
use crate::error::{AllocError, AllocResult};
use crate::excel::{WorkbookData, WorkbookExporter, WorkbookImporter};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A backup workbook found in the backup directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    /// Parsed from the file name
    pub created: Option<NaiveDateTime>,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct Store {
    data_file: PathBuf,
    capacity_file: PathBuf,
    backup_dir: PathBuf,
}

impl Store {
    pub fn new(data_file: PathBuf, capacity_file: PathBuf, backup_dir: PathBuf) -> Self {
        Self {
            data_file,
            capacity_file,
            backup_dir,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.data_file.clone(),
            settings.capacity_file.clone(),
            settings.backup_dir.clone(),
        )
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Read the workbook; a missing workbook is an empty dataset
    pub fn load(&self) -> AllocResult<WorkbookData> {
        if !self.data_file.exists() {
            tracing::info!(path = %self.data_file.display(), "workbook not found, starting empty");
            return Ok(WorkbookData::default());
        }
        let data = WorkbookImporter::new(&self.data_file).import()?;
        tracing::info!(
            path = %self.data_file.display(),
            current = data.current.len(),
            upcoming = data.upcoming.len(),
            past = data.past.len(),
            "workbook loaded"
        );
        Ok(data)
    }

    /// Back up the existing workbook, then write `data` over it
    pub fn save(&self, data: &WorkbookData) -> AllocResult<Option<PathBuf>> {
        let backup = self.backup_existing()?;
        if let Some(parent) = non_empty_parent(&self.data_file) {
            fs::create_dir_all(parent)?;
        }
        WorkbookExporter::from_workbook_data(data).export(&self.data_file)?;
        tracing::info!(path = %self.data_file.display(), rows = data.len(), "workbook saved");
        Ok(backup)
    }

    /// Copy the current workbook into the backup directory, if there is one
    pub fn backup_existing(&self) -> AllocResult<Option<PathBuf>> {
        if !self.data_file.exists() {
            return Ok(None);
        }
        let target = self.next_backup_path()?;
        fs::copy(&self.data_file, &target)?;
        tracing::info!(backup = %target.display(), "workbook backed up");
        Ok(Some(target))
    }

    /// Write in-memory data straight to a new backup workbook
    pub fn write_backup(&self, data: &WorkbookData) -> AllocResult<PathBuf> {
        let target = self.next_backup_path()?;
        WorkbookExporter::from_workbook_data(data).export(&target)?;
        tracing::info!(backup = %target.display(), "backup created");
        Ok(target)
    }

    /// Backups of this workbook, newest first
    pub fn list_backups(&self) -> AllocResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}_", self.stem());
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if !name.starts_with(&prefix) || !name.ends_with(".xlsx") {
                continue;
            }
            let created = parse_backup_timestamp(&name[prefix.len()..]);
            backups.push(BackupInfo {
                name,
                path,
                created,
                size: entry.metadata()?.len(),
            });
        }
        backups.sort_by(|a, b| b.created.cmp(&a.created).then(b.name.cmp(&a.name)));
        Ok(backups)
    }

    /// Replace the workbook with a backup; the workbook being replaced is
    /// backed up first and that path is returned.
    pub fn restore_backup(&self, name: &str) -> AllocResult<Option<PathBuf>> {
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(AllocError::Validation(format!(
                "Invalid backup name '{}'",
                name
            )));
        }
        let source = self.backup_dir.join(name);
        if !source.is_file() {
            return Err(AllocError::NotFound(format!("Backup '{}'", name)));
        }
        let safety = self.backup_existing()?;
        if let Some(parent) = non_empty_parent(&self.data_file) {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &self.data_file)?;
        tracing::info!(backup = %source.display(), "backup restored");
        Ok(safety)
    }

    /// Room capacities; a missing or invalid file yields an empty map
    pub fn load_capacities(&self) -> Capacities {
        match self.read_capacities() {
            Ok(capacities) => capacities,
            Err(e) => {
                tracing::warn!(
                    path = %self.capacity_file.display(),
                    error = %e,
                    "could not load room capacities, starting empty"
                );
                Capacities::new()
            }
        }
    }

    fn read_capacities(&self) -> AllocResult<Capacities> {
        if !self.capacity_file.exists() {
            return Ok(Capacities::new());
        }
        let content = fs::read_to_string(&self.capacity_file)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        validate_capacities_json(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn save_capacities(&self, capacities: &Capacities) -> AllocResult<()> {
        if let Some(parent) = non_empty_parent(&self.capacity_file) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.capacity_file, serde_json::to_string_pretty(capacities)?)?;
        tracing::debug!(path = %self.capacity_file.display(), rooms = capacities.len(), "capacities saved");
        Ok(())
    }

    fn stem(&self) -> String {
        self.data_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("workbook")
            .to_string()
    }

    /// `<backup_dir>/<stem>_<YYYYmmdd_HHMMSS>.xlsx`, with `_1`, `_2`... when
    /// two backups land in the same second
    fn next_backup_path(&self) -> AllocResult<PathBuf> {
        fs::create_dir_all(&self.backup_dir)?;
        let base = format!(
            "{}_{}",
            self.stem(),
            Local::now().format(BACKUP_TIMESTAMP_FORMAT)
        );
        let mut candidate = self.backup_dir.join(format!("{}.xlsx", base));
        let mut n = 1;
        while candidate.exists() {
            candidate = self.backup_dir.join(format!("{}_{}.xlsx", base, n));
            n += 1;
        }
        Ok(candidate)
    }
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Timestamp part of a backup name, e.g. `20250114_093000.xlsx` or `20250114_093000_1.xlsx`
fn parse_backup_timestamp(suffix: &str) -> Option<NaiveDateTime> {
    let stamp = suffix.get(..15)?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> Store {
        Store::new(
            dir.path().join("MP_Office_Allocation.xlsx"),
            dir.path().join("room_capacities.json"),
            dir.path().join("backup"),
        )
    }

    #[test]
    fn test_parse_backup_timestamp() {
        let ts = parse_backup_timestamp("20250114_093000.xlsx").unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-01-14 09:30:00");
        assert!(parse_backup_timestamp("20250114_093000_2.xlsx").is_some());
        assert!(parse_backup_timestamp("latest.xlsx").is_none());
    }

    #[test]
    fn test_load_missing_workbook_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load().unwrap().is_empty());
    }

    #[test]
    fn test_capacities_missing_or_invalid_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.load_capacities().is_empty());

        fs::write(dir.path().join("room_capacities.json"), "{\"HN:1.01\": -3}").unwrap();
        assert!(store.load_capacities().is_empty());

        fs::write(dir.path().join("room_capacities.json"), "not json").unwrap();
        assert!(store.load_capacities().is_empty());
    }

    #[test]
    fn test_capacities_save_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut capacities = Capacities::new();
        capacities.set(&crate::types::RoomKey::new("HN", "3.17"), 4);
        store.save_capacities(&capacities).unwrap();
        assert_eq!(store.load_capacities(), capacities);
    }

    #[test]
    fn test_backup_names_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let data = WorkbookData::default();
        let first = store.write_backup(&data).unwrap();
        let second = store.write_backup(&data).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.list_backups().unwrap().len(), 2);
    }

    #[test]
    fn test_restore_rejects_paths() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(matches!(
            store.restore_backup("../secret.xlsx"),
            Err(AllocError::Validation(_))
        ));
        assert!(matches!(
            store.restore_backup("missing.xlsx"),
            Err(AllocError::NotFound(_))
        ));
    }
}
