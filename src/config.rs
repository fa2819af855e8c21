//! Settings for the room allocation tool
//!
//! Settings live in an optional YAML file. Every field has a default, so a
//! missing file or a partial file is fine. Command-line flags and `ROOMS_*`
//! environment variables are applied on top by the binaries.

use crate::error::{AllocError, AllocResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Password used when no hash is configured
pub const DEFAULT_PASSWORD: &str = "kluth2025";

/// Default capacity of a room that has no entry in the capacity file
pub const DEFAULT_ROOM_CAPACITY: u32 = 2;

/// Header aliases found in older workbooks, mapped to canonical column names
pub const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("Room", "Office"),
    ("Room Number", "Office"),
    ("Location", "Building"),
    ("Email", "Email address"),
];

/// Columns always written, in this order
pub const STANDARD_COLUMNS: &[&str] = &[
    "Name",
    "Status",
    "Email address",
    "Position",
    "Office",
    "Building",
    "Planned Arrival",
    "End Date",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_file: PathBuf,
    pub capacity_file: PathBuf,
    pub backup_dir: PathBuf,
    pub export_dir: PathBuf,
    pub default_capacity: u32,
    pub session_timeout_minutes: i64,
    pub password_sha256: String,
    pub auth_enabled: bool,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/MP_Office_Allocation.xlsx"),
            capacity_file: PathBuf::from("data/room_capacities.json"),
            backup_dir: PathBuf::from("data/backup"),
            export_dir: PathBuf::from("data"),
            default_capacity: DEFAULT_ROOM_CAPACITY,
            session_timeout_minutes: 60,
            password_sha256: hash_password(DEFAULT_PASSWORD),
            auth_enabled: true,
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file; a missing file yields the defaults
    pub fn load(path: &Path) -> AllocResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path` if given, defaults otherwise
    pub fn load_optional(path: Option<&Path>) -> AllocResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> AllocResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> AllocResult<()> {
        if self.session_timeout_minutes <= 0 {
            return Err(AllocError::Config(
                "session_timeout_minutes must be positive".to_string(),
            ));
        }
        if self.password_sha256.len() != 64
            || !self.password_sha256.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(AllocError::Config(
                "password_sha256 must be a 64 character hex SHA-256 digest".to_string(),
            ));
        }
        if self.data_file.as_os_str().is_empty() {
            return Err(AllocError::Config("data_file must not be empty".to_string()));
        }
        Ok(())
    }

    /// Point at another workbook. Capacity file, backup and export
    /// directories still at their defaults move next to it.
    pub fn with_data_file(mut self, data_file: PathBuf) -> Self {
        let defaults = Settings::default();
        let dir = data_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if self.capacity_file == defaults.capacity_file {
            self.capacity_file = dir.join("room_capacities.json");
        }
        if self.backup_dir == defaults.backup_dir {
            self.backup_dir = dir.join("backup");
        }
        if self.export_dir == defaults.export_dir {
            self.export_dir = dir;
        }
        self.data_file = data_file;
        self
    }

    /// Make sure the data and backup directories exist
    pub fn ensure_dirs(&self) -> AllocResult<()> {
        for dir in [
            self.data_file.parent(),
            self.capacity_file.parent(),
            Some(self.backup_dir.as_path()),
        ]
        .into_iter()
        .flatten()
        {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}

/// SHA-256 hex digest of a password
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Map a raw header to its canonical column name (trimmed, aliases applied)
pub fn canonical_column(header: &str) -> String {
    let trimmed = header.trim();
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == trimmed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
