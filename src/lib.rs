//! Rooms - office room allocation tracker
//!
//! Occupants live in an Excel workbook with Current, Upcoming and Past
//! sheets; room capacities live in a JSON file next to it. This library
//! loads both, computes per-room occupancy, edits occupants and rooms, and
//! writes everything back with a timestamped backup.
//!
//! # Features
//!
//! - Room occupancy with derived capacity status (vacant to overfilled, storage)
//! - Building and floor summaries, room suggestions for new occupants
//! - Empty and storage rooms kept in the workbook as marker rows
//! - CSV and Excel report exports
//! - CLI (`rooms`) and HTTP API (`rooms-server`) over the same workspace
//!
//! # Example
//!
//! ```no_run
//! use room_allocation::config::Settings;
//! use room_allocation::core::Workspace;
//!
//! let settings = Settings::default();
//! let workspace = Workspace::open(&settings)?;
//!
//! for room in workspace.occupancy() {
//!     println!("{} {}: {}/{}", room.building, room.office, room.occupants, room.max_capacity);
//! }
//! # Ok::<(), room_allocation::error::AllocError>(())
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod logging;
pub mod reports;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{AllocError, AllocResult};
pub use types::{CapacityStatus, Occupant, OccupantStatus, RoomKey, RoomKind, RoomOccupancy};
