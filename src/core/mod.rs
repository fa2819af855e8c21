//! Core domain: occupant lists, rooms and capacities, occupancy computation

pub mod occupancy;
pub mod occupants;
pub mod rooms;
pub mod validation;
pub mod workspace;

pub use occupancy::{
    building_summary, compute_occupancy, extract_floor, filter_rooms, floor_summary,
    room_card_text, suggest_rooms, Availability, RoomFilter, RoomSuggestion,
};
pub use occupants::{OccupantPatch, OccupantRegistry};
pub use rooms::{marker_kind, Capacities, RoomManager, RoomUpdate, RoomUpdateOutcome};
pub use validation::ValidationReport;
pub use workspace::{SaveOutcome, Workspace};
