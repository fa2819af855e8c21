//! CLI command handlers

pub mod commands;

pub use commands::{
    backup_create, backup_list, backup_restore, export_csv, export_excel, init, load_settings,
    occupants_add, occupants_assign, occupants_list, occupants_move, occupants_remove,
    occupants_search, occupants_unassigned, parse_date_arg, report_buildings, report_occupants,
    report_utilization, rooms_add, rooms_capacity, rooms_remove, rooms_suggest, rooms_update,
    status, summary, validate, NewOccupant, SaveOptions,
};
