use clap::{Args, Parser, Subcommand};
use room_allocation::cli::{self, NewOccupant, SaveOptions};
use room_allocation::core::Availability;
use room_allocation::error::AllocResult;
use room_allocation::logging;
use room_allocation::reports::{CsvExport, ExcelReport};
use room_allocation::types::{OccupantStatus, RoomKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rooms")]
#[command(about = "Office room allocation: occupants, capacities and occupancy reports.")]
#[command(long_about = "Rooms - Office room allocation tracker
Occupants live in an Excel workbook (Current / Upcoming / Past sheets),
room capacities in a JSON file next to it.

COMMANDS:
  status     - Room occupancy table, with building/floor/availability filters
  summary    - Headline occupancy numbers
  occupants  - List, search, add, remove, move and assign occupants
  rooms      - Add, remove, update rooms, set capacities, suggest rooms
  report     - Building, utilization and occupant reports
  export     - CSV or Excel exports
  backup     - Create, list and restore workbook backups
  validate   - Check the workbook the way a save would
  init       - Write a settings file

EXAMPLES:
  rooms status --building \"Hanna Neumann\" --availability vacant
  rooms occupants add \"Smith, Ann\" --building HN --office 3.17
  rooms rooms suggest --status upcoming
  rooms export excel --building \"Hanna Neumann\"

Every command that changes data backs up the workbook before writing.")]
#[command(version)]
struct Cli {
    /// Settings file (YAML)
    #[arg(long, global = true, env = "ROOMS_CONFIG")]
    config: Option<PathBuf>,

    /// Workbook path, overrides the settings file
    #[arg(short, long, global = true, env = "ROOMS_DATA")]
    data: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct SaveArgs {
    /// Show what would change without writing the workbook
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Save even when current occupants have no room
    #[arg(long)]
    ignore_warnings: bool,
}

impl From<SaveArgs> for SaveOptions {
    fn from(args: SaveArgs) -> Self {
        SaveOptions {
            dry_run: args.dry_run,
            ignore_warnings: args.ignore_warnings,
        }
    }
}

fn parse_status(s: &str) -> Result<OccupantStatus, String> {
    s.parse().map_err(|e: room_allocation::AllocError| e.to_string())
}

fn parse_kind(s: &str) -> Result<RoomKind, String> {
    s.parse().map_err(|e: room_allocation::AllocError| e.to_string())
}

fn parse_availability(s: &str) -> Result<Availability, String> {
    s.parse().map_err(|e: room_allocation::AllocError| e.to_string())
}

fn parse_csv_export(s: &str) -> Result<CsvExport, String> {
    s.parse().map_err(|e: room_allocation::AllocError| e.to_string())
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Show the room occupancy table.

Every known room is listed: rooms with occupants, rooms with a stored
capacity and empty or storage rooms kept in the workbook.

AVAILABILITY CLASSES (repeatable, OR-combined; vacant and has-space when
none are given, --all for every room):
  vacant      no current occupants
  has-space   occupied, below capacity
  full        exactly at capacity
  overfilled  over capacity
  storage     storage rooms")]
    /// Room occupancy table
    Status {
        /// Only this building
        #[arg(short, long)]
        building: Option<String>,

        /// Only this floor (digits before the '.' of the office number)
        #[arg(short, long)]
        floor: Option<String>,

        /// Availability class filter [default: vacant, has-space]
        #[arg(short, long, value_parser = parse_availability)]
        availability: Vec<Availability>,

        /// Show every room, including full, overfilled and storage rooms
        #[arg(long, conflicts_with = "availability")]
        all: bool,
    },

    /// Headline occupancy numbers and per-building totals
    Summary,

    /// Manage occupants
    #[command(subcommand)]
    Occupants(OccupantCommands),

    /// Manage rooms and capacities
    #[command(subcommand)]
    Rooms(RoomCommands),

    /// Print a report
    #[command(subcommand)]
    Report(ReportCommands),

    /// Export CSV files or an Excel report
    #[command(subcommand)]
    Export(ExportCommands),

    /// Workbook backups
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Check the workbook for problems that would block a save
    Validate,

    /// Write a settings file with defaults
    Init {
        /// Where to write the settings
        #[arg(default_value = "rooms.yaml")]
        path: PathBuf,

        /// Login password for the API server
        #[arg(long)]
        password: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum OccupantCommands {
    /// List occupants, optionally for one building
    List {
        #[arg(short, long, default_value = "current", value_parser = parse_status)]
        status: OccupantStatus,

        #[arg(short, long)]
        building: Option<String>,
    },

    /// Search by name, position or email (case-insensitive)
    Search {
        term: String,

        #[arg(short, long, default_value = "current", value_parser = parse_status)]
        status: OccupantStatus,
    },

    /// Occupants without a building or office
    Unassigned {
        #[arg(short, long, default_value = "current", value_parser = parse_status)]
        status: OccupantStatus,
    },

    /// Add an occupant
    Add {
        /// Name as "Last, First Title"
        name: String,

        #[arg(short, long, default_value = "current", value_parser = parse_status)]
        status: OccupantStatus,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        position: Option<String>,

        #[arg(short, long)]
        building: Option<String>,

        #[arg(short, long)]
        office: Option<String>,

        /// Planned arrival date (YYYY-MM-DD)
        #[arg(long)]
        arrival: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Remove an occupant (exact name)
    Remove {
        name: String,

        #[arg(short, long, default_value = "current", value_parser = parse_status)]
        status: OccupantStatus,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Move an occupant to another list, e.g. upcoming to current
    Move {
        name: String,

        #[arg(long, value_parser = parse_status)]
        from: OccupantStatus,

        #[arg(long, value_parser = parse_status)]
        to: OccupantStatus,

        /// End date to record (YYYY-MM-DD), typically when moving to past
        #[arg(long)]
        end_date: Option<String>,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Assign an occupant to a room
    Assign {
        name: String,

        #[arg(short, long)]
        building: String,

        #[arg(short, long)]
        office: String,

        #[arg(short, long, default_value = "current", value_parser = parse_status)]
        status: OccupantStatus,

        #[command(flatten)]
        save: SaveArgs,
    },
}

#[derive(Subcommand)]
enum RoomCommands {
    /// Add a room
    Add {
        building: String,
        office: String,

        /// Capacity (defaults to the configured default, 0 for storage)
        #[arg(short, long)]
        capacity: Option<u32>,

        /// regular or storage
        #[arg(short, long, default_value = "regular", value_parser = parse_kind)]
        kind: RoomKind,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Remove a room and every occupant record pointing at it
    Remove {
        building: String,
        office: String,

        #[command(flatten)]
        save: SaveArgs,
    },

    #[command(long_about = "Rename a room, change its capacity or its type.

Occupant records on every list move with the room. Turning a room into
storage unassigns its current occupants.")]
    /// Rename, resize or retype a room
    Update {
        building: String,
        office: String,

        #[arg(long)]
        new_building: Option<String>,

        #[arg(long)]
        new_office: Option<String>,

        #[arg(short, long)]
        capacity: Option<u32>,

        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<RoomKind>,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Set the capacity of a room
    Capacity {
        building: String,
        office: String,
        capacity: u32,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Rooms with space for a new occupant
    Suggest {
        #[arg(short, long, default_value = "current", value_parser = parse_status)]
        status: OccupantStatus,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Per-building report (all buildings unless one is named)
    Buildings {
        #[arg(short, long)]
        building: Option<String>,
    },

    /// Status distribution, full and overfilled rooms
    Utilization,

    /// Status distribution, occupants by building, arrivals, departures and positions
    Occupants,
}

#[derive(Subcommand)]
enum ExportCommands {
    /// CSV files (current, upcoming, past, rooms, buildings; all when none given)
    Csv {
        #[arg(value_parser = parse_csv_export)]
        sets: Vec<CsvExport>,

        /// Directory to export into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Excel report: full, one building, or utilization
    Excel {
        #[arg(short, long, conflicts_with = "utilization")]
        building: Option<String>,

        #[arg(short, long)]
        utilization: bool,

        /// Directory to export into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Back up the workbook now
    Create,

    /// List backups, newest first
    List,

    /// Restore a backup by file name
    Restore { name: String },
}

fn main() -> AllocResult<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    if let Commands::Init {
        path,
        password,
        force,
    } = cli.command
    {
        return cli::init(path, password, force);
    }

    let settings = cli::load_settings(cli.config.as_deref(), cli.data)?;

    match cli.command {
        Commands::Status {
            building,
            floor,
            availability,
            all,
        } => {
            let availability = if all {
                Availability::ALL.to_vec()
            } else {
                availability
            };
            cli::status(&settings, building, floor, availability)
        }

        Commands::Summary => cli::summary(&settings),

        Commands::Occupants(cmd) => match cmd {
            OccupantCommands::List { status, building } => {
                cli::occupants_list(&settings, status, building)
            }
            OccupantCommands::Search { term, status } => {
                cli::occupants_search(&settings, term, status)
            }
            OccupantCommands::Unassigned { status } => cli::occupants_unassigned(&settings, status),
            OccupantCommands::Add {
                name,
                status,
                email,
                position,
                building,
                office,
                arrival,
                end_date,
                save,
            } => cli::occupants_add(
                &settings,
                NewOccupant {
                    name,
                    status: Some(status),
                    email,
                    position,
                    building,
                    office,
                    planned_arrival: arrival,
                    end_date,
                },
                save.into(),
            ),
            OccupantCommands::Remove { name, status, save } => {
                cli::occupants_remove(&settings, name, status, save.into())
            }
            OccupantCommands::Move {
                name,
                from,
                to,
                end_date,
                save,
            } => cli::occupants_move(&settings, name, from, to, end_date, save.into()),
            OccupantCommands::Assign {
                name,
                building,
                office,
                status,
                save,
            } => cli::occupants_assign(&settings, name, building, office, status, save.into()),
        },

        Commands::Rooms(cmd) => match cmd {
            RoomCommands::Add {
                building,
                office,
                capacity,
                kind,
                save,
            } => cli::rooms_add(&settings, building, office, capacity, kind, save.into()),
            RoomCommands::Remove {
                building,
                office,
                save,
            } => cli::rooms_remove(&settings, building, office, save.into()),
            RoomCommands::Update {
                building,
                office,
                new_building,
                new_office,
                capacity,
                kind,
                save,
            } => cli::rooms_update(
                &settings,
                building,
                office,
                new_building,
                new_office,
                capacity,
                kind,
                save.into(),
            ),
            RoomCommands::Capacity {
                building,
                office,
                capacity,
                save,
            } => cli::rooms_capacity(&settings, building, office, capacity, save.into()),
            RoomCommands::Suggest { status, limit } => cli::rooms_suggest(&settings, status, limit),
        },

        Commands::Report(cmd) => match cmd {
            ReportCommands::Buildings { building } => cli::report_buildings(&settings, building),
            ReportCommands::Utilization => cli::report_utilization(&settings),
            ReportCommands::Occupants => cli::report_occupants(&settings),
        },

        Commands::Export(cmd) => match cmd {
            ExportCommands::Csv { sets, output } => cli::export_csv(&settings, sets, output),
            ExportCommands::Excel {
                building,
                utilization,
                output,
            } => {
                let report = match (building, utilization) {
                    (Some(b), _) => ExcelReport::Building(b),
                    (None, true) => ExcelReport::Utilization,
                    (None, false) => ExcelReport::Full,
                };
                cli::export_excel(&settings, report, output)
            }
        },

        Commands::Backup(cmd) => match cmd {
            BackupCommands::Create => cli::backup_create(&settings),
            BackupCommands::List => cli::backup_list(&settings),
            BackupCommands::Restore { name } => cli::backup_restore(&settings, name),
        },

        Commands::Validate => cli::validate(&settings),

        Commands::Init { .. } => Ok(()),
    }
}
