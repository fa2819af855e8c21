use crate::auth::SessionStore;
use crate::config::{Settings, DEFAULT_PASSWORD};
use crate::core::{
    filter_rooms, room_card_text, suggest_rooms, Availability, RoomFilter,
    RoomUpdate, Workspace,
};
use crate::error::{AllocError, AllocResult};
use crate::reports::{
    self, building_report, export_csv as write_csv_export, export_excel_report, occupant_report,
    utilization_report, CsvExport, ExcelReport, SummaryMetrics,
};
use crate::types::{CapacityStatus, Occupant, OccupantStatus, RoomKey, RoomKind, RoomOccupancy};
use chrono::NaiveDate;
use colored::{ColoredString, Colorize};
use std::path::{Path, PathBuf};

/// How a mutating command persists its change
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    pub dry_run: bool,
    pub ignore_warnings: bool,
}

/// Fields for a new occupant
#[derive(Debug, Clone, Default)]
pub struct NewOccupant {
    pub name: String,
    pub status: Option<OccupantStatus>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub building: Option<String>,
    pub office: Option<String>,
    pub planned_arrival: Option<String>,
    pub end_date: Option<String>,
}

/// Settings from an optional YAML file, with the workbook path overridden
pub fn load_settings(config: Option<&Path>, data: Option<PathBuf>) -> AllocResult<Settings> {
    let settings = Settings::load_optional(config)?;
    Ok(match data {
        Some(path) => settings.with_data_file(path),
        None => settings,
    })
}

/// Parse a `YYYY-MM-DD` argument
pub fn parse_date_arg(value: &str) -> AllocResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AllocError::Validation(format!("Invalid date '{}'. Expected YYYY-MM-DD", value))
    })
}

fn status_colored(status: CapacityStatus) -> ColoredString {
    let text = status.as_str();
    match status {
        CapacityStatus::Vacant => text.green(),
        CapacityStatus::Low => text.bright_green(),
        CapacityStatus::Medium => text.yellow(),
        CapacityStatus::High => text.bright_yellow(),
        CapacityStatus::Full => text.red(),
        CapacityStatus::Overfilled => text.bright_red().bold(),
        CapacityStatus::Storage => text.bright_black(),
    }
}

/// One line of the room table
pub fn format_room_line(room: &RoomOccupancy) -> String {
    format!(
        "{:<20} {:<10} {:<8} {:>3}/{:<3} {:>6.1}%  {}",
        room.building,
        room.office,
        room.floor,
        room.occupants,
        room.max_capacity,
        room.percentage,
        room_card_text(room)
    )
}

fn print_room_table(rooms: &[&RoomOccupancy]) {
    println!(
        "   {}",
        format!(
            "{:<20} {:<10} {:<8} {:>7} {:>7}  {:<30} {}",
            "Building", "Office", "Floor", "Occ/Cap", "Rate", "Availability", "Status"
        )
        .bold()
    );
    for room in rooms {
        println!("   {}  {}", format_room_line(room), status_colored(room.status));
    }
}

fn print_occupants(occupants: &[&Occupant]) {
    if occupants.is_empty() {
        println!("   {}", "(none)".dimmed());
        return;
    }
    for o in occupants {
        let room = match o.room() {
            Some(key) => key.to_string(),
            None => "unassigned".yellow().to_string(),
        };
        let position = if o.position.is_empty() { "-" } else { o.position.as_str() };
        let mut line = format!("   {:<30} {:<25} {}", o.name.bold(), position, room);
        if let Some(date) = o.planned_arrival {
            line.push_str(&format!("  arrives {}", date));
        }
        if let Some(date) = o.end_date {
            line.push_str(&format!("  left {}", date));
        }
        println!("{}", line);
    }
}

/// Save after a change, or report what a dry run would have saved
fn persist(workspace: &mut Workspace, opts: SaveOptions) -> AllocResult<()> {
    if opts.dry_run {
        println!(
            "{}",
            "📋 Dry run complete - no changes written".yellow()
        );
        let report = workspace.validate();
        for message in report.messages() {
            println!("   {} {}", "⚠️ ".yellow(), message);
        }
        return Ok(());
    }
    let outcome = workspace.save(opts.ignore_warnings).map_err(|e| {
        if matches!(e, AllocError::Validation(_)) {
            eprintln!(
                "{}",
                "   Use --ignore-warnings to save anyway".yellow()
            );
        }
        e
    })?;
    for warning in &outcome.warnings {
        println!("   {} {}", "⚠️ ".yellow(), warning);
    }
    if let Some(backup) = &outcome.backup {
        println!("   Backup: {}", backup.display());
    }
    println!(
        "{} {}",
        "✅ Saved".bold().green(),
        workspace.store().data_file().display()
    );
    Ok(())
}

//==============================================================================
// Overview
//==============================================================================

/// Room occupancy table with optional filters. Without availability classes
/// only vacant rooms and rooms with space are shown.
pub fn status(
    settings: &Settings,
    building: Option<String>,
    floor: Option<String>,
    availability: Vec<Availability>,
) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let occupancy = workspace.occupancy();
    let filter = RoomFilter::new(building, floor, availability);
    let rooms = filter_rooms(&occupancy, &filter);

    println!("{}", "🏢 Room occupancy".bold().green());
    println!("   Workbook: {}\n", settings.data_file.display());
    if rooms.is_empty() {
        println!("{}", "   No rooms match the filters".yellow());
        return Ok(());
    }
    print_room_table(&rooms);
    println!("\n   {} of {} rooms shown", rooms.len(), occupancy.len());
    Ok(())
}

pub fn summary(settings: &Settings) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let occupancy = workspace.occupancy();
    let metrics = SummaryMetrics::compute(workspace.occupants(), &occupancy);

    println!("{}", "📊 Occupancy summary".bold().green());
    for (label, value) in metrics.rows() {
        println!("   {:<22} {}", label, value.bold());
    }

    let buildings = crate::core::building_summary(&occupancy);
    if !buildings.is_empty() {
        println!("\n{}", "   By building".bold());
        for b in buildings {
            println!(
                "   {:<22} {:>3} rooms  {:>3}/{:<3}  {}",
                b.building,
                b.room_count,
                b.occupants,
                b.max_capacity,
                reports::format_rate(b.occupants, b.max_capacity)
            );
        }
    }
    Ok(())
}

//==============================================================================
// Occupants
//==============================================================================

pub fn occupants_list(
    settings: &Settings,
    status: OccupantStatus,
    building: Option<String>,
) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let list = workspace
        .occupants()
        .filter_by_building(status, building.as_deref());
    println!(
        "{}",
        format!("👥 {} occupants ({})", status, list.len()).bold().green()
    );
    print_occupants(&list);
    Ok(())
}

pub fn occupants_search(settings: &Settings, term: String, status: OccupantStatus) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let found = workspace.occupants().search(status, &term);
    println!(
        "{}",
        format!("🔍 {} {} occupants matching '{}'", found.len(), status, term)
            .bold()
            .green()
    );
    print_occupants(&found);
    Ok(())
}

pub fn occupants_unassigned(settings: &Settings, status: OccupantStatus) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let list = workspace.occupants().unassigned(status);
    println!(
        "{}",
        format!("📭 {} {} occupants without a room", list.len(), status)
            .bold()
            .green()
    );
    print_occupants(&list);
    Ok(())
}

pub fn occupants_add(settings: &Settings, new: NewOccupant, opts: SaveOptions) -> AllocResult<()> {
    let mut workspace = Workspace::open(settings)?;
    let status = new.status.unwrap_or(OccupantStatus::Current);
    let mut occupant = Occupant::new(new.name, status)
        .with_room(
            new.building.unwrap_or_default(),
            new.office.unwrap_or_default(),
        )
        .with_email(new.email.unwrap_or_default())
        .with_position(new.position.unwrap_or_default());
    occupant.planned_arrival = new.planned_arrival.as_deref().map(parse_date_arg).transpose()?;
    occupant.end_date = new.end_date.as_deref().map(parse_date_arg).transpose()?;

    let name = occupant.name.clone();
    workspace.add_occupant(occupant)?;
    println!(
        "{} {} ({})",
        "➕ Added".bold().green(),
        name.bold(),
        status
    );
    persist(&mut workspace, opts)
}

pub fn occupants_remove(
    settings: &Settings,
    name: String,
    status: OccupantStatus,
    opts: SaveOptions,
) -> AllocResult<()> {
    let mut workspace = Workspace::open(settings)?;
    let removed = workspace.occupants_mut().delete(&name, status)?;
    println!(
        "{} {} from {} occupants",
        "➖ Removed".bold().green(),
        removed.name.bold(),
        status
    );
    persist(&mut workspace, opts)
}

pub fn occupants_move(
    settings: &Settings,
    name: String,
    from: OccupantStatus,
    to: OccupantStatus,
    end_date: Option<String>,
    opts: SaveOptions,
) -> AllocResult<()> {
    let mut workspace = Workspace::open(settings)?;
    let end_date = end_date.as_deref().map(parse_date_arg).transpose()?;
    workspace.move_occupant(&name, from, to, end_date)?;
    println!(
        "{} {}: {} → {}",
        "🔀 Moved".bold().green(),
        name.bold(),
        from,
        to
    );
    persist(&mut workspace, opts)
}

pub fn occupants_assign(
    settings: &Settings,
    name: String,
    building: String,
    office: String,
    status: OccupantStatus,
    opts: SaveOptions,
) -> AllocResult<()> {
    let mut workspace = Workspace::open(settings)?;
    let key = RoomKey::new(&building, &office);
    workspace.assign(&name, &key, status)?;
    println!(
        "{} {} → {}",
        "📌 Assigned".bold().green(),
        name.bold(),
        key.to_string().bright_blue()
    );
    if let Some(room) = crate::core::occupancy::find_room(&workspace.occupancy(), &key) {
        println!("   {}", room_card_text(room));
    }
    persist(&mut workspace, opts)
}

//==============================================================================
// Rooms
//==============================================================================

pub fn rooms_add(
    settings: &Settings,
    building: String,
    office: String,
    capacity: Option<u32>,
    kind: RoomKind,
    opts: SaveOptions,
) -> AllocResult<()> {
    let mut workspace = Workspace::open(settings)?;
    let key = RoomKey::new(&building, &office);
    let capacity = capacity.unwrap_or(match kind {
        RoomKind::Storage => 0,
        RoomKind::Regular => settings.default_capacity,
    });
    workspace.add_room(key.clone(), capacity, kind)?;
    println!(
        "{} {} (capacity {}{})",
        "➕ Added room".bold().green(),
        key.to_string().bright_blue(),
        capacity,
        if kind == RoomKind::Storage { ", storage" } else { "" }
    );
    persist(&mut workspace, opts)
}

pub fn rooms_remove(
    settings: &Settings,
    building: String,
    office: String,
    opts: SaveOptions,
) -> AllocResult<()> {
    let mut workspace = Workspace::open(settings)?;
    let key = RoomKey::new(&building, &office);
    let removed = workspace.delete_room(&key)?;
    println!(
        "{} {} ({} occupant records removed)",
        "➖ Removed room".bold().green(),
        key.to_string().bright_blue(),
        removed
    );
    persist(&mut workspace, opts)
}

#[allow(clippy::too_many_arguments)]
pub fn rooms_update(
    settings: &Settings,
    building: String,
    office: String,
    new_building: Option<String>,
    new_office: Option<String>,
    capacity: Option<u32>,
    kind: Option<RoomKind>,
    opts: SaveOptions,
) -> AllocResult<()> {
    let mut workspace = Workspace::open(settings)?;
    let key = RoomKey::new(&building, &office);
    let update = RoomUpdate {
        building: new_building.unwrap_or_else(|| key.building.clone()),
        office: new_office.unwrap_or_else(|| key.office.clone()),
        capacity: capacity.unwrap_or_else(|| workspace.rooms().capacity(&key)),
        kind: kind.unwrap_or_else(|| workspace.rooms().kind(&key)),
    };
    let outcome = workspace.update_room(&key, update)?;
    println!(
        "{} {} ({} occupant records moved)",
        "✏️  Updated room".bold().green(),
        key.to_string().bright_blue(),
        outcome.moved
    );
    if !outcome.unassigned.is_empty() {
        println!(
            "   {} {}",
            "Unassigned (room is now storage):".yellow(),
            outcome.unassigned.join(", ")
        );
    }
    persist(&mut workspace, SaveOptions {
        ignore_warnings: opts.ignore_warnings || !outcome.unassigned.is_empty(),
        ..opts
    })
}

pub fn rooms_capacity(
    settings: &Settings,
    building: String,
    office: String,
    capacity: u32,
    opts: SaveOptions,
) -> AllocResult<()> {
    let mut workspace = Workspace::open(settings)?;
    let key = RoomKey::new(&building, &office);
    workspace.set_capacity(&key, capacity)?;
    println!(
        "{} {} → {}",
        "📏 Capacity".bold().green(),
        key.to_string().bright_blue(),
        capacity
    );
    persist(&mut workspace, opts)
}

pub fn rooms_suggest(settings: &Settings, status: OccupantStatus, limit: usize) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let suggestions = suggest_rooms(&workspace.occupancy(), status);
    println!(
        "{}",
        format!("💡 Suggested rooms for a new {} occupant", status.sheet_keyword())
            .bold()
            .green()
    );
    if suggestions.is_empty() {
        println!("{}", "   No rooms available".yellow());
    }
    for s in suggestions.iter().take(limit) {
        match &s.warning {
            Some(w) => println!("   {}  {}", s.label, w.yellow()),
            None => println!("   {}", s.label),
        }
    }
    Ok(())
}

//==============================================================================
// Reports
//==============================================================================

pub fn report_buildings(settings: &Settings, building: Option<String>) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let occupancy = workspace.occupancy();
    let buildings: Vec<String> = match building {
        Some(b) => vec![b],
        None => crate::core::building_summary(&occupancy)
            .into_iter()
            .map(|s| s.building)
            .collect(),
    };

    for name in buildings {
        let report = building_report(workspace.occupants(), &occupancy, &name)?;
        println!("{}", format!("🏢 {}", name).bold().green());
        println!(
            "   Rooms {}  Capacity {}  Current {}  Upcoming {}  Rate {}",
            report.summary.room_count,
            report.summary.max_capacity,
            report.summary.occupants,
            report.upcoming_count,
            report.occupancy_rate.bold()
        );
        for floor in &report.floors {
            println!(
                "   Floor {:<8} {:>3} rooms  {:>3}/{:<3}  {:.1}%",
                floor.floor.as_deref().unwrap_or("-"),
                floor.room_count,
                floor.occupants,
                floor.max_capacity,
                floor.occupancy_rate
            );
        }
        if !report.positions.is_empty() {
            let positions: Vec<String> = report
                .positions
                .iter()
                .map(|p| format!("{} {}", p.name, p.count))
                .collect();
            println!("   Positions: {}", positions.join(", "));
        }
        println!();
    }
    Ok(())
}

pub fn report_utilization(settings: &Settings) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let occupancy = workspace.occupancy();
    let report = utilization_report(workspace.occupants(), &occupancy);

    println!("{}", "📈 Room utilization".bold().green());
    for count in &report.status_counts {
        println!("   {:<20} {}", count.label, count.count);
    }
    for (title, rooms) in [("Overfilled rooms", &report.overfilled), ("Full rooms", &report.full)] {
        if rooms.is_empty() {
            continue;
        }
        println!("\n   {}", title.bold());
        for detail in rooms {
            println!(
                "   {}  {}",
                detail.room.key().to_string().bright_blue(),
                detail.occupants.join(", ")
            );
        }
    }
    if !report.vacant.is_empty() {
        println!("\n   {}", "Vacant rooms".bold());
        for entry in &report.vacant_by_building {
            println!("   {:<20} {}", entry.name, entry.count);
        }
    }
    Ok(())
}

pub fn report_occupants(settings: &Settings) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let report = occupant_report(workspace.occupants());

    println!("{}", "👥 Occupant report".bold().green());
    println!("   {}", "Status distribution".bold());
    for entry in &report.status_distribution {
        println!("   {:<20} {}", entry.name, entry.count);
    }
    println!("   {}", "Current by building".bold());
    for entry in &report.current_by_building {
        println!("   {:<20} {}", entry.name, entry.count);
    }
    println!("   {}", "Upcoming arrivals".bold());
    for o in &report.upcoming {
        let date = o
            .planned_arrival
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("   {:<12} {:<30} {}", date, o.name, o.building);
    }
    println!("   {} ({})", "Departures by month".bold(), report.past_count);
    for entry in &report.departures_by_month {
        println!("   {:<20} {}", entry.name, entry.count);
    }
    println!("   {}", "Positions".bold());
    for entry in &report.positions {
        println!("   {:<30} {}", entry.name, entry.count);
    }
    Ok(())
}

//==============================================================================
// Export, backup, validation
//==============================================================================

pub fn export_csv(
    settings: &Settings,
    selection: Vec<CsvExport>,
    output: Option<PathBuf>,
) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let dir = output.unwrap_or_else(|| settings.export_dir.clone());
    let selection = if selection.is_empty() {
        CsvExport::ALL.to_vec()
    } else {
        selection
    };
    let files = write_csv_export(workspace.occupants(), &workspace.occupancy(), &dir, &selection)?;
    if files.is_empty() {
        println!("{}", "No files were exported: selected data is empty".yellow());
    }
    for file in files {
        println!("{} {}", "📄 Wrote".bold().green(), file.display());
    }
    Ok(())
}

pub fn export_excel(
    settings: &Settings,
    report: ExcelReport,
    output: Option<PathBuf>,
) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let dir = output.unwrap_or_else(|| settings.export_dir.clone());
    let path = export_excel_report(&report, workspace.occupants(), &workspace.occupancy(), &dir)?;
    println!("{} {}", "📗 Wrote".bold().green(), path.display());
    Ok(())
}

pub fn backup_create(settings: &Settings) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let path = workspace.create_backup()?;
    println!("{} {}", "💾 Backup created".bold().green(), path.display());
    Ok(())
}

pub fn backup_list(settings: &Settings) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let backups = workspace.store().list_backups()?;
    println!(
        "{}",
        format!("💾 {} backups in {}", backups.len(), workspace.store().backup_dir().display())
            .bold()
            .green()
    );
    for b in backups {
        let created = b
            .created
            .map(|c| c.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("   {:<50} {}  {} bytes", b.name, created, b.size);
    }
    Ok(())
}

pub fn backup_restore(settings: &Settings, name: String) -> AllocResult<()> {
    let mut workspace = Workspace::open(settings)?;
    let safety = workspace.restore_backup(&name)?;
    if let Some(path) = safety {
        println!("   Previous workbook saved as {}", path.display());
    }
    println!("{} {}", "♻️  Restored".bold().green(), name);
    Ok(())
}

/// Check the workbook the way a save would
pub fn validate(settings: &Settings) -> AllocResult<()> {
    let workspace = Workspace::open(settings)?;
    let report = workspace.validate();
    if report.is_clean() {
        println!("{}", "✅ No problems found".bold().green());
        return Ok(());
    }
    for message in &report.advisory {
        println!("   {} {}", "⚠️ ".yellow(), message);
    }
    for message in &report.blocking {
        println!("   {} {}", "❌".red(), message);
    }
    if report.has_blocking() {
        return Err(AllocError::Validation(report.blocking.join(" ")));
    }
    Ok(())
}

/// Write a settings file, optionally with a new password
pub fn init(path: PathBuf, password: Option<String>, force: bool) -> AllocResult<()> {
    if path.exists() && !force {
        return Err(AllocError::Conflict(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    let mut settings = Settings::default();
    if let Some(password) = password {
        settings.password_sha256 = crate::config::hash_password(&password);
    }
    settings.save(&path)?;
    let store = SessionStore::from_settings(&settings);
    println!("{} {}", "⚙️  Wrote".bold().green(), path.display());
    if store.verify_password(DEFAULT_PASSWORD) {
        println!(
            "   {}",
            "Using the default password; pass --password to change it".yellow()
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
