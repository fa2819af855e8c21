//! Rooms API Server binary
//!
//! HTTP JSON API over the office allocation workbook.

use clap::Parser;
use room_allocation::api::run_api_server;
use room_allocation::cli::load_settings;
use room_allocation::logging;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rooms-server")]
#[command(version)]
#[command(about = "Rooms API Server - HTTP JSON API for office room allocation")]
#[command(long_about = r#"
Rooms API Server - HTTP JSON API for office room allocation

Edits are held in memory until POST /api/v1/save writes the workbook
(the previous workbook is backed up first).

Endpoints:
  - POST /api/v1/login               - Start a session (shared password)
  - GET  /api/v1/occupants           - List, search, filter occupants
  - GET  /api/v1/rooms               - Room occupancy with filters
  - GET  /api/v1/rooms/suggest       - Rooms with space for a new occupant
  - GET  /api/v1/reports/summary     - Headline metrics
  - POST /api/v1/save                - Validate and write the workbook
  - POST /api/v1/export/{csv,excel}  - Exports

Additional endpoints:
  - GET  /health                     - Health check
  - GET  /version                    - Server version info
  - GET  /                           - Endpoint overview

Example usage:
  rooms-server --data data/MP_Office_Allocation.xlsx
  rooms-server --host 0.0.0.0 --port 3000

  curl -X POST http://localhost:8501/api/v1/login \
    -H "Content-Type: application/json" \
    -d '{"password": "..."}'
"#)]
struct Args {
    /// Settings file (YAML)
    #[arg(short, long, env = "ROOMS_CONFIG")]
    config: Option<PathBuf>,

    /// Workbook path, overrides the settings file
    #[arg(short, long, env = "ROOMS_DATA")]
    data: Option<PathBuf>,

    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, env = "ROOMS_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ROOMS_PORT")]
    port: Option<u16>,

    /// Serve without login
    #[arg(long)]
    no_auth: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logger(args.verbose);

    let mut settings = load_settings(args.config.as_deref(), args.data)?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if args.no_auth {
        settings.auth_enabled = false;
    }

    run_api_server(settings).await
}
